// Copyright 2026 lsbshaper developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Frame loop that drives one quantizer per channel.

use log::debug;
use log::info;
use log::warn;

use super::codec;
use super::codec::SampleWidth;
use super::config;
use super::constant::log_target;
use super::error::SinkError;
use super::error::SourceError;
use super::error::SourceErrorReason;
use super::error::TranscodeError;
use super::error::Verify;
use super::error::VerifyError;
use super::shaper::NoiseShapingQuantizer;
use super::source::Sink;
use super::source::Source;
use super::source::StreamParams;

/// Fixed scale parameters for one input-width to output-width conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleParams {
    input_offset: i64,
    output_offset: i64,
    divider: f64,
}

impl ScaleParams {
    /// Computes the parameters.
    ///
    /// `divider` maps the input half-scale onto the output half-scale, which
    /// is one step smaller when `reduce_headroom` is set.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::codec::SampleWidth;
    /// # use lsbshaper::pipeline::ScaleParams;
    /// let scale = ScaleParams::new(SampleWidth::S16, SampleWidth::U8, false);
    /// assert_eq!(scale.divider(), 256.0);
    /// assert_eq!(scale.output_offset(), 128);
    /// ```
    pub fn new(input: SampleWidth, output: SampleWidth, reduce_headroom: bool) -> Self {
        let input_half = (1u64 << (input.bits() - 1)) as f64;
        let output_half = ((1u64 << (output.bits() - 1)) - u64::from(reduce_headroom)) as f64;
        Self {
            input_offset: i64::from(input.zero_point()),
            output_offset: i64::from(output.zero_point()),
            divider: input_half / output_half,
        }
    }

    /// Returns the zero-point subtracted from the input samples.
    pub const fn input_offset(&self) -> i64 {
        self.input_offset
    }

    /// Returns the zero-point added to the quantizer outputs.
    pub const fn output_offset(&self) -> i64 {
        self.output_offset
    }

    /// Returns the input-to-output amplitude ratio.
    pub const fn divider(&self) -> f64 {
        self.divider
    }

    /// Maps an input sample to the quantizer domain.
    #[inline]
    pub fn scale(&self, sample: i32) -> f64 {
        (i64::from(sample) - self.input_offset) as f64 / self.divider
    }
}

/// Per-channel quantizer bank for one stream.
#[derive(Clone, Debug)]
pub struct Transcoder {
    scale: ScaleParams,
    output_width: SampleWidth,
    quantizers: Vec<NoiseShapingQuantizer>,
    shaped: Vec<i64>,
}

impl Transcoder {
    /// Constructs `Transcoder` for the stream described by `params`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if `config` or `params` is invalid.
    pub fn new(config: &config::Transcode, params: &StreamParams) -> Result<Self, VerifyError> {
        config.verify().map_err(|e| e.within("config"))?;
        params.verify().map_err(|e| e.within("stream"))?;
        let output_width = config.output_width()?;
        let scale = ScaleParams::new(params.width(), output_width, config.reduce_headroom);

        debug!("Input sample width = {} bits", params.width().bits());
        debug!("Output sample width = {} bits", output_width.bits());
        debug!("Input offset = {}", scale.input_offset());
        debug!("Output offset = {}", scale.output_offset());
        debug!("Divider = {}", scale.divider());

        let mut quantizers = Vec::with_capacity(params.channels());
        for _ch in 0..params.channels() {
            let mut q = NoiseShapingQuantizer::default();
            if config.clip_during_integration {
                // The quantizer works before `output_offset` is added.
                q.set_min_max(
                    Some(i64::from(output_width.min_value()) - scale.output_offset()),
                    Some(i64::from(output_width.max_value()) - scale.output_offset()),
                )?;
            }
            quantizers.push(q);
        }

        Ok(Self {
            scale,
            output_width,
            quantizers,
            shaped: vec![0i64; params.channels()],
        })
    }

    /// Returns the scale parameters.
    pub const fn scale(&self) -> &ScaleParams {
        &self.scale
    }

    /// Returns the output sample width.
    pub const fn output_width(&self) -> SampleWidth {
        self.output_width
    }

    /// Returns the quantizers in channel order.
    pub fn quantizers(&self) -> &[NoiseShapingQuantizer] {
        &self.quantizers
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> usize {
        self.quantizers.len()
    }

    /// Transforms one frame, and returns the number of samples clamped while
    /// fitting the results into the output width.
    ///
    /// # Panics
    ///
    /// Panics if `input` or `output` does not have one element per channel.
    pub fn process_frame(&mut self, input: &[i32], output: &mut [i32]) -> usize {
        assert_eq!(input.len(), self.quantizers.len());
        assert_eq!(output.len(), self.quantizers.len());
        for ((q, p), x) in self.quantizers.iter_mut().zip(&mut self.shaped).zip(input) {
            *p = q.transfer(self.scale.scale(*x)) + self.scale.output_offset();
        }
        codec::constrain_values(&self.shaped, self.output_width, output)
    }

    /// Returns the number of clip events in the quantizers.
    pub fn quantizer_clip_count(&self) -> usize {
        self.quantizers
            .iter()
            .map(NoiseShapingQuantizer::clip_count)
            .sum()
    }
}

/// Summary of a transcoding run.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TranscodeStats {
    /// Number of frames written.
    pub frames: usize,
    /// Number of outputs clamped inside the quantizers.
    pub quantizer_clips: usize,
    /// Number of samples clamped when written.
    pub write_clips: usize,
}

/// Finalizes the wrapped sink when dropped, unless `finish` did it already.
struct SinkGuard<'a, K: Sink> {
    sink: &'a mut K,
    finalized: bool,
}

impl<'a, K: Sink> SinkGuard<'a, K> {
    fn new(sink: &'a mut K) -> Self {
        Self {
            sink,
            finalized: false,
        }
    }

    fn write_frame(&mut self, samples: &[i32]) -> Result<(), SinkError> {
        self.sink.write_frame(samples)
    }

    fn finish(mut self) -> Result<(), SinkError> {
        self.finalized = true;
        self.sink.finalize()
    }
}

impl<K: Sink> Drop for SinkGuard<'_, K> {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(e) = self.sink.finalize() {
                warn!("Failed to finalize the output: {e}");
            }
        }
    }
}

/// Transcodes all the frames from `source` into `sink`.
///
/// `sink` must be prepared for the output parameters, i.e.
/// `source.params().with_width(config.output_width()?)`.
///
/// # Errors
///
/// Returns `TranscodeError` on configuration, read, or write errors. `sink`
/// is finalized before an error is returned.
///
/// # Examples
///
/// ```
/// # use lsbshaper::*;
/// # use lsbshaper::codec::SampleWidth;
/// # use lsbshaper::source::*;
/// let mut source = MemSource::from_samples(&[0, 256, -256, 1000], 2, SampleWidth::S16, 8000);
/// let config = config::Transcode { output_bits: 8, ..Default::default() };
/// let mut sink = MemSink::new(source.params().with_width(SampleWidth::U8));
/// let stats = transcode(&config, &mut source, &mut sink).unwrap();
/// assert_eq!(stats.frames, 2);
/// assert!(sink.is_finalized());
/// ```
pub fn transcode<S, K>(
    config: &config::Transcode,
    source: &mut S,
    sink: &mut K,
) -> Result<TranscodeStats, TranscodeError>
where
    S: Source,
    K: Sink,
{
    transcode_with_progress(config, source, sink, |_, _| {})
}

/// Same as [`transcode`], but calls `progress(frames_done, frames_total)`
/// after each block of frames.
///
/// # Errors
///
/// Same as [`transcode`].
pub fn transcode_with_progress<S, K, F>(
    config: &config::Transcode,
    source: &mut S,
    sink: &mut K,
    mut progress: F,
) -> Result<TranscodeStats, TranscodeError>
where
    S: Source,
    K: Sink,
    F: FnMut(usize, usize),
{
    let mut guard = SinkGuard::new(sink);
    let params = source.params().clone();
    let mut transcoder = Transcoder::new(config, &params)?;

    let channels = params.channels();
    let total = params.frame_count();
    let mut raw = Vec::with_capacity(config.block_frames * params.frame_bytes());
    let mut input = vec![0i32; channels];
    let mut output = vec![0i32; channels];
    let mut stats = TranscodeStats::default();

    while stats.frames < total {
        let to_read = std::cmp::min(config.block_frames, total - stats.frames);
        let read = source.read_raw_frames(to_read, &mut raw)?;
        for frame in raw.chunks_exact(params.frame_bytes()).take(read) {
            codec::unpack(frame, params.width(), &mut input)?;
            stats.write_clips += transcoder.process_frame(&input, &mut output);
            if config.verbose {
                debug!("Input: {input:?} -> Output: {output:?}");
            }
            guard.write_frame(&output)?;
        }
        stats.frames += read;
        progress(stats.frames, total);
        if read < to_read {
            return Err(SourceError::by_reason(SourceErrorReason::Truncated {
                expected: total,
                actual: stats.frames,
            })
            .into());
        }
    }
    guard.finish()?;

    stats.quantizer_clips = transcoder.quantizer_clip_count();
    info!(
        target: log_target::PIPELINE_SUMMARY,
        "{{ frames: {}, channels: {}, quantizer_clips: {}, write_clips: {} }}",
        stats.frames,
        channels,
        stats.quantizer_clips,
        stats.write_clips,
    );
    Ok(stats)
}
