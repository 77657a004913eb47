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

//! Module for input source and output sink handling.

#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::codec;
use super::codec::SampleWidth;
use super::constant::MAX_CHANNELS;
use super::error::verify_range;
use super::error::verify_true;
use super::error::SinkError;
use super::error::SinkErrorReason;
use super::error::SourceError;
use super::error::Verify;
use super::error::VerifyError;

/// Compression tag of uncompressed PCM streams.
const UNCOMPRESSED_TAG: &str = "NONE";

/// Stream-level parameters shared by the input and the output.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct StreamParams {
    channels: usize,
    width: SampleWidth,
    sample_rate: usize,
    frame_count: usize,
    compression: String,
}

impl StreamParams {
    /// Constructs parameters of an uncompressed PCM stream.
    pub fn new(channels: usize, width: SampleWidth, sample_rate: usize, frame_count: usize) -> Self {
        Self {
            channels,
            width,
            sample_rate,
            frame_count,
            compression: UNCOMPRESSED_TAG.to_owned(),
        }
    }

    /// Replaces the compression tag.
    #[must_use]
    pub fn with_compression(self, tag: &str) -> Self {
        Self {
            compression: tag.to_owned(),
            ..self
        }
    }

    /// Returns a copy of the parameters with a different sample width.
    #[must_use]
    pub fn with_width(&self, width: SampleWidth) -> Self {
        Self {
            width,
            ..self.clone()
        }
    }

    /// Returns the number of channels.
    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Returns the sample width.
    pub const fn width(&self) -> SampleWidth {
        self.width
    }

    /// Returns sampling rate in Hz.
    pub const fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    /// Returns the declared number of frames.
    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Returns the compression tag.
    pub fn compression(&self) -> &str {
        &self.compression
    }

    /// Returns the size of one raw frame in bytes.
    pub const fn frame_bytes(&self) -> usize {
        self.channels * self.width.bytes()
    }

    /// Returns the duration of the stream in seconds.
    pub fn duration_as_secs(&self) -> f32 {
        self.frame_count as f32 / self.sample_rate as f32
    }
}

impl Verify for StreamParams {
    fn verify(&self) -> Result<(), VerifyError> {
        verify_range!("channels", self.channels, 1..=MAX_CHANNELS)?;
        verify_range!("sample_rate", self.sample_rate, 1..)?;
        Ok(())
    }
}

/// Pull interface for raw PCM frames.
pub trait Source {
    /// Returns the stream parameters.
    fn params(&self) -> &StreamParams;

    /// Reads up to `frames` frames as raw bytes into `dest`.
    ///
    /// `dest` is cleared first and holds whole frames only. Returns the
    /// number of frames read, that is zero at the end of the stream.
    #[allow(clippy::missing_errors_doc)]
    fn read_raw_frames(&mut self, frames: usize, dest: &mut Vec<u8>) -> Result<usize, SourceError>;
}

/// Push interface for PCM frames.
pub trait Sink {
    /// Writes one frame of samples that are already in the legal range.
    #[allow(clippy::missing_errors_doc)]
    fn write_frame(&mut self, samples: &[i32]) -> Result<(), SinkError>;

    /// Flushes and closes the sink.
    ///
    /// Calling this more than once must not fail.
    #[allow(clippy::missing_errors_doc)]
    fn finalize(&mut self) -> Result<(), SinkError>;
}

/// Source with preloaded raw bytes.
#[derive(Clone, Debug)]
pub struct MemSource {
    params: StreamParams,
    bytes: Vec<u8>,
    read_head: usize,
}

impl MemSource {
    /// Constructs `MemSource` from raw frame bytes.
    ///
    /// `params.frame_count()` is kept as declared, so a byte block shorter
    /// than declared behaves like a truncated file.
    pub fn from_raw_bytes(bytes: &[u8], params: StreamParams) -> Self {
        Self {
            params,
            bytes: bytes.to_owned(),
            read_head: 0,
        }
    }

    /// Constructs `MemSource` from interleaved samples.
    ///
    /// Samples outside of the range of `width` are clipped.
    pub fn from_samples(
        samples: &[i32],
        channels: usize,
        width: SampleWidth,
        sample_rate: usize,
    ) -> Self {
        let mut bytes = Vec::new();
        codec::pack(samples, width, &mut bytes);
        let params = StreamParams::new(channels, width, sample_rate, samples.len() / channels);
        Self::from_raw_bytes(&bytes, params)
    }

    /// Returns the raw bytes.
    pub fn as_raw_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Source for MemSource {
    fn params(&self) -> &StreamParams {
        &self.params
    }

    fn read_raw_frames(&mut self, frames: usize, dest: &mut Vec<u8>) -> Result<usize, SourceError> {
        dest.clear();
        let frame_bytes = self.params.frame_bytes();
        let available = (self.bytes.len() - self.read_head) / frame_bytes;
        let to_read = std::cmp::min(frames, available);
        let end = self.read_head + to_read * frame_bytes;
        dest.extend_from_slice(&self.bytes[self.read_head..end]);
        self.read_head = end;
        Ok(to_read)
    }
}

/// Sink that packs frames into memory.
#[derive(Clone, Debug)]
pub struct MemSink {
    params: StreamParams,
    bytes: Vec<u8>,
    frames_written: usize,
    finalized: bool,
}

impl MemSink {
    /// Constructs an empty `MemSink` for the given output parameters.
    pub fn new(params: StreamParams) -> Self {
        Self {
            params,
            bytes: Vec::new(),
            frames_written: 0,
            finalized: false,
        }
    }

    /// Returns the output parameters with the actual number of frames.
    pub fn params(&self) -> StreamParams {
        StreamParams {
            frame_count: self.frames_written,
            ..self.params.clone()
        }
    }

    /// Returns the packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the number of frames written.
    pub const fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Returns `true` if `finalize` has been called.
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Decodes the written bytes back to interleaved samples.
    ///
    /// # Errors
    ///
    /// Never fails for the bytes written by `write_frame`.
    pub fn to_samples(&self) -> Result<Vec<i32>, SourceError> {
        let mut ret = vec![0i32; self.bytes.len() / self.params.width().bytes()];
        codec::unpack(&self.bytes, self.params.width(), &mut ret)?;
        Ok(ret)
    }

    /// Converts into a `MemSource` that replays the written frames.
    pub fn into_source(self) -> MemSource {
        let params = self.params();
        MemSource::from_raw_bytes(&self.bytes, params)
    }
}

impl Sink for MemSink {
    fn write_frame(&mut self, samples: &[i32]) -> Result<(), SinkError> {
        if self.finalized {
            return Err(SinkError::by_reason(SinkErrorReason::Closed));
        }
        if samples.len() != self.params.channels() {
            return Err(SinkError::by_reason(SinkErrorReason::InvalidBuffer));
        }
        codec::pack(samples, self.params.width(), &mut self.bytes);
        self.frames_written += 1;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        self.finalized = true;
        Ok(())
    }
}
