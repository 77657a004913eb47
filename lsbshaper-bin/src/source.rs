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

//! WAV file sources and sinks for "lsbshaper-bin".

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use lsbshaper::codec::SampleWidth;
use lsbshaper::error::SinkError;
use lsbshaper::error::SinkErrorReason;
use lsbshaper::error::SourceError;
use lsbshaper::error::SourceErrorReason;
use lsbshaper::source::Sink;
use lsbshaper::source::Source;
use lsbshaper::source::StreamParams;

/// `lsbshaper::source::Source` based on `hound::WavReader`.
///
/// hound is only used for parsing the header. After that, the inner
/// `BufReader` is taken via `WavReader::into_inner` and the sample bytes are
/// read in blocks without per-sample conversion.
#[allow(clippy::module_name_repetitions)]
pub struct WavSource {
    params: StreamParams,
    reader: BufReader<File>,
    frames_read: usize,
    file_size: Option<usize>,
}

impl WavSource {
    /// Constructs `WavSource` from `path`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or parsed. WAVs with IEEE float
    /// samples or with a bit-depth other than 8, 16, 24, or 32 are reported
    /// as `SourceErrorReason::UnsupportedFormat`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file_size = path.metadata().ok().map(|x| x.len() as usize);
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| SourceError::from_io_error(e).set_path(path))?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(
                SourceError::by_reason(SourceErrorReason::UnsupportedFormat).set_path(path)
            );
        }
        let width = SampleWidth::from_bits(spec.bits_per_sample as usize).map_err(|_| {
            SourceError::by_reason(SourceErrorReason::UnsupportedFormat).set_path(path)
        })?;
        reader
            .seek(0)
            .map_err(|e| SourceError::from_io_error(e).set_path(path))?;
        let params = StreamParams::new(
            spec.channels as usize,
            width,
            spec.sample_rate as usize,
            reader.duration() as usize,
        );
        Ok(Self {
            params,
            reader: reader.into_inner(),
            frames_read: 0,
            file_size,
        })
    }

    pub const fn file_size(&self) -> Option<usize> {
        self.file_size
    }
}

impl Source for WavSource {
    fn params(&self) -> &StreamParams {
        &self.params
    }

    fn read_raw_frames(&mut self, frames: usize, dest: &mut Vec<u8>) -> Result<usize, SourceError> {
        dest.clear();
        let frame_bytes = self.params.frame_bytes();
        let to_read = std::cmp::min(frames, self.params.frame_count() - self.frames_read);
        (&mut self.reader)
            .take((to_read * frame_bytes) as u64)
            .read_to_end(dest)
            .map_err(SourceError::from_io_error)?;

        let read = dest.len() / frame_bytes;
        dest.truncate(read * frame_bytes);
        self.frames_read += read;
        Ok(read)
    }
}

/// `lsbshaper::source::Sink` based on `hound::WavWriter`.
#[allow(clippy::module_name_repetitions)]
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    width: SampleWidth,
    channels: usize,
    path: PathBuf,
}

impl WavSink {
    /// Creates a WAV file at `path` for the stream described by `params`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, params: &StreamParams) -> Result<Self, SinkError> {
        let path = path.as_ref();
        let spec = hound::WavSpec {
            channels: params.channels() as u16,
            sample_rate: params.sample_rate() as u32,
            bits_per_sample: params.width().bits() as u16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)
            .map_err(|_| SinkError::by_reason(SinkErrorReason::Create).set_path(path))?;
        Ok(Self {
            writer: Some(writer),
            width: params.width(),
            channels: params.channels(),
            path: path.to_path_buf(),
        })
    }
}

impl Sink for WavSink {
    fn write_frame(&mut self, samples: &[i32]) -> Result<(), SinkError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(SinkError::by_reason(SinkErrorReason::Closed).set_path(&self.path));
        };
        if samples.len() != self.channels {
            return Err(SinkError::by_reason(SinkErrorReason::InvalidBuffer));
        }
        for v in samples {
            let v = *v;
            let written = match self.width {
                // hound takes signed 8-bit samples and re-centers them.
                SampleWidth::U8 => writer.write_sample((v - 128) as i8),
                SampleWidth::S16 => writer.write_sample(v as i16),
                SampleWidth::S24 | SampleWidth::S32 => writer.write_sample(v),
            };
            written.map_err(|e| SinkError::from_io_error(e).set_path(&self.path))?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SinkError> {
        self.writer.take().map_or(Ok(()), |writer| {
            writer
                .finalize()
                .map_err(|e| SinkError::from_io_error(e).set_path(&self.path))
        })
    }
}
