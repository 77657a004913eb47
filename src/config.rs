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

//! Transcoder configuration structs.

#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::codec::SampleWidth;
use super::constant::width::DEFAULT_OUTPUT_BITS;
use super::constant::width::OUTPUT_BITS;
use super::constant::DEFAULT_BLOCK_FRAMES;
use super::error::verify_range;
use super::error::verify_true;
use super::error::Verify;
use super::error::VerifyError;

/// Configuration for a single transcoding run.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Transcode {
    /// Bit-depth of the output samples (8 or 16).
    pub output_bits: usize,
    /// If set, the quantizers clip to the output range while integrating.
    ///
    /// Otherwise, out-of-range values are only clamped when written.
    pub clip_during_integration: bool,
    /// If set, the output full-scale is reduced by one LSB.
    pub reduce_headroom: bool,
    /// If set, every input and output frame is logged at the debug level.
    ///
    /// This does not change the output samples.
    pub verbose: bool,
    /// The number of frames read from a source at once.
    pub block_frames: usize,
}

impl Default for Transcode {
    fn default() -> Self {
        Self {
            output_bits: DEFAULT_OUTPUT_BITS,
            clip_during_integration: false,
            reduce_headroom: true,
            verbose: false,
            block_frames: DEFAULT_BLOCK_FRAMES,
        }
    }
}

impl Transcode {
    /// Returns the output sample width.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if `output_bits` is not a supported target.
    pub fn output_width(&self) -> Result<SampleWidth, VerifyError> {
        self.verify_output_bits()?;
        SampleWidth::from_bits(self.output_bits).map_err(|e| e.within("output_bits"))
    }

    fn verify_output_bits(&self) -> Result<(), VerifyError> {
        verify_true!(
            "output_bits",
            OUTPUT_BITS.contains(&self.output_bits),
            "must be 8 or 16"
        )
    }
}

impl Verify for Transcode {
    fn verify(&self) -> Result<(), VerifyError> {
        self.verify_output_bits()?;
        verify_range!("block_frames", self.block_frames, 1..)?;
        Ok(())
    }
}
