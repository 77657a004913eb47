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

//! Configuration constants

// Constants sorted in an alphabetical-order.  Top-level constants first, and
// then sub-modules. Constants that are used only in a specific sub-module or
// its caller should be placed in the corresponding submodule.

/// Default number of frames read from a source at once.
pub const DEFAULT_BLOCK_FRAMES: usize = 4096;

/// Maximum number of channels (limited by the WAV header field.)
pub const MAX_CHANNELS: usize = u16::MAX as usize;

/// Sub-module containing constants related to build-time information.
pub mod build_info {
    pub const CRATE_VERSION: &str = match option_env!("CARGO_PKG_VERSION") {
        Some(v) => v,
        None => "unknown",
    };
}

/// Constants related to sample widths.
pub mod width {
    /// Bit-depths accepted on the input side.
    pub const SUPPORTED_BITS: [usize; 4] = [8, 16, 24, 32];

    /// Bit-depths accepted as a conversion target.
    pub const OUTPUT_BITS: [usize; 2] = [8, 16];

    /// Default conversion target.
    pub const DEFAULT_OUTPUT_BITS: usize = 16;

    /// Zero-point of byte-centered (unsigned 8-bit) samples.
    pub const UNSIGNED_ZERO_POINT: i32 = 128;
}

/// Log targets for machine-readable summaries.
pub mod log_target {
    /// Target used for the per-run summary line.
    pub const PIPELINE_SUMMARY: &str = "lsbshaper::pipeline::jsonl";
}
