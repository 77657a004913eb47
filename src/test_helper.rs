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

#![allow(clippy::missing_panics_doc)]

use super::codec::SampleWidth;
use super::sigen::Signal;
use super::source::MemSource;

#[macro_export]
macro_rules! assert_close {
    ($actual:expr, $expected:expr, rtol = $rtol:expr, atol = $atol:expr) => {{
        let err = ($actual - $expected).abs();
        #[allow(clippy::suboptimal_flops)]
        let tol = $rtol * ($expected).abs() + $atol;
        assert!(
            err < tol,
            "{} is not close to {} (tol={})",
            $actual,
            $expected,
            tol
        );
    }};
    ($actual:expr, $expected:expr) => {{
        assert_close!($actual, $expected, rtol = 0.00001, atol = 0.00001);
    }};
}

/// Interleaves per-channel signals of the same length.
pub fn interleave(channel_signals: &[Vec<i32>]) -> Vec<i32> {
    let len = channel_signals.first().map_or(0, Vec::len);
    assert!(channel_signals.iter().all(|s| s.len() == len));
    let mut ret = Vec::with_capacity(len * channel_signals.len());
    for t in 0..len {
        for s in channel_signals {
            ret.push(s[t]);
        }
    }
    ret
}

/// Builds a `MemSource` with one generated signal per channel.
pub fn make_source(
    signals: &[&dyn Signal],
    width: SampleWidth,
    sample_rate: usize,
    len: usize,
) -> MemSource {
    let per_channel: Vec<Vec<i32>> = signals
        .iter()
        .map(|s| s.to_vec_quantized(width, len))
        .collect();
    MemSource::from_samples(&interleave(&per_channel), signals.len(), width, sample_rate)
}

/// Returns the mean of the values converted to `f64`.
pub fn mean<T: Copy + Into<f64>>(values: &[T]) -> f64 {
    values.iter().map(|v| (*v).into()).sum::<f64>() / values.len() as f64
}
