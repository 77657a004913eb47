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

//! Error-feedback quantizer that reduces real-valued samples to integers.
//!
//! The LSB error of each rounding is integrated so that the mean value of the
//! modulated LSB reconstructs the amplitude below the resolution of the
//! output. This works like an automatic dither, except that the injected
//! noise is correlated with the signal.

use log::warn;

use super::error::verify_true;
use super::error::VerifyError;

/// Single-pole running accumulator.
///
/// # Examples
///
/// ```
/// # use lsbshaper::shaper::Integrator;
/// let mut integrator = Integrator::new(0.0, None);
/// assert_eq!(integrator.integrate(5.0), 5.0);
/// assert_eq!(integrator.integrate(3.0), 8.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Integrator {
    offset: f64,
    init: f64,
    output: f64,
}

impl Integrator {
    /// Constructs `Integrator`. `init` defaults to `offset`.
    pub fn new(offset: f64, init: Option<f64>) -> Self {
        let mut ret = Self {
            offset,
            init: offset,
            output: offset,
        };
        ret.reset(None, init);
        ret
    }

    /// Accumulates `value - offset` and returns the new state.
    #[inline]
    pub fn integrate(&mut self, value: f64) -> f64 {
        self.output += value - self.offset;
        self.output
    }

    /// Restarts accumulation from `init`.
    ///
    /// `offset` is kept if not given. `init` falls back to the (new) offset.
    pub fn reset(&mut self, offset: Option<f64>, init: Option<f64>) {
        if let Some(offset) = offset {
            self.offset = offset;
        }
        self.init = init.unwrap_or(self.offset);
        self.output = self.init;
    }

    /// Returns the baseline subtracted from each input.
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Returns the state that `reset` restores.
    pub const fn init(&self) -> f64 {
        self.init
    }

    /// Returns the current accumulated state.
    pub const fn output(&self) -> f64 {
        self.output
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(0.0, None)
    }
}

/// Rounds to the nearest integer, ties to even.
///
/// Values outside of `i64` saturate, and NaN maps to zero.
#[inline]
fn round_to_int(v: f64) -> i64 {
    // float-to-int `as` casts saturate.
    v.round_ties_even() as i64
}

/// First-order noise-shaping quantizer for one channel.
///
/// # Examples
///
/// ```
/// # use lsbshaper::shaper::NoiseShapingQuantizer;
/// let mut q = NoiseShapingQuantizer::new(0.0, 1.0);
/// let outputs: Vec<i64> = (0..5).map(|_| q.transfer(2.6)).collect();
/// assert_eq!(outputs.iter().sum::<i64>(), 13);
/// ```
#[derive(Clone, Debug)]
pub struct NoiseShapingQuantizer {
    offset: f64,
    rounded_offset: i64,
    coef: f64,
    output: i64,
    // `output` before clipping.
    rounded: i64,
    min: Option<i64>,
    max: Option<i64>,
    integrator: Integrator,
    low_clips: usize,
    high_clips: usize,
}

impl NoiseShapingQuantizer {
    /// Constructs a quantizer with its own integrator.
    pub fn new(offset: f64, coef: f64) -> Self {
        Self::with_integrator(Integrator::new(-offset, Some(offset)), offset, coef)
    }

    /// Constructs a quantizer that takes over `integrator`.
    pub fn with_integrator(integrator: Integrator, offset: f64, coef: f64) -> Self {
        let rounded_offset = round_to_int(offset);
        Self {
            offset,
            rounded_offset,
            coef,
            output: rounded_offset,
            rounded: rounded_offset,
            min: None,
            max: None,
            integrator,
            low_clips: 0,
            high_clips: 0,
        }
    }

    /// Sets clip bounds and returns `self`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if both bounds are given and `min > max`.
    pub fn with_min_max(mut self, min: Option<i64>, max: Option<i64>) -> Result<Self, VerifyError> {
        self.set_min_max(min, max)?;
        Ok(self)
    }

    /// Quantizes `value` and returns the new output.
    ///
    /// The rounding error is kept in the integrator and compensated in the
    /// subsequent calls. Clipping is applied on the returned value only; the
    /// feedback path always sees the unclipped rounding result.
    #[allow(clippy::suboptimal_flops)]
    pub fn transfer(&mut self, value: f64) -> i64 {
        let residual = value * self.coef - self.rounded as f64;
        let accumulated = self.integrator.integrate(residual);
        self.rounded = round_to_int(accumulated);
        self.output = self.rounded;

        match (self.min, self.max) {
            (Some(min), _) if self.output < min => {
                warn!("Low clipping: {} -> {min}", self.output);
                self.low_clips += 1;
                self.output = min;
            }
            (_, Some(max)) if self.output > max => {
                warn!("High clipping: {} -> {max}", self.output);
                self.high_clips += 1;
                self.output = max;
            }
            _ => {}
        }
        self.output
    }

    /// Restarts the quantizer, optionally with new `offset` and `coef`.
    ///
    /// Clip bounds and clip counters are kept.
    pub fn reset(&mut self, offset: Option<f64>, coef: Option<f64>) {
        if let Some(offset) = offset {
            self.offset = offset;
            self.rounded_offset = round_to_int(offset);
        }
        if let Some(coef) = coef {
            self.coef = coef;
        }
        self.output = self.rounded_offset;
        self.rounded = self.rounded_offset;
        self.integrator.reset(Some(-self.offset), Some(self.offset));
    }

    /// Replaces the clip bounds. `None` disables that side.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if both bounds are given and `min > max`. The
    /// previous bounds are kept in that case.
    pub fn set_min_max(&mut self, min: Option<i64>, max: Option<i64>) -> Result<(), VerifyError> {
        if let (Some(lo), Some(hi)) = (min, max) {
            verify_true!("min", lo <= hi, "must not exceed max")?;
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// Returns the last emitted integer.
    pub const fn output(&self) -> i64 {
        self.output
    }

    /// Returns the nominal output bias.
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Returns the scale applied to the inputs.
    pub const fn coef(&self) -> f64 {
        self.coef
    }

    /// Returns the lower clip bound.
    pub const fn min(&self) -> Option<i64> {
        self.min
    }

    /// Returns the upper clip bound.
    pub const fn max(&self) -> Option<i64> {
        self.max
    }

    /// Returns a reference to the owned integrator.
    pub const fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    /// Returns the number of outputs clamped to `min`.
    pub const fn low_clip_count(&self) -> usize {
        self.low_clips
    }

    /// Returns the number of outputs clamped to `max`.
    pub const fn high_clip_count(&self) -> usize {
        self.high_clips
    }

    /// Returns the total number of clipped outputs.
    pub const fn clip_count(&self) -> usize {
        self.low_clips + self.high_clips
    }
}

impl Default for NoiseShapingQuantizer {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::assert_close;

    use rand::Rng;
    use rand::SeedableRng;
    use rstest::rstest;

    #[test]
    fn integrator_is_a_running_sum() {
        let mut integrator = Integrator::new(0.0, Some(0.0));
        assert_eq!(integrator.output(), 0.0);
        assert_eq!(integrator.integrate(5.0), 5.0);
        assert_eq!(integrator.integrate(3.0), 8.0);
    }

    #[test]
    fn integrator_init_follows_offset() {
        let mut integrator = Integrator::new(2.0, None);
        assert_eq!(integrator.init(), 2.0);
        assert_eq!(integrator.output(), 2.0);
        assert_eq!(integrator.integrate(5.0), 5.0);

        integrator.reset(None, None);
        assert_eq!(integrator.init(), 2.0);
        assert_eq!(integrator.output(), 2.0);

        integrator.reset(Some(-1.0), Some(4.0));
        assert_eq!(integrator.offset(), -1.0);
        assert_eq!(integrator.output(), 4.0);
        assert_eq!(integrator.integrate(1.0), 6.0);
    }

    #[test]
    fn quantizer_starts_at_rounded_offset() {
        let q = NoiseShapingQuantizer::new(2.5, 1.0);
        assert_eq!(q.output(), 2);
        assert_eq!(q.integrator().offset(), -2.5);
        assert_eq!(q.integrator().output(), 2.5);

        let q = NoiseShapingQuantizer::new(3.5, 1.0);
        assert_eq!(q.output(), 4);
    }

    #[test]
    fn constant_input_alternates_and_converges() {
        let mut q = NoiseShapingQuantizer::new(0.0, 1.0);
        let target = 2.6;
        let n = 1000;
        let outputs: Vec<i64> = (0..n).map(|_| q.transfer(target)).collect();

        assert_eq!(&outputs[0..4], &[3, 2, 3, 2]);
        for v in &outputs {
            assert!((*v as f64 - target).abs() <= 1.0);
        }
        for len in [10, 100, 1000] {
            let mean = outputs[0..len].iter().sum::<i64>() as f64 / len as f64;
            assert_close!(mean, target, rtol = 0.0, atol = 0.5 / len as f64 + 1e-9);
        }
    }

    #[test]
    fn coef_scales_input() {
        let mut q = NoiseShapingQuantizer::new(0.0, 0.5);
        let sum: i64 = (0..100).map(|_| q.transfer(3.0)).sum();
        assert!((sum - 150).abs() <= 1);
    }

    #[test]
    fn injected_integrator_is_used() {
        let mut q = NoiseShapingQuantizer::with_integrator(Integrator::new(0.0, Some(10.0)), 0.0, 1.0);
        assert_eq!(q.transfer(0.0), 10);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut q = NoiseShapingQuantizer::new(0.0, 1.0);
        let first: Vec<i64> = (0..7).map(|_| q.transfer(0.3)).collect();
        q.reset(None, None);
        assert_eq!(q.output(), 0);
        let second: Vec<i64> = (0..7).map(|_| q.transfer(0.3)).collect();
        assert_eq!(first, second);

        q.reset(Some(1.0), Some(2.0));
        assert_eq!(q.output(), 1);
        assert_eq!(q.coef(), 2.0);
        assert_eq!(q.integrator().offset(), -1.0);
        assert_eq!(q.integrator().init(), 1.0);
    }

    #[test]
    fn ties_are_rounded_to_even() {
        assert_eq!(round_to_int(0.5), 0);
        assert_eq!(round_to_int(1.5), 2);
        assert_eq!(round_to_int(-2.5), -2);
        assert_eq!(round_to_int(f64::NAN), 0);
        assert_eq!(round_to_int(f64::INFINITY), i64::MAX);
    }

    #[test]
    fn invalid_bounds_are_rejected() {
        let mut q = NoiseShapingQuantizer::default();
        q.set_min_max(Some(-3), Some(3)).unwrap();
        assert!(q.set_min_max(Some(4), Some(3)).is_err());
        assert_eq!((q.min(), q.max()), (Some(-3), Some(3)));
        q.set_min_max(None, Some(3)).unwrap();
        assert_eq!(q.min(), None);
    }

    #[rstest]
    fn clipped_outputs_stay_in_bounds(
        #[values((-128, 127), (0, 0), (-5, 40), (0, 255))] bounds: (i64, i64),
        #[values(1, 2, 3)] seed: u64,
    ) {
        let (min, max) = bounds;
        let mut q = NoiseShapingQuantizer::new(0.0, 1.0)
            .with_min_max(Some(min), Some(max))
            .unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        for _ in 0..2000 {
            let v = rng.gen_range(-1000.0..1000.0);
            let out = q.transfer(v);
            assert!(min <= out && out <= max);
        }
        assert!(q.clip_count() > 0);
    }

    #[test]
    fn clipping_does_not_wind_up() {
        let mut q = NoiseShapingQuantizer::new(0.0, 1.0)
            .with_min_max(Some(-10), Some(10))
            .unwrap();
        for _ in 0..100 {
            assert_eq!(q.transfer(50.0), 10);
        }
        assert_eq!(q.high_clip_count(), 100);
        assert_eq!(q.low_clip_count(), 0);

        // Back in range, the output follows the input right away.
        let outputs: Vec<i64> = (0..4).map(|_| q.transfer(1.0)).collect();
        assert!(outputs.iter().all(|v| (*v - 1).abs() <= 1));
        assert_eq!(q.high_clip_count(), 100);
    }

    #[test]
    fn one_sided_bounds() {
        let mut q = NoiseShapingQuantizer::new(0.0, 1.0)
            .with_min_max(None, Some(0))
            .unwrap();
        assert_eq!(q.transfer(-100.0), -100);
        assert_eq!(q.transfer(100.0), 0);
        assert_eq!(q.clip_count(), 1);
    }
}
