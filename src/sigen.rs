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

//! Test signal generator module.
//!
//! This is mostly used by the unit tests, but it is also exported via
//! `__export_sigen` feature so the fuzzer and the binary crate tests can
//! synthesize inputs.

use rand::Rng;
use rand::SeedableRng;

use super::codec::SampleWidth;

/// Test signal generators.
///
/// Signals are real-valued with the full-scale being `[-1.0, 1.0]`.
pub trait Signal: std::fmt::Debug {
    /// Generates a signal from t=`sample_offset` and fills the buffer `dest`.
    fn fill_buffer(&self, sample_offset: usize, dest: &mut [f32]);

    /// Generates `len` samples quantized into the domain of `width`.
    ///
    /// Zero maps to the zero-point of `width`, e.g. 128 for 8-bit streams.
    fn to_vec_quantized(&self, width: SampleWidth, len: usize) -> Vec<i32> {
        let scalefactor = (1u64 << (width.bits() - 1)) as f64;
        let offset = f64::from(width.zero_point());
        let min_target = f64::from(width.min_value());
        let max_target = f64::from(width.max_value());

        let mut buffer = vec![0.0f32; len];
        self.fill_buffer(0, &mut buffer);
        buffer
            .iter()
            .map(|x| {
                (scalefactor * f64::from(*x) + offset)
                    .round()
                    .clamp(min_target, max_target) as i32
            })
            .collect()
    }

    /// Decorate the signal generator with output clipping.
    fn clip(self) -> Clip<Self>
    where
        Self: Sized,
    {
        Clip::new(self)
    }

    /// Mixes noise
    fn noise_with_seed(self, seed0: u64, amplitude: f32) -> Mix<Self, Noise>
    where
        Self: Sized,
    {
        self.mix(Noise::with_seed(seed0, amplitude))
    }

    /// Mixes signal from the other generator
    fn mix<T: Signal + Sized>(self, other: T) -> Mix<Self, T>
    where
        Self: Sized,
    {
        Mix::new(1.0, self, 1.0, other)
    }
}

impl<T: Signal + ?Sized> Signal for Box<T> {
    fn fill_buffer(&self, sample_offset: usize, dest: &mut [f32]) {
        self.as_ref().fill_buffer(sample_offset, dest);
    }
}

/// Generator for constant signals.
#[derive(Clone, Debug)]
pub struct Dc {
    offset: f32,
}

impl Dc {
    /// Constructs new `Dc` signal.
    pub fn new(offset: f32) -> Self {
        Self { offset }
    }
}

impl Signal for Dc {
    fn fill_buffer(&self, _offset: usize, dest: &mut [f32]) {
        dest.fill(self.offset);
    }
}

/// Generator for a sinusoidal wave.
#[derive(Clone, Debug)]
pub struct Sine {
    period: usize,
    amplitude: f32,
    initial_phase: f32,
}

impl Sine {
    /// Constructs new sine wave signal with `period` and `amplitude`.
    pub fn new(period: usize, amplitude: f32) -> Self {
        Self::with_initial_phase(period, amplitude, 0.0)
    }

    pub fn with_initial_phase(period: usize, amplitude: f32, initial_phase: f32) -> Self {
        Self {
            period,
            amplitude,
            initial_phase,
        }
    }
}

impl Signal for Sine {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        let period = self.period as f32;
        for (t, p) in dest.iter_mut().enumerate() {
            let t = (t + offset) as f32;
            *p = self.amplitude
                * f32::sin(self.initial_phase + 2.0 * std::f32::consts::PI * t / period);
        }
    }
}

/// Generator for a uniform random white noise.
#[derive(Clone, Debug)]
pub struct Noise {
    seed0: u64,
    amplitude: f32,
}

impl Noise {
    /// Constructs new noise generator with specifying a seed.
    pub fn with_seed(seed0: u64, amplitude: f32) -> Self {
        Self { seed0, amplitude }
    }
}

impl Signal for Noise {
    /// Fills buffer with the uniform random values.
    ///
    /// The same `(offset, dest.len())` pair always yields the same samples.
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed0.wrapping_add(offset as u64));
        for p in dest {
            *p = self.amplitude * 2.0 * (rng.sample::<f32, _>(rand::distributions::Open01) - 0.5);
        }
    }
}

/// Decorator that mixes outputs from the inner generators.
#[derive(Clone, Debug)]
pub struct Mix<T1: Signal + Sized, T2: Signal + Sized> {
    weight1: f32,
    weight2: f32,
    signal1: T1,
    signal2: T2,
}

impl<T1: Signal + Sized, T2: Signal + Sized> Mix<T1, T2> {
    /// Constructs new two-inputs mixer.
    pub fn new(weight1: f32, signal1: T1, weight2: f32, signal2: T2) -> Self {
        Self {
            weight1,
            weight2,
            signal1,
            signal2,
        }
    }
}

impl<T1: Signal + Sized, T2: Signal + Sized> Signal for Mix<T1, T2> {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        let mut buf = vec![0.0f32; dest.len()];
        self.signal1.fill_buffer(offset, &mut buf);
        for (p, x) in dest.iter_mut().zip(&buf) {
            *p = self.weight1 * *x;
        }
        self.signal2.fill_buffer(offset, &mut buf);
        for (p, x) in dest.iter_mut().zip(&buf) {
            *p += self.weight2 * *x;
        }
    }
}

/// Decorator that clips the output of the inner generator to `[-1.0, 1.0]`.
#[derive(Clone, Debug)]
pub struct Clip<T: Signal + Sized> {
    inner: T,
}

impl<T: Signal + Sized> Clip<T> {
    /// Constructs a clipper.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: Signal + Sized> Signal for Clip<T> {
    fn fill_buffer(&self, offset: usize, dest: &mut [f32]) {
        self.inner.fill_buffer(offset, dest);
        for p in dest {
            *p = p.clamp(-1.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_follows_zero_point() {
        assert_eq!(Dc::new(0.0).to_vec_quantized(SampleWidth::U8, 3), vec![128; 3]);
        assert_eq!(Dc::new(0.0).to_vec_quantized(SampleWidth::S16, 3), vec![0; 3]);
        assert_eq!(Dc::new(0.5).to_vec_quantized(SampleWidth::S24, 1), vec![4_194_304]);
        assert_eq!(Dc::new(1.0).to_vec_quantized(SampleWidth::U8, 1), vec![255]);
        assert_eq!(
            Dc::new(-1.0).to_vec_quantized(SampleWidth::S32, 1),
            vec![i32::MIN]
        );
    }

    #[test]
    fn mixed_signals_are_clipped() {
        let signal = Dc::new(0.9).mix(Sine::new(16, 0.5)).clip();
        let mut buf = vec![0.0f32; 64];
        signal.fill_buffer(0, &mut buf);
        assert!(buf.iter().all(|x| (0.39..=1.0).contains(x)));
        assert!(buf.iter().any(|x| *x == 1.0));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let signal: Box<dyn Signal> = Box::new(Dc::new(0.0).noise_with_seed(42, 0.1));
        let a = signal.to_vec_quantized(SampleWidth::S16, 100);
        let b = signal.to_vec_quantized(SampleWidth::S16, 100);
        assert_eq!(a, b);
        assert!(a.iter().all(|v| v.abs() <= 3277));
    }
}
