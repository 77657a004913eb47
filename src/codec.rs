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

//! Sample codec for packing/ unpacking little-endian PCM frames.
//!
//! 8-bit samples are unsigned (byte-centered at 128) as in WAV files, and all
//! the other widths are two's-complement signed integers.

use std::fmt;

use log::warn;
#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

use super::constant::width::UNSIGNED_ZERO_POINT;
use super::error::SourceError;
use super::error::SourceErrorReason;
use super::error::VerifyError;

/// Supported PCM sample widths.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum SampleWidth {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 24-bit, packed in 3 bytes.
    S24,
    /// Signed 32-bit.
    S32,
}

/// Row of the width table.
#[derive(Clone, Copy)]
struct WidthInfo {
    bits: usize,
    signed: bool,
    min: i32,
    max: i32,
    zero_point: i32,
}

// Indexed by `SampleWidth as usize`.
const WIDTH_TABLE: [WidthInfo; 4] = [
    WidthInfo {
        bits: 8,
        signed: false,
        min: 0,
        max: 255,
        zero_point: UNSIGNED_ZERO_POINT,
    },
    WidthInfo {
        bits: 16,
        signed: true,
        min: i16::MIN as i32,
        max: i16::MAX as i32,
        zero_point: 0,
    },
    WidthInfo {
        bits: 24,
        signed: true,
        min: -(1 << 23),
        max: (1 << 23) - 1,
        zero_point: 0,
    },
    WidthInfo {
        bits: 32,
        signed: true,
        min: i32::MIN,
        max: i32::MAX,
        zero_point: 0,
    },
];

impl SampleWidth {
    /// All the supported widths, narrowest first.
    pub const ALL: [Self; 4] = [Self::U8, Self::S16, Self::S24, Self::S32];

    /// Looks up the width for the given bit-depth.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if `bits` is not one of 8, 16, 24, or 32.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::codec::SampleWidth;
    /// assert_eq!(SampleWidth::from_bits(24).unwrap(), SampleWidth::S24);
    /// assert!(SampleWidth::from_bits(20).is_err());
    /// ```
    pub fn from_bits(bits: usize) -> Result<Self, VerifyError> {
        Self::ALL
            .into_iter()
            .find(|w| w.bits() == bits)
            .ok_or_else(|| VerifyError::new("bits_per_sample", "must be one of 8, 16, 24, 32"))
    }

    /// Looks up the width for the given number of bytes per sample.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if `bytes` is not in `1..=4`.
    pub fn from_bytes(bytes: usize) -> Result<Self, VerifyError> {
        Self::ALL
            .into_iter()
            .find(|w| w.bytes() == bytes)
            .ok_or_else(|| VerifyError::new("bytes_per_sample", "must be one of 1, 2, 3, 4"))
    }

    const fn info(self) -> WidthInfo {
        WIDTH_TABLE[self as usize]
    }

    /// Returns the number of bits per sample.
    pub const fn bits(self) -> usize {
        self.info().bits
    }

    /// Returns the number of bytes per sample.
    pub const fn bytes(self) -> usize {
        self.info().bits / 8
    }

    /// Returns `true` if the samples are two's-complement signed integers.
    pub const fn is_signed(self) -> bool {
        self.info().signed
    }

    /// Returns the smallest legal sample value.
    pub const fn min_value(self) -> i32 {
        self.info().min
    }

    /// Returns the largest legal sample value.
    pub const fn max_value(self) -> i32 {
        self.info().max
    }

    /// Returns the sample value that represents silence.
    pub const fn zero_point(self) -> i32 {
        self.info().zero_point
    }

    /// Returns `true` if `value` is representable in this width.
    pub fn contains(self, value: i64) -> bool {
        (i64::from(self.min_value())..=i64::from(self.max_value())).contains(&value)
    }

    /// Clamps `value` into the legal range of this width.
    ///
    /// Out-of-range values are not an error; the nearest bound is returned
    /// and a warning is logged.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::codec::SampleWidth;
    /// assert_eq!(SampleWidth::U8.constrain_value(-3), 0);
    /// assert_eq!(SampleWidth::U8.constrain_value(77), 77);
    /// assert_eq!(SampleWidth::S16.constrain_value(40000), 32767);
    /// ```
    pub fn constrain_value(self, value: i64) -> i32 {
        let min = self.min_value();
        let max = self.max_value();
        if value < i64::from(min) {
            warn!("Low clipping ({self}): {value} -> {min}");
            min
        } else if value > i64::from(max) {
            warn!("High clipping ({self}): {value} -> {max}");
            max
        } else {
            value as i32
        }
    }
}

impl fmt::Display for SampleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_signed() { "signed" } else { "unsigned" };
        write!(f, "{}-bit {sign}", self.bits())
    }
}

/// Extends a 3-byte little-endian sample to 4 bytes keeping its sign.
///
/// # Examples
///
/// ```
/// # use lsbshaper::codec::sign_extend_24;
/// assert_eq!(sign_extend_24([0x00, 0x00, 0x7F]), [0x00, 0x00, 0x7F, 0x00]);
/// assert_eq!(sign_extend_24([0x00, 0x00, 0x80]), [0x00, 0x00, 0x80, 0xFF]);
/// ```
#[inline]
pub const fn sign_extend_24(bytes: [u8; 3]) -> [u8; 4] {
    let ext = if bytes[2] >= 0x80 { 0xFF } else { 0x00 };
    [bytes[0], bytes[1], bytes[2], ext]
}

/// Converts a block of little-endian samples into integers.
///
/// `dest` must have exactly one element per sample in `bytes`.
///
/// # Errors
///
/// Returns `SourceError` with `SourceErrorReason::InvalidBuffer` if the
/// length of `bytes` is not `dest.len() * width.bytes()`.
///
/// # Examples
///
/// ```
/// # use lsbshaper::codec::*;
/// let mut dest = [0i32; 2];
/// unpack(&[0x01, 0x80, 0xFF, 0x7F], SampleWidth::S16, &mut dest).unwrap();
/// assert_eq!(dest, [-32767, 32767]);
/// ```
pub fn unpack(bytes: &[u8], width: SampleWidth, dest: &mut [i32]) -> Result<(), SourceError> {
    if bytes.len() != dest.len() * width.bytes() {
        return Err(SourceError::by_reason(SourceErrorReason::InvalidBuffer));
    }
    let chunks = bytes.chunks_exact(width.bytes());
    match width {
        SampleWidth::U8 => {
            for (p, b) in dest.iter_mut().zip(bytes) {
                *p = i32::from(*b);
            }
        }
        SampleWidth::S16 => {
            for (p, c) in dest.iter_mut().zip(chunks) {
                *p = i32::from(i16::from_le_bytes([c[0], c[1]]));
            }
        }
        SampleWidth::S24 => {
            for (p, c) in dest.iter_mut().zip(chunks) {
                *p = i32::from_le_bytes(sign_extend_24([c[0], c[1], c[2]]));
            }
        }
        SampleWidth::S32 => {
            for (p, c) in dest.iter_mut().zip(chunks) {
                *p = i32::from_le_bytes([c[0], c[1], c[2], c[3]]);
            }
        }
    }
    Ok(())
}

/// Clamps and serializes samples, appending the bytes to `dest`.
///
/// Every sample goes through [`SampleWidth::constrain_value`] first. 24-bit
/// samples keep the low 3 bytes of their 32-bit representation.
///
/// # Examples
///
/// ```
/// # use lsbshaper::codec::*;
/// let mut bytes = vec![];
/// pack(&[-1i32, 300], SampleWidth::U8, &mut bytes);
/// assert_eq!(bytes, [0x00, 0xFF]);
/// ```
pub fn pack<T>(samples: &[T], width: SampleWidth, dest: &mut Vec<u8>)
where
    T: Copy + Into<i64>,
{
    dest.reserve(samples.len() * width.bytes());
    for v in samples {
        let v = width.constrain_value((*v).into());
        match width {
            SampleWidth::U8 => dest.push(v as u8),
            SampleWidth::S16 => dest.extend_from_slice(&(v as i16).to_le_bytes()),
            SampleWidth::S24 => dest.extend_from_slice(&v.to_le_bytes()[0..3]),
            SampleWidth::S32 => dest.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// Clamps `values` into `dest` and returns the number of clipped samples.
///
/// # Panics
///
/// Panics if `dest` is shorter than `values`.
pub fn constrain_values(values: &[i64], width: SampleWidth, dest: &mut [i32]) -> usize {
    assert!(dest.len() >= values.len());
    let mut clipped = 0;
    for (p, v) in dest.iter_mut().zip(values) {
        *p = width.constrain_value(*v);
        if i64::from(*p) != *v {
            clipped += 1;
        }
    }
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::Rng;
    use rand::SeedableRng;
    use rstest::rstest;

    #[test]
    fn width_table_is_consistent() {
        for w in SampleWidth::ALL {
            assert_eq!(SampleWidth::from_bits(w.bits()).unwrap(), w);
            assert_eq!(SampleWidth::from_bytes(w.bytes()).unwrap(), w);
            assert!(w.min_value() < w.max_value());
            assert!(w.contains(i64::from(w.zero_point())));
        }
        assert_eq!(SampleWidth::U8.min_value(), 0);
        assert_eq!(SampleWidth::U8.max_value(), 255);
        assert_eq!(SampleWidth::S24.min_value(), -8_388_608);
        assert_eq!(SampleWidth::S24.max_value(), 8_388_607);
        assert!(SampleWidth::from_bytes(0).is_err());
        assert!(SampleWidth::from_bits(64).is_err());
    }

    #[test]
    fn unpack_24bit_boundary_is_negative() {
        let mut dest = [0i32; 1];
        unpack(&[0x00, 0x00, 0x80], SampleWidth::S24, &mut dest).unwrap();
        assert_eq!(dest, [-8_388_608]);

        unpack(&[0xFF, 0xFF, 0x7F], SampleWidth::S24, &mut dest).unwrap();
        assert_eq!(dest, [8_388_607]);

        unpack(&[0xFF, 0xFF, 0xFF], SampleWidth::S24, &mut dest).unwrap();
        assert_eq!(dest, [-1]);
    }

    #[test]
    fn unpack_multichannel_frame() {
        let bytes = [
            0x56, 0x34, 0x12, 0x9B, 0x57, 0x13, 0xFF, 0xFF, 0xFF, 0xAC, 0x68, 0x24,
        ];
        let mut dest = [0i32; 4];
        unpack(&bytes, SampleWidth::S24, &mut dest).unwrap();
        assert_eq!(dest, [0x12_3456, 0x13_579B, -1, 0x24_68AC]);
    }

    #[test]
    fn unpack_rejects_mismatched_lengths() {
        let mut dest = [0i32; 2];
        assert!(unpack(&[0u8; 5], SampleWidth::S24, &mut dest).is_err());
        assert!(unpack(&[0u8; 3], SampleWidth::U8, &mut dest).is_err());
        assert!(unpack(&[0u8; 8], SampleWidth::S32, &mut dest).is_ok());
    }

    #[rstest]
    fn round_trip_at_the_edges(
        #[values(SampleWidth::U8, SampleWidth::S16, SampleWidth::S24, SampleWidth::S32)]
        width: SampleWidth,
    ) {
        let edges = [
            width.min_value(),
            width.min_value() + 1,
            width.zero_point(),
            width.max_value() - 1,
            width.max_value(),
        ];
        let mut bytes = vec![];
        pack(&edges, width, &mut bytes);
        assert_eq!(bytes.len(), edges.len() * width.bytes());

        let mut decoded = [0i32; 5];
        unpack(&bytes, width, &mut decoded).unwrap();
        assert_eq!(decoded, edges);
    }

    #[rstest]
    fn round_trip_random_values(
        #[values(SampleWidth::U8, SampleWidth::S16, SampleWidth::S24, SampleWidth::S32)]
        width: SampleWidth,
    ) {
        let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
        for _ in 0..256 {
            let v = rng.gen_range(width.min_value()..=width.max_value());
            let mut bytes = vec![];
            pack(&[v], width, &mut bytes);
            let mut decoded = [0i32; 1];
            unpack(&bytes, width, &mut decoded).unwrap();
            assert_eq!(decoded, [v]);
        }
    }

    #[test]
    fn pack_clamps_out_of_range_samples() {
        let mut bytes = vec![];
        pack(&[40_000i64, -40_000i64], SampleWidth::S16, &mut bytes);
        assert_eq!(bytes, [0xFF, 0x7F, 0x00, 0x80]);

        let mut bytes = vec![];
        pack(&[i64::from(i32::MAX) + 10], SampleWidth::S32, &mut bytes);
        assert_eq!(bytes, i32::MAX.to_le_bytes());

        let mut bytes = vec![];
        pack(&[-8_388_609i64], SampleWidth::S24, &mut bytes);
        assert_eq!(bytes, [0x00, 0x00, 0x80]);
    }

    #[test]
    fn constrain_values_counts_clips() {
        let mut dest = [0i32; 4];
        let clipped = constrain_values(&[-1, 0, 255, 256], SampleWidth::U8, &mut dest);
        assert_eq!(clipped, 2);
        assert_eq!(dest, [0, 0, 255, 255]);
    }

    #[test]
    fn display_names() {
        assert_eq!(format!("{}", SampleWidth::U8), "8-bit unsigned");
        assert_eq!(format!("{}", SampleWidth::S24), "24-bit signed");
    }
}
