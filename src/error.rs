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

//! Error and verification traits

use std::error::Error;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::Deserialize;
#[cfg(feature = "serde")]
use serde::Serialize;

/// Error object returned when config integrity verification failed.
///
/// This error maintains a path to the component that is actually erroneous
/// in the nested components.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct VerifyError {
    components: Vec<String>,
    reason: String,
}

impl VerifyError {
    /// Makes verification error for an invalid variable `component`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// let err = VerifyError::new("output_bits", "must be 8 or 16");
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "verification error: `output_bits` is not valid. reason: must be 8 or 16"
    /// );
    /// ```
    pub fn new(component: &str, reason: &str) -> Self {
        Self {
            components: vec![component.to_owned()],
            reason: reason.to_owned(),
        }
    }

    /// Prepends the name of an enclosing component to the error location.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// let err = VerifyError::new("output_bits", "must be 8 or 16");
    /// let err = err.within("config");
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "verification error: `config.output_bits` is not valid. reason: must be 8 or 16"
    /// );
    /// ```
    #[must_use]
    pub fn within(self, component: &str) -> Self {
        let mut components = self.components;
        let reason = self.reason;
        components.push(component.to_owned());
        Self { components, reason }
    }

    /// Gets dot-separated path string for the error location.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// let err = VerifyError::new("channels", "must be greater than or equal to 1");
    /// let err = err.within("stream");
    /// assert_eq!(err.path(), "stream.channels");
    /// ```
    pub fn path(&self) -> String {
        let mut path = String::new();
        for (i, name) in self.components.iter().rev().enumerate() {
            if i != 0 {
                path.push('.');
            }
            path.push_str(name);
        }
        path
    }
}

impl Error for VerifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verification error: `{}` is not valid. reason: {}",
            self.path(),
            self.reason
        )
    }
}

/// A wrapper that ensures that the inner `T` is verified and unchanged.
///
/// `Verified<T>` can be obtained via [`Verify::into_verified`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct Verified<T>(T);

impl<T> std::ops::Deref for Verified<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

/// Trait for verifiable structs.
pub trait Verify: Sized + seal_verify::Sealed {
    /// Verifies there's no internal data inconsistency.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError` if there's an invalid variable.
    ///
    /// # Examples
    ///
    /// [`config::Transcode`] implements `Verify`.
    ///
    /// [`config::Transcode`]: crate::config::Transcode
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// # use lsbshaper::config::Transcode;
    /// let mut config = Transcode::default();
    /// config.output_bits = 12;  // invalid setting
    /// assert!(config.verify().is_err());
    ///
    /// config.output_bits = 8; // valid setting
    /// assert!(config.verify().is_ok());
    /// ```
    fn verify(&self) -> Result<(), VerifyError>;

    /// Wraps into `Verified` to indicate that the data is already verified.
    ///
    /// # Errors
    ///
    /// Returns the original input and `VerifyError` if `verify` failed.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// # use lsbshaper::config::Transcode;
    /// let mut config = Transcode::default();
    /// config.output_bits = 12;
    /// let (config, err) = config.into_verified().unwrap_err();
    /// assert_eq!(err.path(), "output_bits");
    ///
    /// let mut config = config;
    /// config.output_bits = 8;
    /// assert_eq!(config.into_verified().unwrap().output_bits, 8);
    /// ```
    fn into_verified(self) -> Result<Verified<Self>, (Self, VerifyError)> {
        let result = self.verify();
        if let Err(e) = result {
            Err((self, e))
        } else {
            Ok(Verified(self))
        }
    }
}

/// A wrapping function to make it compatible with "?" operator.
pub(crate) fn verify_macro_impl(cond: bool, varname: &str, msg: &str) -> Result<(), VerifyError> {
    if !cond {
        return Err(VerifyError::new(varname, msg));
    }
    Ok(())
}

/// Checks if `$cond` is true and do `return Err(...)` if so.
///
/// An error object `VerifyErr` is constructed using `$varname` and
/// `$msg` that are formatted using the extra args (`$args`).
macro_rules! verify_true {
    ($varname:literal, $cond:expr, $msg:literal, $($args: expr),*) => {
        crate::error::verify_macro_impl(
            $cond,
            &format!($varname, $($args),*),
            &format!($msg, $($args),*),
        )
    };
    ($varname:literal, $cond:expr, $msg:literal) => {
        verify_true!($varname, $cond, $msg,)
    }
}
pub(crate) use verify_true;

/// Checks if `$actual` is in the range, and emits err with default msgs if not.
///
/// An error is constructed using the same way as [`verify_true`].
macro_rules! verify_range {
    ($varname: literal, $actual:expr, $lowlimit:tt ..= $highlimit:tt) => {
        verify_range!($varname, $actual, ($lowlimit)..)
            .and_then(|()| verify_range!($varname, $actual, ..=($highlimit)))
    };
    ($varname: literal, $actual:expr, $lowlimit:tt ..) => {{
        #[allow(unused_parens)]
        let limit = $lowlimit;
        verify_true!(
            $varname,
            $actual >= limit,
            "must be greater than or equal to {limit}"
        )
    }};
    ($varname: literal, $actual:expr, ..= $highlimit:tt) => {{
        #[allow(unused_parens)]
        let limit = $highlimit;
        verify_true!(
            $varname,
            $actual <= limit,
            "must be less than or equal to {limit}"
        )
    }};
}
pub(crate) use verify_range;

/// Enum for possible errors while transcoding a stream.
#[non_exhaustive]
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Debug)]
pub enum TranscodeError {
    /// Errors due to input sources.
    Source(SourceError),
    /// Errors due to output sinks.
    Sink(SinkError),
    /// Errors due to invalid configuration or stream parameters.
    Config(VerifyError),
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::Source(e) => e.fmt(f),
            Self::Sink(e) => e.fmt(f),
            Self::Config(e) => e.fmt(f),
        }
    }
}

impl Error for TranscodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::Sink(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<SourceError> for TranscodeError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<SinkError> for TranscodeError {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

impl From<VerifyError> for TranscodeError {
    fn from(e: VerifyError) -> Self {
        Self::Config(e)
    }
}

/// Struct that wraps errors from [`Source`].
///
/// [`Source`]: crate::source::Source
#[derive(Clone, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SourceError {
    source_name: Option<String>,
    reason: SourceErrorReason,
}

impl SourceError {
    /// Constructs `SourceError` by choosing a reason.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// let err = SourceError::by_reason(SourceErrorReason::Open);
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "error occurred while reading <unknown>. reason: cannot open file."
    /// );
    /// ```
    pub const fn by_reason(reason: SourceErrorReason) -> Self {
        Self {
            source_name: None,
            reason,
        }
    }

    /// Constructs `SourceError` from an [`io::Error`].
    ///
    /// [`io::Error`]: std::io::Error
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// # use std::io;
    /// let err = SourceError::from_io_error(io::Error::new(io::ErrorKind::Other, "oh no!"));
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "error occurred while reading <unknown>. reason: I/O error: oh no!."
    /// );
    /// ```
    pub fn from_io_error<E: Error + 'static>(e: E) -> Self {
        Self {
            source_name: None,
            reason: SourceErrorReason::IO(Some(Rc::new(e))),
        }
    }

    /// Set path as the source name (informative when [`Source`] is file-based.)
    ///
    /// [`Source`]: crate::source::Source
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// let err = SourceError::by_reason(SourceErrorReason::Open);
    /// let err = err.set_path("missing.wav");
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "error occurred while reading missing.wav. reason: cannot open file."
    /// );
    /// ```
    #[must_use]
    pub fn set_path<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            source_name: Some(path.as_ref().to_string_lossy().to_string()),
            ..self
        }
    }

    /// Returns the reason of this error.
    pub const fn reason(&self) -> &SourceErrorReason {
        &self.reason
    }
}

/// Enum covering possible error reasons from [`Source`].
///
/// [`Source`]: crate::source::Source
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SourceErrorReason {
    /// The source file cannot be opened.
    Open,
    /// A byte block does not match the frame layout.
    InvalidBuffer,
    /// The content of file is not readable.
    InvalidFormat,
    /// Type of file is not supported.
    UnsupportedFormat,
    /// The source ended before the declared number of frames.
    Truncated {
        /// Number of frames declared in the stream header.
        expected: usize,
        /// Number of frames actually read.
        actual: usize,
    },
    /// Other IO-related error.
    IO(Option<Rc<dyn Error + 'static>>),
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error occurred while reading {}. reason: {}.",
            self.source_name
                .as_ref()
                .map_or("<unknown>", String::as_str),
            self.reason
        )
    }
}

impl fmt::Display for SourceErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => {
                write!(f, "cannot open file")
            }
            Self::InvalidBuffer => {
                write!(f, "buffer is invalid")
            }
            Self::InvalidFormat => {
                write!(f, "source format is invalid")
            }
            Self::UnsupportedFormat => {
                write!(f, "source format is not supported")
            }
            Self::Truncated { expected, actual } => {
                write!(f, "stream ended after {actual} of {expected} frames")
            }
            Self::IO(Some(cause)) => {
                write!(f, "I/O error: {cause}")
            }
            Self::IO(None) => {
                write!(f, "unknown I/O error")
            }
        }
    }
}

/// Struct that wraps errors from [`Sink`].
///
/// [`Sink`]: crate::source::Sink
#[derive(Clone, Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SinkError {
    sink_name: Option<String>,
    reason: SinkErrorReason,
}

impl SinkError {
    /// Constructs `SinkError` by choosing a reason.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lsbshaper::error::*;
    /// let err = SinkError::by_reason(SinkErrorReason::Closed);
    /// assert_eq!(
    ///     format!("{}", err),
    ///     "error occurred while writing <unknown>. reason: sink is already finalized."
    /// );
    /// ```
    pub const fn by_reason(reason: SinkErrorReason) -> Self {
        Self {
            sink_name: None,
            reason,
        }
    }

    /// Constructs `SinkError` from an I/O-related error.
    pub fn from_io_error<E: Error + 'static>(e: E) -> Self {
        Self {
            sink_name: None,
            reason: SinkErrorReason::IO(Some(Rc::new(e))),
        }
    }

    /// Set path as the sink name.
    #[must_use]
    pub fn set_path<P: AsRef<Path>>(self, path: P) -> Self {
        Self {
            sink_name: Some(path.as_ref().to_string_lossy().to_string()),
            ..self
        }
    }

    /// Returns the reason of this error.
    pub const fn reason(&self) -> &SinkErrorReason {
        &self.reason
    }
}

/// Enum covering possible error reasons from [`Sink`].
///
/// [`Sink`]: crate::source::Sink
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SinkErrorReason {
    /// The sink file cannot be created.
    Create,
    /// A frame does not have one sample per channel.
    InvalidBuffer,
    /// The sink was already finalized.
    Closed,
    /// Other IO-related error.
    IO(Option<Rc<dyn Error + 'static>>),
}

impl Error for SinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error occurred while writing {}. reason: {}.",
            self.sink_name.as_ref().map_or("<unknown>", String::as_str),
            self.reason
        )
    }
}

impl fmt::Display for SinkErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "cannot create file"),
            Self::InvalidBuffer => write!(f, "buffer is invalid"),
            Self::Closed => write!(f, "sink is already finalized"),
            Self::IO(Some(cause)) => write!(f, "I/O error: {cause}"),
            Self::IO(None) => write!(f, "unknown I/O error"),
        }
    }
}

mod seal_verify {
    pub trait Sealed {}

    impl Sealed for crate::config::Transcode {}
    impl Sealed for crate::source::StreamParams {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_range_reports_limits() {
        let channels = 0usize;
        let err = verify_range!("channels", channels, 1..).unwrap_err();
        assert_eq!(err.path(), "channels");
        assert_eq!(
            format!("{err}"),
            "verification error: `channels` is not valid. reason: must be greater than or equal to 1"
        );

        let bits = 40usize;
        let err = verify_range!("bits", bits, 8..=32).unwrap_err();
        assert!(format!("{err}").ends_with("must be less than or equal to 32"));
        assert!(verify_range!("bits", 24usize, 8..=32).is_ok());
    }

    #[test]
    fn truncation_is_described() {
        let err = SourceError::by_reason(SourceErrorReason::Truncated {
            expected: 100,
            actual: 42,
        })
        .set_path("in.wav");
        assert_eq!(
            format!("{err}"),
            "error occurred while reading in.wav. reason: stream ended after 42 of 100 frames."
        );
    }

    #[test]
    fn transcode_error_keeps_cause() {
        let err: TranscodeError = SinkError::by_reason(SinkErrorReason::Closed).into();
        assert!(matches!(err, TranscodeError::Sink(_)));
        assert!(err.source().is_some());
    }
}
