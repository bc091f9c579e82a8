//! Definition of errors.

use core::fmt;

use alloc::string::String;

#[cfg(feature = "std")]
use std::error::Error;

/// A specialized Result type.
pub type Result<T, E = SeqSvmError> = core::result::Result<T, E>;

/// The error type for SeqSVM.
#[derive(Debug)]
pub enum SeqSvmError {
    /// The argument is invalid.
    InvalidArgument(InvalidArgumentError),

    /// The quadratic-program solver failed.
    SolverFailure(SolverFailureError),
}

impl SeqSvmError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn solver_failure<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::SolverFailure(SolverFailureError { msg: msg.into() })
    }
}

impl fmt::Display for SeqSvmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::SolverFailure(e) => e.fmt(f),
        }
    }
}

#[cfg(feature = "std")]
impl Error for SeqSvmError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

#[cfg(feature = "std")]
impl Error for InvalidArgumentError {}

/// Error used when the quadratic program could not be solved.
///
/// A training run that hits this error emits no model.
#[derive(Debug)]
pub struct SolverFailureError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for SolverFailureError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SolverFailureError: {}", self.msg)
    }
}

#[cfg(feature = "std")]
impl Error for SolverFailureError {}
