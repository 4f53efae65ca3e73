//! Unified error type.

use std::fmt;

/// The error type returned by joinpoint's fallible operations.
///
/// Handler failures are not `Error`s: they travel through the advice chain
/// as a [`Failure`](crate::Failure) and reach the client as a `500`. This
/// type covers startup and infrastructure problems only.
#[derive(Debug)]
pub enum Error {
    /// Binding the listener or accepting a connection failed.
    Io(std::io::Error),
    /// A configuration value could not be parsed.
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
