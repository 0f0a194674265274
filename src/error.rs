//! Error type shared by the driver, the transports and the command-line tool.
//!
//! Two classes of failure exist. Validation errors are raised locally before
//! anything is sent to the instrument. Everything else comes from the
//! transport or from a reply that could not be parsed, and is passed through
//! to the caller unchanged.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A value outside the documented domain of a parameter.
    #[error("{0}")]
    Validation(String),

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Could not parse reply {reply:?} to '{command}'")]
    Parse { command: String, reply: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "instrument_visa")]
    #[error("VISA error: {0}")]
    Visa(#[from] visa_rs::Error),
}

impl Error {
    /// True when the error was raised by a local range check, i.e. nothing
    /// reached the instrument.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::UnknownParameter(_))
    }

    pub(crate) fn parse(command: &str, reply: &str) -> Self {
        Error::Parse {
            command: command.to_string(),
            reply: reply.to_string(),
        }
    }
}
