//! Error taxonomy for the transcoder.
//!
//! Three kinds are distinguished so callers can tell bad input apart from
//! environment problems and from bugs:
//! - `MalformedInput`: the ELF is not a supported four-segment image.
//! - `ResourceUnavailable`: an input/output/icon file could not be used.
//! - `Internal`: a dependency broke its contract (e.g. a digest that is not
//!   32 bytes). Never caused by user input.
//!
//! All variants flow through `anyhow::Result` at module boundaries; tests
//! and callers recover the kind with `downcast_ref::<ConvertError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The input is structurally not a supported executable image.
    /// Fatal; no output is written.
    #[error("malformed input image: {0}")]
    MalformedInput(String),

    /// A file could not be read or written. The underlying I/O error is
    /// surfaced verbatim.
    #[error("cannot access {path}: {source}")]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An invariant that only an implementation or dependency defect can
    /// break. Distinct from input validation on purpose.
    #[error("internal consistency failure: {0}")]
    Internal(String),
}

/// Shorthand for the pervasive `MalformedInput` checks.
macro_rules! malformed {
    ($($arg:tt)*) => {
        return Err($crate::error::ConvertError::MalformedInput(format!($($arg)*)).into())
    };
}

pub(crate) use malformed;
