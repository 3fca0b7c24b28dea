pub mod features;
pub mod mcu;
pub mod signal;

use std::path::PathBuf;
use thiserror::Error;

// Re-export for convenience
pub use features::{parse_declaration, DeclarationError, FeatureParser};
pub use mcu::McuParser;
pub use signal::{classify_signal, normalize_signal_name, SignalError, SIGNAL_ALIASES};

/// What to do with a signal name or declaration that cannot be classified.
///
/// Has no `Default`; callers must pick a mode explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPolicy {
    /// Abort ingestion on the first unrecognized entry.
    Strict,
    /// Drop the entry, log a warning and record it in the model.
    Lenient,
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Expected <Mcu> root element, found <{0}>")]
    MissingMcuRoot(String),
    #[error("Malformed pin entry #{index}: {reason}")]
    MalformedPin { index: usize, reason: String },
    #[error("Unrecognized signal '{signal}' on pin {pin}: {reason}")]
    UnrecognizedSignal {
        pin: String,
        signal: String,
        reason: SignalError,
    },
    #[error("Line {line}: {reason}")]
    InvalidDeclaration {
        line: usize,
        reason: DeclarationError,
    },
}
