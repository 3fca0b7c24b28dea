//! pinalloc - microcontroller pin allocation
//!
//! Given the pin capabilities of one MCU package and a list of firmware
//! features (each needing some signals of one peripheral type), this library
//! finds an assignment of features to physical pins, or proves none exists.
//!
//! # Quick Start
//!
//! ```no_run
//! use pinalloc::{AllocationOptions, PinAllocCore, SignalPolicy};
//! use std::path::Path;
//!
//! let options = AllocationOptions::new(SignalPolicy::Strict);
//! let result = PinAllocCore::allocate_files(
//!     Path::new("STM32F303K8Tx.xml"),
//!     Path::new("board.txt"),
//!     &options,
//! ).unwrap();
//!
//! for feature in &result.features {
//!     println!("{} ({})", feature.name, feature.instance_label());
//!     for binding in &feature.bindings {
//!         println!("  {} = {}", binding.label, binding.pin);
//!     }
//! }
//! ```
//!
//! # Pipeline
//!
//! - **Ingestion** (`parser`): CubeMX MCU XML and feature declarations
//! - **Compilation** (`csp`): identity and selection variables plus constraints
//! - **Solving** (`solver`): pluggable [`Solver`] trait, backtracking by default
//! - **Decoding** (`decoder`): solution back to named pins

pub mod core;
pub mod csp;
pub mod decoder;
pub mod model;
pub mod parser;
pub mod solver;
pub mod validate;

// Re-export main types
pub use crate::core::{
    AllocationOptions, AllocationResult, AllocationStats, Infeasibility, PinAllocCore,
    PinAllocError,
};
pub use csp::{ConstraintCompiler, CspProblem, Diagnosis};
pub use decoder::{AssignmentDecoder, FeatureAssignment, PinBinding};
pub use model::{CapabilityModel, FeatureRequest, FeatureSet, PeripheralType};
pub use parser::{FeatureParser, IngestionError, McuParser, SignalPolicy};
pub use solver::{BacktrackingSolver, SolveOutcome, Solver, SolverConfig};

/// Parse an MCU hardware document (convenience wrapper).
pub fn parse_mcu(
    path: &std::path::Path,
    policy: SignalPolicy,
) -> Result<CapabilityModel, PinAllocError> {
    Ok(McuParser::parse_file(path, policy)?)
}

/// Parse a feature declaration file (convenience wrapper).
pub fn parse_features(
    path: &std::path::Path,
    policy: SignalPolicy,
) -> Result<FeatureSet, PinAllocError> {
    Ok(FeatureParser::parse_file(path, policy)?)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        AllocationOptions, AllocationResult, CapabilityModel, FeatureSet, PeripheralType,
        PinAllocCore, PinAllocError, SignalPolicy, Solver, SolverConfig,
    };
}
