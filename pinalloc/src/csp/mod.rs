//! Constraint-satisfaction model of the pin allocation problem.

pub mod compiler;
pub mod diagnose;
pub mod problem;

pub use compiler::ConstraintCompiler;
pub use diagnose::{presolve, Diagnosis};
pub use problem::*;
