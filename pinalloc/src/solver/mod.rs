//! Solver Trait
//!
//! Defines the interface between the compiled [`CspProblem`] and whatever
//! decides it. Any complete CSP/SAT/SMT backend can implement [`Solver`];
//! the crate ships [`BacktrackingSolver`].

pub mod backtrack;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::csp::{Assignment, CspProblem};

pub use backtrack::BacktrackingSolver;

/// Search limits. Exceeding either yields [`SolveOutcome::Unknown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverConfig {
    pub max_decisions: Option<u64>,
    pub time_limit: Option<Duration>,
}

/// Why a solver gave up without a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnknownReason {
    DecisionLimit(u64),
    TimeLimit(Duration),
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::DecisionLimit(n) => write!(f, "decision limit of {} reached", n),
            UnknownReason::TimeLimit(d) => write!(f, "time limit of {} ms reached", d.as_millis()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Sat(Assignment),
    Unsat,
    Unknown(UnknownReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    pub decisions: u64,
    pub backtracks: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct SolveResult {
    pub outcome: SolveOutcome,
    pub stats: SolveStats,
}

/// Common trait for all solving backends.
///
/// Implementations must be complete (never answer `Unsat` for a satisfiable
/// problem) and every `Sat` assignment must satisfy all constraints.
pub trait Solver: Send + Sync {
    /// Get the solver name
    fn name(&self) -> &str;

    /// Decide the problem
    fn solve(&self, problem: &CspProblem) -> SolveResult;
}
