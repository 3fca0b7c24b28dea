//! Allocation pipeline shared by the CLI, tests and benches.
//!
//! ingest → compile → presolve → solve → check → decode, once per call.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::csp::{presolve, ConstraintCompiler, CspProblem, Diagnosis};
use crate::decoder::{AssignmentDecoder, DecodeError, FeatureAssignment};
use crate::model::{CapabilityModel, FeatureSet, McuInfo};
use crate::parser::{FeatureParser, IngestionError, McuParser, SignalPolicy};
use crate::solver::{BacktrackingSolver, SolveOutcome, Solver, SolverConfig, UnknownReason};
use crate::validate::{check_assignment, validate_requests, RequestError, Violation};

#[derive(Debug, thiserror::Error)]
pub enum PinAllocError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),
    #[error("Infeasible: {0}")]
    Infeasible(Infeasibility),
    #[error("Indeterminate: {0}")]
    Indeterminate(UnknownReason),
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("Solver returned an invalid assignment ({} violations)", .0.len())]
    InvalidSolution(Vec<Violation>),
}

/// How infeasibility was established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Infeasibility {
    /// The solver exhausted the search space.
    Proven,
    /// A presolve check failed before search.
    Presolve(Diagnosis),
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infeasibility::Proven => f.write_str("no pin assignment satisfies every feature"),
            Infeasibility::Presolve(diagnosis) => fmt::Display::fmt(diagnosis, f),
        }
    }
}

/// Options for one allocation run.
#[derive(Clone, Debug)]
pub struct AllocationOptions {
    pub policy: SignalPolicy,
    pub solver: SolverConfig,
    pub presolve: bool,
}

impl AllocationOptions {
    pub fn new(policy: SignalPolicy) -> Self {
        Self {
            policy,
            solver: SolverConfig::default(),
            presolve: true,
        }
    }

    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Skip the presolve checks. Requests for more channels than the
    /// package has pins are still rejected before compiling.
    pub fn without_presolve(mut self) -> Self {
        self.presolve = false;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationStats {
    pub decisions: u64,
    pub backtracks: u64,
    #[serde(skip)]
    pub elapsed: Duration,
    pub pins: usize,
    pub selections: usize,
    pub constraints: usize,
    pub dropped_signals: usize,
    pub skipped_declarations: usize,
}

/// A successful allocation, ready for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationResult {
    pub mcu: McuInfo,
    pub features: Vec<FeatureAssignment>,
    pub stats: AllocationStats,
    pub generated_at: DateTime<Utc>,
}

impl AllocationResult {
    pub fn binding_count(&self) -> usize {
        self.features.iter().map(|f| f.bindings.len()).sum()
    }
}

/// Allocation API used by the CLI.
pub struct PinAllocCore;

impl PinAllocCore {
    /// Read both inputs from disk and allocate.
    pub fn allocate_files(
        mcu: &Path,
        features: &Path,
        options: &AllocationOptions,
    ) -> Result<AllocationResult, PinAllocError> {
        let model = McuParser::parse_file(mcu, options.policy)?;
        let features = FeatureParser::parse_file(features, options.policy)?;
        Self::allocate(&model, &features, options)
    }

    /// Allocate with the built-in backtracking solver.
    pub fn allocate(
        model: &CapabilityModel,
        features: &FeatureSet,
        options: &AllocationOptions,
    ) -> Result<AllocationResult, PinAllocError> {
        let solver = BacktrackingSolver::new(options.solver);
        Self::allocate_with(&solver, model, features, options)
    }

    /// Allocate with any [`Solver`] backend.
    pub fn allocate_with<S: Solver + ?Sized>(
        solver: &S,
        model: &CapabilityModel,
        features: &FeatureSet,
        options: &AllocationOptions,
    ) -> Result<AllocationResult, PinAllocError> {
        validate_requests(&features.features)?;
        let required = features.total_slots();
        if required > model.pins.len() {
            let diagnosis = Diagnosis::InsufficientPins {
                required,
                matchable: model.pins.len(),
            };
            tracing::info!("Rejected before compiling: {}", diagnosis);
            return Err(PinAllocError::Infeasible(Infeasibility::Presolve(diagnosis)));
        }

        let problem = ConstraintCompiler::compile(model, &features.features)?;
        tracing::info!(
            "Allocating {} features ({} channels) on {} pins of {}",
            features.features.len(),
            problem.selections.len(),
            problem.pin_count(),
            model.mcu.display_name()
        );

        if options.presolve {
            if let Some(diagnosis) = presolve(&problem) {
                tracing::info!("Presolve proved infeasibility: {}", diagnosis);
                return Err(PinAllocError::Infeasible(Infeasibility::Presolve(diagnosis)));
            }
        }

        let result = solver.solve(&problem);
        let assignment = match result.outcome {
            SolveOutcome::Sat(assignment) => assignment,
            SolveOutcome::Unsat => {
                tracing::info!("Solver '{}' proved infeasibility", solver.name());
                return Err(PinAllocError::Infeasible(Infeasibility::Proven));
            }
            SolveOutcome::Unknown(reason) => {
                tracing::warn!("Solver '{}' gave up: {}", solver.name(), reason);
                return Err(PinAllocError::Indeterminate(reason));
            }
        };

        let violations = check_assignment(&problem, &assignment);
        if !violations.is_empty() {
            for violation in &violations {
                tracing::error!("Solver '{}' violated: {}", solver.name(), violation);
            }
            return Err(PinAllocError::InvalidSolution(violations));
        }

        let decoded = AssignmentDecoder::decode(model, &features.features, &problem, &assignment)?;
        tracing::info!(
            "Allocated {} features in {} decisions",
            decoded.len(),
            result.stats.decisions
        );

        Ok(AllocationResult {
            mcu: model.mcu.clone(),
            features: decoded,
            stats: Self::stats(&problem, model, features, result.stats),
            generated_at: Utc::now(),
        })
    }

    fn stats(
        problem: &CspProblem,
        model: &CapabilityModel,
        features: &FeatureSet,
        solve: crate::solver::SolveStats,
    ) -> AllocationStats {
        AllocationStats {
            decisions: solve.decisions,
            backtracks: solve.backtracks,
            elapsed: solve.elapsed,
            pins: problem.pin_count(),
            selections: problem.selections.len(),
            constraints: problem.constraints.len(),
            dropped_signals: model.dropped.len(),
            skipped_declarations: features.skipped.len(),
        }
    }
}
