//! Backtracking search with forward checking.
//!
//! Selection variables are assigned one at a time, always picking the one
//! with the fewest consistent candidates left. A variable whose candidates
//! all conflict with the partial assignment fails the node immediately.
//! Instance constraints are tracked per *instance group*: the union of the
//! selections tied together by `SharedInstance` constraints.

use std::collections::HashMap;
use std::time::Instant;

use crate::csp::{Assignment, Candidate, Constraint, CspProblem, Identity, SelectionId};
use crate::solver::{SolveOutcome, SolveResult, SolveStats, Solver, SolverConfig, UnknownReason};

/// Complete, deterministic backtracking solver.
#[derive(Debug, Clone, Default)]
pub struct BacktrackingSolver {
    config: SolverConfig,
}

impl BacktrackingSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

impl Solver for BacktrackingSolver {
    fn name(&self) -> &str {
        "backtracking"
    }

    fn solve(&self, problem: &CspProblem) -> SolveResult {
        let started = Instant::now();
        let mut search = Search::new(problem, self.config, started);

        let outcome = match search.run() {
            Ok(true) => SolveOutcome::Sat(search.assignment()),
            Ok(false) => SolveOutcome::Unsat,
            Err(reason) => SolveOutcome::Unknown(reason),
        };
        let stats = SolveStats {
            decisions: search.decisions,
            backtracks: search.backtracks,
            elapsed: started.elapsed(),
        };

        tracing::debug!(
            "Search finished after {} decisions, {} backtracks in {:?}",
            stats.decisions,
            stats.backtracks,
            stats.elapsed
        );

        SolveResult { outcome, stats }
    }
}

#[derive(Debug, Clone, Default)]
struct GroupState {
    instance: Option<u32>,
    assigned: usize,
}

struct Search<'a> {
    problem: &'a CspProblem,
    config: SolverConfig,
    deadline: Option<Instant>,
    candidates: Vec<Vec<Candidate>>,
    /// Instance group of each selection.
    group_of: Vec<usize>,
    groups: Vec<GroupState>,
    /// Groups whose instance must differ from this group's.
    rivals: Vec<Vec<usize>>,
    /// All-distinct sets each selection belongs to.
    pin_sets: Vec<Vec<usize>>,
    used: Vec<Vec<bool>>,
    /// Identity index fixed on each pin, with the number of selections using it.
    pin_identity: Vec<Option<(usize, usize)>>,
    chosen: Vec<Option<Candidate>>,
    decisions: u64,
    backtracks: u64,
}

fn find(parent: &mut [usize], i: usize) -> usize {
    if parent[i] != i {
        parent[i] = find(parent, parent[i]);
    }
    parent[i]
}

fn unite(parent: &mut [usize], i: usize, j: usize) {
    let pi = find(parent, i);
    let pj = find(parent, j);
    if pi != pj {
        parent[pi] = pj;
    }
}

impl<'a> Search<'a> {
    fn new(problem: &'a CspProblem, config: SolverConfig, started: Instant) -> Self {
        let n = problem.selections.len();
        let candidates = problem.all_candidates();

        // Instance groups
        let mut parent: Vec<usize> = (0..n).collect();
        for constraint in &problem.constraints {
            if let Constraint::SharedInstance { selections, .. } = constraint {
                let members: Vec<SelectionId> = selections.iter().copied().filter(|&s| s < n).collect();
                for pair in members.windows(2) {
                    unite(&mut parent, pair[0], pair[1]);
                }
            }
        }
        let mut group_ids: HashMap<usize, usize> = HashMap::new();
        let mut group_of = Vec::with_capacity(n);
        for s in 0..n {
            let root = find(&mut parent, s);
            let next = group_ids.len();
            group_of.push(*group_ids.entry(root).or_insert(next));
        }
        let group_count = group_ids.len();

        let mut rivals: Vec<Vec<usize>> = vec![Vec::new(); group_count];
        for constraint in &problem.constraints {
            if let Constraint::DistinctInstances { features, .. } = constraint {
                let feature_groups: Vec<usize> = features
                    .iter()
                    .filter_map(|&f| problem.selections_of(f).next().map(|s| group_of[s]))
                    .collect();
                for &a in &feature_groups {
                    for &b in &feature_groups {
                        if a != b && !rivals[a].contains(&b) {
                            rivals[a].push(b);
                        }
                    }
                }
            }
        }

        let mut pin_sets: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut used = Vec::new();
        for constraint in &problem.constraints {
            if let Constraint::AllDistinctPins { selections } = constraint {
                let set = used.len();
                used.push(vec![false; problem.pin_count()]);
                for &s in selections.iter().filter(|&&s| s < n) {
                    pin_sets[s].push(set);
                }
            }
        }

        Self {
            problem,
            config,
            deadline: config.time_limit.map(|limit| started + limit),
            candidates,
            group_of,
            groups: vec![GroupState::default(); group_count],
            rivals,
            pin_sets,
            used,
            pin_identity: vec![None; problem.pin_count()],
            chosen: vec![None; n],
            decisions: 0,
            backtracks: 0,
        }
    }

    fn run(&mut self) -> Result<bool, UnknownReason> {
        self.search()
    }

    fn search(&mut self) -> Result<bool, UnknownReason> {
        let mut best: Option<(SelectionId, Vec<Candidate>)> = None;

        for s in 0..self.chosen.len() {
            if self.chosen[s].is_some() {
                continue;
            }
            let live: Vec<Candidate> = self.candidates[s]
                .iter()
                .copied()
                .filter(|c| self.consistent(s, c))
                .collect();
            if live.is_empty() {
                return Ok(false);
            }
            if best.as_ref().map_or(true, |(_, b)| live.len() < b.len()) {
                best = Some((s, live));
            }
        }

        let Some((selection, live)) = best else {
            return Ok(true);
        };

        for candidate in live {
            self.tick()?;
            self.assign(selection, candidate);
            if self.search()? {
                return Ok(true);
            }
            self.unassign(selection, candidate);
            self.backtracks += 1;
        }
        Ok(false)
    }

    fn tick(&mut self) -> Result<(), UnknownReason> {
        if let Some(limit) = self.config.max_decisions {
            if self.decisions >= limit {
                return Err(UnknownReason::DecisionLimit(limit));
            }
        }
        if let (Some(deadline), Some(limit)) = (self.deadline, self.config.time_limit) {
            if Instant::now() >= deadline {
                return Err(UnknownReason::TimeLimit(limit));
            }
        }
        self.decisions += 1;
        Ok(())
    }

    fn consistent(&self, selection: SelectionId, candidate: &Candidate) -> bool {
        let Some(Identity::Bound(binding)) = self.problem.identity(candidate.pin, candidate.identity)
        else {
            return false;
        };

        if let Some((identity, _)) = self.pin_identity[candidate.pin] {
            if identity != candidate.identity {
                return false;
            }
        }
        if self.pin_sets[selection]
            .iter()
            .any(|&set| self.used[set][candidate.pin])
        {
            return false;
        }

        let group = self.group_of[selection];
        match self.groups[group].instance {
            Some(instance) => binding.instance == instance,
            None => self.rivals[group]
                .iter()
                .all(|&rival| self.groups[rival].instance != Some(binding.instance)),
        }
    }

    fn assign(&mut self, selection: SelectionId, candidate: Candidate) {
        let instance = match self.problem.identity(candidate.pin, candidate.identity) {
            Some(Identity::Bound(binding)) => binding.instance,
            _ => return,
        };

        self.chosen[selection] = Some(candidate);
        for &set in &self.pin_sets[selection] {
            self.used[set][candidate.pin] = true;
        }
        let slot = &mut self.pin_identity[candidate.pin];
        *slot = match *slot {
            Some((identity, count)) => Some((identity, count + 1)),
            None => Some((candidate.identity, 1)),
        };

        let group = &mut self.groups[self.group_of[selection]];
        if group.assigned == 0 {
            group.instance = Some(instance);
        }
        group.assigned += 1;
    }

    fn unassign(&mut self, selection: SelectionId, candidate: Candidate) {
        self.chosen[selection] = None;
        for &set in &self.pin_sets[selection] {
            self.used[set][candidate.pin] = false;
        }
        let slot = &mut self.pin_identity[candidate.pin];
        *slot = match *slot {
            Some((identity, count)) if count > 1 => Some((identity, count - 1)),
            _ => None,
        };

        let group = &mut self.groups[self.group_of[selection]];
        group.assigned = group.assigned.saturating_sub(1);
        if group.assigned == 0 {
            group.instance = None;
        }
    }

    fn assignment(&self) -> Assignment {
        let mut identities = vec![0; self.problem.pin_count()];
        let mut selections = Vec::with_capacity(self.chosen.len());
        for candidate in self.chosen.iter().flatten() {
            identities[candidate.pin] = candidate.identity;
            selections.push(candidate.pin);
        }
        Assignment {
            selections,
            identities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::{ConstraintCompiler, SelectionVar};
    use crate::model::*;
    use std::time::Duration;

    fn usart_pin(id: usize, name: &str, instance: u32, symbol: UsartSignal) -> PhysicalPin {
        PhysicalPin::new(
            id,
            name,
            id as u32 + 1,
            vec![PhysicalSignal::new(
                format!("USART{}_{}", instance, symbol.name()),
                PeripheralType::Usart,
                instance,
                SubSignal::Named(Symbol::Usart(symbol)),
            )],
        )
    }

    fn uart(name: &str) -> FeatureRequest {
        FeatureRequest::explicit(
            name,
            PeripheralType::Usart,
            vec![Symbol::Usart(UsartSignal::Tx), Symbol::Usart(UsartSignal::Rx)],
        )
    }

    #[test]
    fn test_solves_two_uarts_on_distinct_instances() {
        let model = CapabilityModel::new(vec![
            usart_pin(0, "PA9", 1, UsartSignal::Tx),
            usart_pin(1, "PA10", 1, UsartSignal::Rx),
            usart_pin(2, "PA2", 2, UsartSignal::Tx),
            usart_pin(3, "PA3", 2, UsartSignal::Rx),
        ]);
        let problem = ConstraintCompiler::compile(&model, &[uart("console"), uart("modem")]).unwrap();

        let result = BacktrackingSolver::default().solve(&problem);
        let SolveOutcome::Sat(assignment) = result.outcome else {
            panic!("Expected Sat, got {:?}", result.outcome);
        };

        let console = assignment.binding_of(&problem, 0).unwrap().instance;
        let modem = assignment.binding_of(&problem, 2).unwrap().instance;
        assert_eq!(assignment.binding_of(&problem, 1).unwrap().instance, console);
        assert_ne!(console, modem);
        assert!(result.stats.decisions >= 4);
    }

    #[test]
    fn test_mixed_instances_are_unsat() {
        // TX only on USART1, RX only on USART2
        let model = CapabilityModel::new(vec![
            usart_pin(0, "PA9", 1, UsartSignal::Tx),
            usart_pin(1, "PA3", 2, UsartSignal::Rx),
        ]);
        let problem = ConstraintCompiler::compile(&model, &[uart("console")]).unwrap();
        let result = BacktrackingSolver::default().solve(&problem);
        assert_eq!(result.outcome, SolveOutcome::Unsat);
    }

    #[test]
    fn test_decision_limit_is_unknown() {
        let model = CapabilityModel::new(vec![
            usart_pin(0, "PA9", 1, UsartSignal::Tx),
            usart_pin(1, "PA10", 1, UsartSignal::Rx),
        ]);
        let problem = ConstraintCompiler::compile(&model, &[uart("console")]).unwrap();
        let solver = BacktrackingSolver::new(SolverConfig {
            max_decisions: Some(0),
            time_limit: None,
        });

        let result = solver.solve(&problem);
        assert_eq!(result.outcome, SolveOutcome::Unknown(UnknownReason::DecisionLimit(0)));
    }

    #[test]
    fn test_time_limit_is_unknown() {
        let model = CapabilityModel::new(vec![
            usart_pin(0, "PA9", 1, UsartSignal::Tx),
            usart_pin(1, "PA10", 1, UsartSignal::Rx),
        ]);
        let problem = ConstraintCompiler::compile(&model, &[uart("console")]).unwrap();
        let solver = BacktrackingSolver::new(SolverConfig {
            max_decisions: None,
            time_limit: Some(Duration::ZERO),
        });

        let result = solver.solve(&problem);
        assert_eq!(
            result.outcome,
            SolveOutcome::Unknown(UnknownReason::TimeLimit(Duration::ZERO))
        );
        assert_eq!(result.stats.decisions, 0);
    }

    #[test]
    fn test_empty_problem_is_sat() {
        let result = BacktrackingSolver::default().solve(&CspProblem::default());
        assert_eq!(
            result.outcome,
            SolveOutcome::Sat(Assignment {
                selections: vec![],
                identities: vec![],
            })
        );
    }

    #[test]
    fn test_pin_carries_one_identity_without_distinct_constraint() {
        let pin = PhysicalPin::new(
            0,
            "PA9",
            19,
            vec![
                PhysicalSignal::new(
                    "USART1_TX",
                    PeripheralType::Usart,
                    1,
                    SubSignal::Named(Symbol::Usart(UsartSignal::Tx)),
                ),
                PhysicalSignal::new("GPIO", PeripheralType::Gpio, 1, SubSignal::Channel(9)),
            ],
        );
        let model = CapabilityModel::new(vec![pin]);
        let mut problem = ConstraintCompiler::compile(&model, &[]).unwrap();

        // Two selections on the only pin, with no all-distinct constraint.
        for (feature, peripheral) in [PeripheralType::Usart, PeripheralType::Gpio].into_iter().enumerate() {
            problem.selections.push(SelectionVar {
                feature,
                slot: 0,
                label: "0".to_string(),
                domain: vec![0],
            });
            problem.constraints.push(Constraint::SlotBinding {
                selection: feature,
                peripheral,
                sub_signal: None,
            });
        }

        let result = BacktrackingSolver::default().solve(&problem);
        assert_eq!(result.outcome, SolveOutcome::Unsat);
    }
}
