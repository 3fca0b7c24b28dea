//! Presolve diagnostics.
//!
//! Cheap relaxations of the full problem. A failure here proves the problem
//! infeasible and names the reason more precisely than a solver can; passing
//! proves nothing.

use petgraph::algo::maximum_matching;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;
use std::fmt;

use crate::csp::problem::CspProblem;
use crate::model::PeripheralType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnosis {
    /// No pin in the package can carry this slot at all.
    NoCandidates {
        feature: String,
        peripheral: PeripheralType,
        label: String,
    },
    /// Even ignoring instance rules, pins cannot cover every slot.
    InsufficientPins { required: usize, matchable: usize },
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnosis::NoCandidates {
                feature,
                peripheral,
                label,
            } => write!(f, "feature '{}': no pin offers {}.{}", feature, peripheral, label),
            Diagnosis::InsufficientPins {
                required,
                matchable,
            } => write!(
                f,
                "{} channels requested but at most {} can be placed on distinct pins",
                required, matchable
            ),
        }
    }
}

/// Run all presolve checks, returning the first proof of infeasibility.
pub fn presolve(problem: &CspProblem) -> Option<Diagnosis> {
    let candidate_pins: Vec<Vec<usize>> = problem
        .all_candidates()
        .into_iter()
        .map(|candidates| {
            let mut pins: Vec<usize> = candidates.into_iter().map(|c| c.pin).collect();
            pins.dedup();
            pins
        })
        .collect();

    for (id, pins) in candidate_pins.iter().enumerate() {
        if pins.is_empty() {
            let var = &problem.selections[id];
            return Some(Diagnosis::NoCandidates {
                feature: problem.feature_names[var.feature].clone(),
                peripheral: problem.feature_types[var.feature],
                label: var.label.clone(),
            });
        }
    }

    let required = problem.selections.len();
    let matchable = matching_size(problem.pin_count(), &candidate_pins);
    tracing::debug!("Presolve matching covers {}/{} slots", matchable, required);

    if matchable < required {
        return Some(Diagnosis::InsufficientPins {
            required,
            matchable,
        });
    }
    None
}

/// Size of a maximum matching between slots and the pins that can carry them.
fn matching_size(pin_count: usize, candidate_pins: &[Vec<usize>]) -> usize {
    let edge_count = candidate_pins.iter().map(Vec::len).sum();
    let mut graph: UnGraph<(), ()> =
        UnGraph::with_capacity(candidate_pins.len() + pin_count, edge_count);

    let slot_nodes: Vec<NodeIndex> = candidate_pins.iter().map(|_| graph.add_node(())).collect();
    let pin_nodes: Vec<NodeIndex> = (0..pin_count).map(|_| graph.add_node(())).collect();

    for (slot, pins) in candidate_pins.iter().enumerate() {
        for &pin in pins {
            graph.add_edge(slot_nodes[slot], pin_nodes[pin], ());
        }
    }

    maximum_matching(&graph).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::ConstraintCompiler;
    use crate::model::*;

    fn gpio_pin(id: usize, number: u32) -> PhysicalPin {
        PhysicalPin::new(
            id,
            format!("PA{}", number),
            id as u32 + 1,
            vec![PhysicalSignal::new("GPIO", PeripheralType::Gpio, 1, SubSignal::Channel(number))],
        )
    }

    #[test]
    fn test_no_candidates() {
        let model = CapabilityModel::new(vec![gpio_pin(0, 0)]);
        let features = vec![FeatureRequest::explicit(
            "usb",
            PeripheralType::Usb,
            vec![Symbol::Usb(UsbSignal::Dm)],
        )];
        let problem = ConstraintCompiler::compile(&model, &features).unwrap();

        let diagnosis = presolve(&problem).unwrap();
        assert_eq!(diagnosis.to_string(), "feature 'usb': no pin offers USB.DM");
    }

    #[test]
    fn test_insufficient_pins() {
        let model = CapabilityModel::new(vec![gpio_pin(0, 0), gpio_pin(1, 1)]);
        let features = vec![FeatureRequest::anonymous("leds", PeripheralType::Gpio, 3)];
        let problem = ConstraintCompiler::compile(&model, &features).unwrap();

        assert_eq!(
            presolve(&problem),
            Some(Diagnosis::InsufficientPins {
                required: 3,
                matchable: 2
            })
        );
    }

    #[test]
    fn test_feasible_passes() {
        let model = CapabilityModel::new(vec![gpio_pin(0, 0), gpio_pin(1, 1)]);
        let features = vec![FeatureRequest::anonymous("leds", PeripheralType::Gpio, 2)];
        let problem = ConstraintCompiler::compile(&model, &features).unwrap();
        assert_eq!(presolve(&problem), None);
    }
}
