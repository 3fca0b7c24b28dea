//! Request validation and independent solution checking.
//!
//! [`validate_requests`] runs before compilation. [`check_assignment`] and
//! [`check_bindings`] re-check a solution against every allocation rule
//! without trusting the solver that produced it.

use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::csp::{Assignment, Constraint, CspProblem, Identity};
use crate::decoder::FeatureAssignment;
use crate::model::{
    CapabilityModel, FeatureRequest, PeripheralType, RequestedSubSignals, SubSignal, Symbol,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("feature '{feature}' requests zero channels")]
    ZeroChannels { feature: String },
    #[error("feature '{name}' is declared more than once")]
    DuplicateFeature { name: String },
    #[error("feature '{feature}' requests channel {channel} more than once")]
    DuplicateChannel { feature: String, channel: Symbol },
    #[error("feature '{feature}' uses {peripheral} but requests {channel}, a {owner} channel")]
    ForeignChannel {
        feature: String,
        peripheral: PeripheralType,
        channel: Symbol,
        owner: PeripheralType,
    },
}

/// Reject structurally invalid requests.
pub fn validate_requests(features: &[FeatureRequest]) -> Result<(), RequestError> {
    let mut names = HashSet::new();

    for feature in features {
        if !names.insert(feature.name.as_str()) {
            return Err(RequestError::DuplicateFeature {
                name: feature.name.clone(),
            });
        }
        if feature.sub_signals.is_empty() {
            return Err(RequestError::ZeroChannels {
                feature: feature.name.clone(),
            });
        }
        if let RequestedSubSignals::Explicit(symbols) = &feature.sub_signals {
            let mut seen = HashSet::new();
            for &symbol in symbols {
                if symbol.peripheral() != feature.peripheral {
                    return Err(RequestError::ForeignChannel {
                        feature: feature.name.clone(),
                        peripheral: feature.peripheral,
                        channel: symbol,
                        owner: symbol.peripheral(),
                    });
                }
                if !seen.insert(symbol) {
                    return Err(RequestError::DuplicateChannel {
                        feature: feature.name.clone(),
                        channel: symbol,
                    });
                }
            }
        }
    }

    Ok(())
}

/// A broken allocation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("assignment shape does not match the problem")]
    ShapeMismatch,
    #[error("pin index {pin} has identity index {index} outside its domain")]
    IdentityOutOfRange { pin: usize, index: usize },
    #[error("selection {selection} chose pin index {pin} outside its domain")]
    OutsideDomain { selection: usize, pin: usize },
    #[error("selection {selection} is bound to {found:?}, which does not fit {peripheral}")]
    WrongBinding {
        selection: usize,
        peripheral: PeripheralType,
        found: Identity,
    },
    #[error("pin {pin} is active but no selection uses it")]
    UnselectedActive { pin: String },
    #[error("feature '{feature}' mixes instances {first} and {second}")]
    InstanceMismatch {
        feature: String,
        first: u32,
        second: u32,
    },
    #[error("features '{first}' and '{second}' both use {peripheral} instance {instance}")]
    InstanceCollision {
        peripheral: PeripheralType,
        instance: u32,
        first: String,
        second: String,
    },
    #[error("pin {pin} is used by both '{first}' and '{second}'")]
    PinReused {
        pin: String,
        first: String,
        second: String,
    },
    #[error("feature '{feature}' has {found} bindings for {expected} requested channels")]
    BindingCount {
        feature: String,
        expected: usize,
        found: usize,
    },
    #[error("feature '{feature}' binds {label} to pin {pin}, which cannot carry it")]
    UnsupportedBinding {
        feature: String,
        label: String,
        pin: String,
    },
    #[error("feature '{0}' was not requested")]
    UnknownFeature(String),
}

fn feature_name(problem: &CspProblem, feature: usize) -> String {
    problem
        .feature_names
        .get(feature)
        .cloned()
        .unwrap_or_else(|| format!("#{}", feature))
}

/// Check every constraint of `problem` against `assignment`.
pub fn check_assignment(problem: &CspProblem, assignment: &Assignment) -> Vec<Violation> {
    let mut violations = Vec::new();

    if assignment.selections.len() != problem.selections.len()
        || assignment.identities.len() != problem.identities.len()
    {
        violations.push(Violation::ShapeMismatch);
        return violations;
    }

    for (pin, &index) in assignment.identities.iter().enumerate() {
        if index >= problem.identities[pin].domain.len() {
            violations.push(Violation::IdentityOutOfRange { pin, index });
        }
    }
    for (selection, &pin) in assignment.selections.iter().enumerate() {
        if !problem.selections[selection].domain.contains(&pin) || pin >= problem.pin_count() {
            violations.push(Violation::OutsideDomain { selection, pin });
        }
    }
    if !violations.is_empty() {
        return violations;
    }

    // An active pin must be realizing some selection.
    let selected: HashSet<usize> = assignment.selections.iter().copied().collect();
    for (pin, &index) in assignment.identities.iter().enumerate() {
        if index != 0 && !selected.contains(&pin) {
            violations.push(Violation::UnselectedActive {
                pin: format!("#{}", problem.identities[pin].pin_id),
            });
        }
    }

    let instance_of = |selection: usize| assignment.binding_of(problem, selection).map(|b| b.instance);

    for constraint in &problem.constraints {
        match constraint {
            Constraint::SlotBinding {
                selection,
                peripheral,
                sub_signal,
            } => {
                let pin = assignment.selections[*selection];
                let identity = problem.identities[pin].domain[assignment.identities[pin]];
                if !identity.satisfies(*peripheral, *sub_signal) {
                    violations.push(Violation::WrongBinding {
                        selection: *selection,
                        peripheral: *peripheral,
                        found: identity,
                    });
                }
            }
            Constraint::SharedInstance {
                feature,
                selections,
            } => {
                let instances: Vec<u32> = selections.iter().filter_map(|&s| instance_of(s)).collect();
                if let Some(&first) = instances.first() {
                    if let Some(&second) = instances.iter().find(|&&i| i != first) {
                        violations.push(Violation::InstanceMismatch {
                            feature: feature_name(problem, *feature),
                            first,
                            second,
                        });
                    }
                }
            }
            Constraint::DistinctInstances {
                peripheral,
                features,
            } => {
                let mut owners: HashMap<u32, usize> = HashMap::new();
                for &feature in features {
                    let Some(instance) = problem.selections_of(feature).next().and_then(instance_of) else {
                        continue;
                    };
                    if let Some(&other) = owners.get(&instance) {
                        violations.push(Violation::InstanceCollision {
                            peripheral: *peripheral,
                            instance,
                            first: feature_name(problem, other),
                            second: feature_name(problem, feature),
                        });
                    } else {
                        owners.insert(instance, feature);
                    }
                }
            }
            Constraint::AllDistinctPins { selections } => {
                let mut owners: HashMap<usize, usize> = HashMap::new();
                for &selection in selections {
                    let pin = assignment.selections[selection];
                    if let Some(&other) = owners.get(&pin) {
                        violations.push(Violation::PinReused {
                            pin: format!("#{}", problem.identities[pin].pin_id),
                            first: feature_name(problem, problem.selections[other].feature),
                            second: feature_name(problem, problem.selections[selection].feature),
                        });
                    } else {
                        owners.insert(pin, selection);
                    }
                }
            }
        }
    }

    violations
}

/// Check decoded bindings against the capability model and the requests,
/// independently of any compiled problem.
pub fn check_bindings(
    model: &CapabilityModel,
    features: &[FeatureRequest],
    assignments: &[FeatureAssignment],
) -> Vec<Violation> {
    let mut violations = Vec::new();
    let requests: HashMap<&str, &FeatureRequest> = features.iter().map(|f| (f.name.as_str(), f)).collect();
    let mut pin_owner: HashMap<&str, &str> = HashMap::new();
    let mut instance_owner: BTreeMap<(PeripheralType, u32), &str> = BTreeMap::new();

    for assignment in assignments {
        let Some(request) = requests.get(assignment.name.as_str()) else {
            violations.push(Violation::UnknownFeature(assignment.name.clone()));
            continue;
        };

        if assignment.bindings.len() != request.slot_count() {
            violations.push(Violation::BindingCount {
                feature: assignment.name.clone(),
                expected: request.slot_count(),
                found: assignment.bindings.len(),
            });
        }

        for (slot, binding) in assignment.bindings.iter().enumerate() {
            if binding.instance != assignment.instance {
                violations.push(Violation::InstanceMismatch {
                    feature: assignment.name.clone(),
                    first: assignment.instance,
                    second: binding.instance,
                });
            }

            let required: Option<SubSignal> = request.slot_requirement(slot);
            let supported = model.pin_by_name(&binding.pin).is_some_and(|pin| {
                pin.signals.iter().any(|s| {
                    s.peripheral == request.peripheral
                        && s.instance == binding.instance
                        && required.map_or(true, |r| s.sub_signal == r)
                })
            });
            if !supported {
                violations.push(Violation::UnsupportedBinding {
                    feature: assignment.name.clone(),
                    label: binding.label.clone(),
                    pin: binding.pin.clone(),
                });
            }

            if let Some(other) = pin_owner.insert(binding.pin.as_str(), assignment.name.as_str()) {
                violations.push(Violation::PinReused {
                    pin: binding.pin.clone(),
                    first: other.to_string(),
                    second: assignment.name.clone(),
                });
            }
        }

        if !request.peripheral.in_exclusivity_set() {
            let key = (request.peripheral, assignment.instance);
            if let Some(other) = instance_owner.insert(key, assignment.name.as_str()) {
                violations.push(Violation::InstanceCollision {
                    peripheral: request.peripheral,
                    instance: assignment.instance,
                    first: other.to_string(),
                    second: assignment.name.clone(),
                });
            }
        }
    }

    violations
}
