//! Constraint compiler.
//!
//! Turns a capability model and validated feature requests into a
//! [`CspProblem`]:
//!
//! - one identity variable per pin (`Inactive` plus every legal binding),
//! - one selection variable per requested slot, ranging over all pins,
//! - slot-binding, shared-instance, distinct-instance and all-distinct-pins
//!   constraints.

use std::collections::BTreeMap;

use crate::csp::problem::*;
use crate::model::{CapabilityModel, FeatureRequest, PeripheralType};
use crate::validate::{validate_requests, RequestError};

pub struct ConstraintCompiler;

impl ConstraintCompiler {
    /// Compile a problem. Requests are validated first; an invalid request
    /// produces no problem at all.
    pub fn compile(
        model: &CapabilityModel,
        features: &[FeatureRequest],
    ) -> Result<CspProblem, RequestError> {
        validate_requests(features)?;

        let identities: Vec<IdentityVar> = model
            .pins
            .iter()
            .map(|pin| {
                let mut domain = Vec::with_capacity(pin.signals.len() + 1);
                domain.push(Identity::Inactive);
                domain.extend(pin.bindings().into_iter().map(Identity::Bound));
                IdentityVar {
                    pin_id: pin.id,
                    domain,
                }
            })
            .collect();

        let all_pins: Vec<PinIndex> = (0..identities.len()).collect();
        let mut selections = Vec::new();
        let mut constraints = Vec::new();
        let mut by_type: BTreeMap<PeripheralType, Vec<FeatureIndex>> = BTreeMap::new();

        for (feature_index, feature) in features.iter().enumerate() {
            let mut feature_selections = Vec::with_capacity(feature.slot_count());

            for slot in 0..feature.slot_count() {
                let id = selections.len();
                selections.push(SelectionVar {
                    feature: feature_index,
                    slot,
                    label: feature.slot_label(slot),
                    domain: all_pins.clone(),
                });
                constraints.push(Constraint::SlotBinding {
                    selection: id,
                    peripheral: feature.peripheral,
                    sub_signal: feature.slot_requirement(slot),
                });
                feature_selections.push(id);
            }

            constraints.push(Constraint::SharedInstance {
                feature: feature_index,
                selections: feature_selections,
            });

            if !feature.peripheral.in_exclusivity_set() {
                by_type
                    .entry(feature.peripheral)
                    .or_default()
                    .push(feature_index);
            }
        }

        for (peripheral, group) in by_type {
            if group.len() > 1 {
                constraints.push(Constraint::DistinctInstances {
                    peripheral,
                    features: group,
                });
            }
        }

        constraints.push(Constraint::AllDistinctPins {
            selections: (0..selections.len()).collect(),
        });

        tracing::debug!(
            "Compiled {} identity variables, {} selection variables, {} constraints",
            identities.len(),
            selections.len(),
            constraints.len()
        );

        Ok(CspProblem {
            identities,
            selections,
            constraints,
            feature_names: features.iter().map(|f| f.name.clone()).collect(),
            feature_types: features.iter().map(|f| f.peripheral).collect(),
        })
    }
}
