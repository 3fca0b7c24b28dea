//! Assignment Decoder
//!
//! Maps a satisfying [`Assignment`] back to named pins. Pin metadata is
//! resolved through a [`PinTable`] holding an explicit entry for every pin of
//! the capability model; a miss is an error, never a fallback value.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::csp::{Assignment, CspProblem};
use crate::model::{CapabilityModel, FeatureRequest, PeripheralType, PhysicalPin};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("assignment has {found} selections, problem has {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("selection {selection} of feature '{feature}' is unassigned")]
    Unassigned { feature: String, selection: usize },
    #[error("pin index {0} is not part of the problem")]
    UnknownPinIndex(usize),
    #[error("pin id {0} has no entry in the pin table")]
    UnknownPin(usize),
    #[error("pin {pin} is selected but carries no binding")]
    InactivePin { pin: String },
    #[error("feature '{0}' is not part of the problem")]
    UnknownFeature(String),
}

/// Total mapping from pin id to pin metadata.
pub struct PinTable<'a> {
    by_id: BTreeMap<usize, &'a PhysicalPin>,
}

impl<'a> PinTable<'a> {
    pub fn new(model: &'a CapabilityModel) -> Self {
        Self {
            by_id: model.pins.iter().map(|p| (p.id, p)).collect(),
        }
    }

    pub fn get(&self, id: usize) -> Result<&'a PhysicalPin, DecodeError> {
        self.by_id.get(&id).copied().ok_or(DecodeError::UnknownPin(id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// One resolved `<label> = <pin>` line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinBinding {
    pub feature: String,
    pub label: String,
    pub pin: String,
    pub position: u32,
    pub instance: u32,
    /// Vendor signal realizing the binding, e.g. `USART1_TX`.
    pub signal: String,
}

/// All bindings of one feature, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureAssignment {
    pub name: String,
    pub peripheral: PeripheralType,
    pub instance: u32,
    pub bindings: Vec<PinBinding>,
}

impl FeatureAssignment {
    /// `USART1`, `GPIOA`, ...
    pub fn instance_label(&self) -> String {
        self.peripheral.instance_label(self.instance)
    }
}

pub struct AssignmentDecoder;

impl AssignmentDecoder {
    /// Decode per feature, in declaration order.
    pub fn decode(
        model: &CapabilityModel,
        features: &[FeatureRequest],
        problem: &CspProblem,
        assignment: &Assignment,
    ) -> Result<Vec<FeatureAssignment>, DecodeError> {
        if assignment.selections.len() != problem.selections.len() {
            return Err(DecodeError::ShapeMismatch {
                expected: problem.selections.len(),
                found: assignment.selections.len(),
            });
        }

        let table = PinTable::new(model);
        let mut result = Vec::with_capacity(features.len());

        for (index, feature) in features.iter().enumerate() {
            if problem.feature_names.get(index) != Some(&feature.name) {
                return Err(DecodeError::UnknownFeature(feature.name.clone()));
            }

            let mut selections: Vec<usize> = problem.selections_of(index).collect();
            selections.sort_by_key(|&s| problem.selections[s].slot);

            let mut bindings = Vec::with_capacity(selections.len());
            for selection in selections {
                bindings.push(Self::decode_selection(&table, feature, problem, assignment, selection)?);
            }
            if bindings.len() != feature.slot_count() {
                return Err(DecodeError::Unassigned {
                    feature: feature.name.clone(),
                    selection: bindings.len(),
                });
            }

            let instance = bindings.first().map(|b| b.instance).unwrap_or_default();
            result.push(FeatureAssignment {
                name: feature.name.clone(),
                peripheral: feature.peripheral,
                instance,
                bindings,
            });
        }

        Ok(result)
    }

    fn decode_selection(
        table: &PinTable<'_>,
        feature: &FeatureRequest,
        problem: &CspProblem,
        assignment: &Assignment,
        selection: usize,
    ) -> Result<PinBinding, DecodeError> {
        let pin_index = assignment.selections[selection];
        let identity_var = problem
            .identities
            .get(pin_index)
            .ok_or(DecodeError::UnknownPinIndex(pin_index))?;
        let pin = table.get(identity_var.pin_id)?;

        let binding = assignment
            .binding_of(problem, selection)
            .ok_or_else(|| DecodeError::InactivePin {
                pin: pin.name.clone(),
            })?;
        let signal = pin
            .signal_for(binding)
            .map(|s| s.raw_name.clone())
            .unwrap_or_else(|| binding.to_string());

        Ok(PinBinding {
            feature: feature.name.clone(),
            label: problem.selections[selection].label.clone(),
            pin: pin.name.clone(),
            position: pin.position,
            instance: binding.instance,
            signal,
        })
    }

    /// Flatten decoded features into the record list, preserving order.
    pub fn records(assignments: &[FeatureAssignment]) -> Vec<PinBinding> {
        assignments
            .iter()
            .flat_map(|f| f.bindings.iter().cloned())
            .collect()
    }
}
