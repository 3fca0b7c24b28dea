//! CSP instance produced by the compiler and consumed by solvers.

use serde::Serialize;

use crate::model::{Binding, PeripheralType, SubSignal};

/// Index into [`CspProblem::identities`]; one per physical pin.
pub type PinIndex = usize;
/// Index into [`CspProblem::selections`].
pub type SelectionId = usize;
/// Index of a feature in declaration order.
pub type FeatureIndex = usize;

/// What a pin is configured as in a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Identity {
    Inactive,
    Bound(Binding),
}

impl Identity {
    pub fn binding(&self) -> Option<&Binding> {
        match self {
            Identity::Inactive => None,
            Identity::Bound(b) => Some(b),
        }
    }

    /// Whether this identity can realize a slot of `peripheral`, optionally
    /// requiring an exact sub-signal.
    pub fn satisfies(&self, peripheral: PeripheralType, sub_signal: Option<SubSignal>) -> bool {
        match self {
            Identity::Inactive => false,
            Identity::Bound(b) => {
                b.peripheral == peripheral && sub_signal.map_or(true, |s| b.sub_signal == s)
            }
        }
    }
}

/// Identity variable of one pin. `domain[0]` is always [`Identity::Inactive`].
#[derive(Debug, Clone, Serialize)]
pub struct IdentityVar {
    /// Identifier of the pin in the capability model.
    pub pin_id: usize,
    pub domain: Vec<Identity>,
}

/// Which pin realizes one requested slot of one feature.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionVar {
    pub feature: FeatureIndex,
    pub slot: usize,
    pub label: String,
    pub domain: Vec<PinIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Constraint {
    /// The selected pin's identity is bound to `peripheral` and, when given,
    /// to exactly `sub_signal`.
    SlotBinding {
        selection: SelectionId,
        peripheral: PeripheralType,
        sub_signal: Option<SubSignal>,
    },
    /// All selections resolve to one common instance number.
    SharedInstance {
        feature: FeatureIndex,
        selections: Vec<SelectionId>,
    },
    /// The listed features resolve to pairwise distinct instance numbers.
    DistinctInstances {
        peripheral: PeripheralType,
        features: Vec<FeatureIndex>,
    },
    /// No pin is selected twice.
    AllDistinctPins { selections: Vec<SelectionId> },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CspProblem {
    pub identities: Vec<IdentityVar>,
    pub selections: Vec<SelectionVar>,
    pub constraints: Vec<Constraint>,
    pub feature_names: Vec<String>,
    pub feature_types: Vec<PeripheralType>,
}

/// A (pin, identity-domain index) pair that can realize a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub pin: PinIndex,
    pub identity: usize,
}

impl CspProblem {
    pub fn pin_count(&self) -> usize {
        self.identities.len()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn selections_of(&self, feature: FeatureIndex) -> impl Iterator<Item = SelectionId> + '_ {
        self.selections
            .iter()
            .enumerate()
            .filter(move |(_, s)| s.feature == feature)
            .map(|(id, _)| id)
    }

    pub fn identity(&self, pin: PinIndex, index: usize) -> Option<&Identity> {
        self.identities.get(pin).and_then(|v| v.domain.get(index))
    }

    /// The `SlotBinding` requirements of every selection, indexed by
    /// selection, gathered in one pass over the constraints.
    ///
    /// A selection with no such constraint accepts any bound identity.
    pub fn slot_requirements(&self) -> Vec<Vec<(PeripheralType, Option<SubSignal>)>> {
        let mut requirements = vec![Vec::new(); self.selections.len()];
        for constraint in &self.constraints {
            if let Constraint::SlotBinding {
                selection,
                peripheral,
                sub_signal,
            } = constraint
            {
                if let Some(slot) = requirements.get_mut(*selection) {
                    slot.push((*peripheral, *sub_signal));
                }
            }
        }
        requirements
    }

    /// Every (pin, identity) pair within the selection's domain that meets
    /// its `SlotBinding` requirements, in pin order then identity order.
    pub fn candidates(&self, selection: SelectionId) -> Vec<Candidate> {
        self.slot_requirements()
            .get(selection)
            .map(|requirements| self.candidates_with(selection, requirements))
            .unwrap_or_default()
    }

    /// [`candidates`](Self::candidates) of every selection.
    pub fn all_candidates(&self) -> Vec<Vec<Candidate>> {
        self.slot_requirements()
            .iter()
            .enumerate()
            .map(|(selection, requirements)| self.candidates_with(selection, requirements))
            .collect()
    }

    fn candidates_with(
        &self,
        selection: SelectionId,
        requirements: &[(PeripheralType, Option<SubSignal>)],
    ) -> Vec<Candidate> {
        let Some(var) = self.selections.get(selection) else {
            return Vec::new();
        };

        let mut candidates = Vec::new();
        for &pin in &var.domain {
            let Some(identity_var) = self.identities.get(pin) else {
                continue;
            };
            for (index, identity) in identity_var.domain.iter().enumerate() {
                let fits = match identity {
                    Identity::Inactive => false,
                    Identity::Bound(_) => requirements
                        .iter()
                        .all(|(peripheral, sub)| identity.satisfies(*peripheral, *sub)),
                };
                if fits {
                    candidates.push(Candidate {
                        pin,
                        identity: index,
                    });
                }
            }
        }
        candidates
    }
}

/// A complete assignment of every variable of a [`CspProblem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Chosen pin per selection variable.
    pub selections: Vec<PinIndex>,
    /// Chosen identity-domain index per pin; 0 is inactive.
    pub identities: Vec<usize>,
}

impl Assignment {
    /// Binding realized by the pin chosen for `selection`.
    pub fn binding_of<'a>(&self, problem: &'a CspProblem, selection: SelectionId) -> Option<&'a Binding> {
        let pin = *self.selections.get(selection)?;
        let index = *self.identities.get(pin)?;
        problem.identity(pin, index)?.binding()
    }
}
