//! Ordered answer set and per-session toggle set.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::form::{AnswerValue, OptionId, StepId};

/// Answers collected so far, in the order the steps were passed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Answers {
    entries: Vec<(StepId, AnswerValue)>,
}

impl Answers {
    pub fn get(&self, step: StepId) -> Option<&AnswerValue> {
        self.entries
            .iter()
            .find(|(id, _)| *id == step)
            .map(|(_, value)| value)
    }

    /// Store the answer for `step`, replacing an earlier one.
    pub fn record(&mut self, step: StepId, value: AnswerValue) {
        match self.entries.iter_mut().find(|(id, _)| *id == step) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((step, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (StepId, &AnswerValue)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Selected state of every add-on the user has touched.
///
/// Options never toggled are unselected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToggleSet {
    states: BTreeMap<OptionId, bool>,
}

impl ToggleSet {
    /// Flip one option and return its new state.
    pub fn toggle(&mut self, option: OptionId) -> bool {
        let state = self.states.entry(option).or_insert(false);
        *state = !*state;
        *state
    }

    pub fn is_selected(&self, option: OptionId) -> bool {
        self.states.get(&option).copied().unwrap_or(false)
    }

    pub fn selected(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.states
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| *id)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}
