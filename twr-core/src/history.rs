//! Undo/redo action log for reviewer decisions.
//!
//! Every forward mutation of the decision map is recorded as one
//! [`HistoryAction`] holding enough prior state to invert it exactly. The log
//! is two stacks: `past` (most recent last) and `future` (next redo last).
//! Recording a fresh action always empties `future`, and `past` never holds
//! more than [`MAX_HISTORY`] entries.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::types::{Decision, Verdict};

/// Upper bound on the undo stack; older entries are dropped on push.
pub const MAX_HISTORY: usize = 100;

/// Single-fix accept or reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecideChange {
    pub index: usize,
    pub note: String,
    pub prev_state: Option<Decision>,
}

/// Removal of an existing decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearChange {
    pub index: usize,
    pub prev_state: Decision,
}

/// Note edit on an already-decided fix. `prev_state` is the whole prior entry
/// so undo restores the old timestamp as well as the old note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteChange {
    pub index: usize,
    pub note: String,
    pub prev_state: Decision,
}

/// A batch decision applied at one shared timestamp.
///
/// `prev_states` has one key per entry of `indices`, mapped to `None` when the
/// fix was pending before the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub note: String,
    pub indices: Vec<usize>,
    #[serde(with = "index_keys")]
    pub prev_states: BTreeMap<usize, Option<Decision>>,
}

/// Serialises an index-keyed map with string keys and parses them back.
///
/// `HistoryAction` is internally tagged, so its fields are buffered before
/// deserialisation and integer map keys would otherwise arrive as strings.
mod index_keys {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::types::Decision;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<usize, Option<Decision>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        map.iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<usize, Option<Decision>>, D::Error> {
        BTreeMap::<String, Option<Decision>>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| {
                k.parse::<usize>()
                    .map(|i| (i, v))
                    .map_err(|_| D::Error::custom(format!("invalid fix index key {k:?}")))
            })
            .collect()
    }
}

/// One invertible mutation of the decision map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryAction {
    Accept(DecideChange),
    Reject(DecideChange),
    Clear(ClearChange),
    SetNote(NoteChange),
    AcceptGroup(BulkChange),
    RejectGroup(BulkChange),
    AcceptBulk(BulkChange),
    RejectBulk(BulkChange),
}

impl HistoryAction {
    /// Wire name of the action kind, as stored in save payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            HistoryAction::Accept(_) => "accept",
            HistoryAction::Reject(_) => "reject",
            HistoryAction::Clear(_) => "clear",
            HistoryAction::SetNote(_) => "set_note",
            HistoryAction::AcceptGroup(_) => "accept_group",
            HistoryAction::RejectGroup(_) => "reject_group",
            HistoryAction::AcceptBulk(_) => "accept_bulk",
            HistoryAction::RejectBulk(_) => "reject_bulk",
        }
    }

    /// Verdict the forward effect applies, if any.
    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            HistoryAction::Accept(_)
            | HistoryAction::AcceptGroup(_)
            | HistoryAction::AcceptBulk(_) => Some(Verdict::Accepted),
            HistoryAction::Reject(_)
            | HistoryAction::RejectGroup(_)
            | HistoryAction::RejectBulk(_) => Some(Verdict::Rejected),
            HistoryAction::Clear(_) | HistoryAction::SetNote(_) => None,
        }
    }

    /// Every fix index this action touches, in recorded order.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            HistoryAction::Accept(c) | HistoryAction::Reject(c) => vec![c.index],
            HistoryAction::Clear(c) => vec![c.index],
            HistoryAction::SetNote(c) => vec![c.index],
            HistoryAction::AcceptGroup(b)
            | HistoryAction::RejectGroup(b)
            | HistoryAction::AcceptBulk(b)
            | HistoryAction::RejectBulk(b) => b.indices.clone(),
        }
    }

    /// Prior decision-map entries to write back on undo.
    pub(crate) fn prior_entries(&self) -> Vec<(usize, Option<Decision>)> {
        match self {
            HistoryAction::Accept(c) | HistoryAction::Reject(c) => {
                vec![(c.index, c.prev_state.clone())]
            }
            HistoryAction::Clear(c) => vec![(c.index, Some(c.prev_state.clone()))],
            HistoryAction::SetNote(c) => vec![(c.index, Some(c.prev_state.clone()))],
            HistoryAction::AcceptGroup(b)
            | HistoryAction::RejectGroup(b)
            | HistoryAction::AcceptBulk(b)
            | HistoryAction::RejectBulk(b) => b
                .indices
                .iter()
                .map(|i| (*i, b.prev_states.get(i).cloned().flatten()))
                .collect(),
        }
    }
}

/// Bounded undo/redo stacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    past: VecDeque<HistoryAction>,
    future: Vec<HistoryAction>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fresh forward action: clears redo and enforces the bound.
    pub fn record(&mut self, action: HistoryAction) {
        self.future.clear();
        self.push_past(action);
    }

    fn push_past(&mut self, action: HistoryAction) {
        self.past.push_back(action);
        while self.past.len() > MAX_HISTORY {
            self.past.pop_front();
        }
    }

    /// Moves the most recent action to the redo stack and returns it.
    pub fn undo(&mut self) -> Option<HistoryAction> {
        let action = self.past.pop_back()?;
        self.future.push(action.clone());
        Some(action)
    }

    /// Moves the next redo action back onto the undo stack and returns it.
    ///
    /// Unlike [`History::record`], this leaves the rest of `future` intact so
    /// several undos can be redone in sequence.
    pub fn redo(&mut self) -> Option<HistoryAction> {
        let action = self.future.pop()?;
        self.push_past(action.clone());
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past(&self) -> impl ExactSizeIterator<Item = &HistoryAction> + DoubleEndedIterator {
        self.past.iter()
    }

    pub fn future(&self) -> &[HistoryAction] {
        &self.future
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Drops the oldest undo entries and the deepest redo entries beyond
    /// [`MAX_HISTORY`]. Returns how many entries were dropped.
    pub(crate) fn enforce_bound(&mut self) -> usize {
        let mut dropped = 0;
        while self.past.len() > MAX_HISTORY {
            self.past.pop_front();
            dropped += 1;
        }
        if self.future.len() > MAX_HISTORY {
            let excess = self.future.len() - MAX_HISTORY;
            self.future.drain(..excess);
            dropped += excess;
        }
        dropped
    }

    /// Largest fix index referenced by any recorded action.
    pub(crate) fn max_index(&self) -> Option<usize> {
        self.past
            .iter()
            .chain(self.future.iter())
            .flat_map(HistoryAction::indices)
            .max()
    }
}
