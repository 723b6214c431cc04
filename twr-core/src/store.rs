//! The fix-review decision store.
//!
//! `DecisionHistoryStore` owns one review session at a time: the fix list and
//! group definitions handed to [`DecisionHistoryStore::init`], the decision map,
//! the undo/redo log, the navigation cursor and ordering, and the search and
//! filter state. Collaborators (persistence backend, clock) are injected at
//! construction so independent stores can coexist and tests can pin time.
//!
//! Every operation returns a `Result`. Refusals (bad index, unknown group,
//! uninitialised session, ...) leave state untouched and are logged with
//! `tracing::warn!`; the host never needs to guard a call against panics.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, StoreError};
use crate::events::{ChangeEvent, DecisionEvent, NavigateEvent, Signal};
use crate::history::{BulkChange, ClearChange, DecideChange, History, HistoryAction, NoteChange};
use crate::navigation::{self, Direction};
use crate::persist::{self, KeyValueStore, MemoryStore, SavedProgress, SAVE_VERSION};
use crate::stats::{self, ExportData, Statistics};
use crate::types::{Decision, Filters, Fix, Group, NavigationMode, Status, Tier, Verdict};

/// The three notification channels a host subscribes to for re-rendering.
#[derive(Debug)]
pub struct StoreSignals {
    pub change: Signal<ChangeEvent>,
    pub decision: Signal<DecisionEvent>,
    pub navigate: Signal<NavigateEvent>,
}

impl Default for StoreSignals {
    fn default() -> Self {
        Self {
            change: Signal::new("change"),
            decision: Signal::new("decision"),
            navigate: Signal::new("navigate"),
        }
    }
}

/// Per-session aggregate created by `init` and dropped by `reset`.
#[derive(Debug)]
struct Session {
    doc_id: String,
    session_id: String,
    fixes: Vec<Fix>,
    groups: Vec<Group>,
    group_of: HashMap<usize, String>,
    decisions: BTreeMap<usize, Decision>,
    history: History,
    navigation_mode: NavigationMode,
    navigation_order: Vec<usize>,
    current_index: usize,
    search_query: String,
    filters: Filters,
    session_start: i64,
}

impl Session {
    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.fixes.len() {
            Ok(())
        } else {
            Err(StoreError::InvalidIndex {
                index,
                count: self.fixes.len(),
            })
        }
    }

    fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    fn pending_indices<F>(&self, keep: F) -> Vec<usize>
    where
        F: Fn(&Fix) -> bool,
    {
        self.fixes
            .iter()
            .enumerate()
            .filter(|(i, fix)| !self.decisions.contains_key(i) && keep(fix))
            .map(|(i, _)| i)
            .collect()
    }

    fn position_of(&self, index: usize) -> usize {
        self.navigation_order
            .iter()
            .position(|&i| i == index)
            .map_or(0, |p| p + 1)
    }

    fn navigate_event(&self) -> NavigateEvent {
        NavigateEvent {
            index: self.current_index,
            position: self.position_of(self.current_index),
        }
    }

    fn write_entry(&mut self, index: usize, entry: Option<Decision>) {
        match entry {
            Some(decision) => {
                self.decisions.insert(index, decision);
            }
            None => {
                self.decisions.remove(&index);
            }
        }
    }
}

/// Borrows the active session, or fails with `NotInitialized`.
///
/// A free function (rather than a method on the store) so the returned borrow
/// covers only the `session` field and the signals stay usable alongside it.
fn active(session: &mut Option<Session>) -> Result<&mut Session> {
    session.as_mut().ok_or(StoreError::NotInitialized)
}

fn refuse(op: &'static str, err: StoreError) -> StoreError {
    tracing::warn!(op, error = %err, "operation refused");
    err
}

/// Deduplicates `indices`, keeping the first occurrence of each.
fn dedup_in_order(indices: &[usize]) -> Vec<usize> {
    let mut seen = std::collections::HashSet::new();
    indices.iter().copied().filter(|i| seen.insert(*i)).collect()
}

/// Which bulk history variant a batch is recorded as.
#[derive(Debug, Clone, Copy)]
enum BulkScope {
    Group,
    Bulk,
}

/// Owns decisions, history, and navigation for one review session.
pub struct DecisionHistoryStore {
    backend: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
    session: Option<Session>,
    signals: StoreSignals,
}

impl DecisionHistoryStore {
    /// Creates an uninitialised store over the given collaborators.
    pub fn new(backend: impl KeyValueStore + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            clock: Box::new(clock),
            session: None,
            signals: StoreSignals::default(),
        }
    }

    /// Store with an in-process backend and the wall clock.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), SystemClock)
    }

    /// Notification channels. Subscriptions survive `init` and `reset`.
    pub fn signals(&mut self) -> &mut StoreSignals {
        &mut self.signals
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Starts a review session over `fixes`, replacing any previous session.
    ///
    /// Rejects a fix with `page == 0` and any group that references an index
    /// outside the fix list. A fix listed by more than one group is assigned
    /// to the last group that lists it (logged as a configuration warning).
    /// A repeated `group_id` replaces the earlier definition.
    ///
    /// # Errors
    ///
    /// `InvalidSetup` when validation fails; the previous session (if any) is
    /// left in place.
    pub fn init(&mut self, doc_id: impl Into<String>, fixes: Vec<Fix>, groups: Vec<Group>) -> Result<()> {
        let doc_id = doc_id.into();

        if let Some(index) = fixes.iter().position(|f| f.page == 0) {
            return Err(refuse(
                "init",
                StoreError::InvalidSetup(format!("fix {index} has page 0; pages start at 1")),
            ));
        }

        let mut registered: Vec<Group> = Vec::new();
        for mut group in groups {
            if let Some(bad) = group.fix_indices.iter().find(|&&i| i >= fixes.len()) {
                return Err(refuse(
                    "init",
                    StoreError::InvalidSetup(format!(
                        "group {:?} references fix {bad} but only {} fixes exist",
                        group.group_id,
                        fixes.len()
                    )),
                ));
            }
            group.fix_indices = dedup_in_order(&group.fix_indices);
            if let Some(pos) = registered.iter().position(|g| g.group_id == group.group_id) {
                tracing::warn!(group = %group.group_id, "duplicate group id; later definition wins");
                registered.remove(pos);
            }
            registered.push(group);
        }

        let mut group_of: HashMap<usize, String> = HashMap::new();
        for group in &registered {
            for &index in &group.fix_indices {
                if let Some(previous) = group_of.insert(index, group.group_id.clone()) {
                    tracing::warn!(
                        index,
                        previous = %previous,
                        group = %group.group_id,
                        "fix listed by more than one group; last group wins"
                    );
                }
            }
        }

        let navigation_mode = NavigationMode::default();
        let navigation_order = navigation::compute_order(&fixes, navigation_mode);
        let current_index = navigation_order.first().copied().unwrap_or(0);
        let fix_count = fixes.len();

        self.session = Some(Session {
            doc_id,
            session_id: uuid::Uuid::new_v4().to_string(),
            fixes,
            groups: registered,
            group_of,
            decisions: BTreeMap::new(),
            history: History::new(),
            navigation_mode,
            navigation_order,
            current_index,
            search_query: String::new(),
            filters: Filters::default(),
            session_start: self.clock.now_millis(),
        });

        tracing::info!(fix_count, "review session initialized");
        self.signals
            .change
            .emit(&ChangeEvent::Initialized { fix_count });
        Ok(())
    }

    /// Drops the current session. Listeners stay subscribed.
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            tracing::info!("review session reset");
            self.signals.change.emit(&ChangeEvent::Reset);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(StoreError::NotInitialized)
    }

    /// Number of fixes in the session (0 when uninitialised).
    pub fn fix_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.fixes.len())
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.doc_id.as_str())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id.as_str())
    }

    pub fn fixes(&self) -> Result<&[Fix]> {
        Ok(self.session()?.fixes.as_slice())
    }

    pub fn fix(&self, index: usize) -> Result<&Fix> {
        let session = self.session()?;
        session.check_index(index)?;
        Ok(&session.fixes[index])
    }

    pub fn groups(&self) -> Result<&[Group]> {
        Ok(self.session()?.groups.as_slice())
    }

    /// Group id that owns `index`, if any.
    pub fn group_of(&self, index: usize) -> Result<Option<&str>> {
        let session = self.session()?;
        session.check_index(index)?;
        Ok(session.group_of.get(&index).map(String::as_str))
    }

    pub fn decision(&self, index: usize) -> Result<Option<&Decision>> {
        let session = self.session()?;
        session.check_index(index)?;
        Ok(session.decisions.get(&index))
    }

    pub fn status(&self, index: usize) -> Result<Status> {
        let session = self.session()?;
        session.check_index(index)?;
        Ok(navigation::status_of(&session.decisions, index))
    }

    /// The whole decision map, keyed by fix index.
    pub fn decisions(&self) -> Result<&BTreeMap<usize, Decision>> {
        Ok(&self.session()?.decisions)
    }

    pub fn history(&self) -> Result<&History> {
        Ok(&self.session()?.history)
    }

    pub fn can_undo(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.history.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.history.can_redo())
    }

    // -----------------------------------------------------------------------
    // Decision engine
    // -----------------------------------------------------------------------

    /// Accepts fix `index`, replacing any earlier decision.
    pub fn accept(&mut self, index: usize, note: &str) -> Result<()> {
        self.decide("accept", index, Verdict::Accepted, note)
    }

    /// Rejects fix `index`, replacing any earlier decision.
    pub fn reject(&mut self, index: usize, note: &str) -> Result<()> {
        self.decide("reject", index, Verdict::Rejected, note)
    }

    fn decide(&mut self, op: &'static str, index: usize, verdict: Verdict, note: &str) -> Result<()> {
        let now = self.clock.now_millis();
        let session = active(&mut self.session).map_err(|e| refuse(op, e))?;
        session.check_index(index).map_err(|e| refuse(op, e))?;

        let entry = Decision {
            decision: verdict,
            note: note.to_owned(),
            timestamp: now,
        };
        let prev_state = session.decisions.insert(index, entry.clone());
        let change = DecideChange {
            index,
            note: note.to_owned(),
            prev_state,
        };
        session.history.record(match verdict {
            Verdict::Accepted => HistoryAction::Accept(change),
            Verdict::Rejected => HistoryAction::Reject(change),
        });
        tracing::debug!(index, ?verdict, "decision recorded");

        self.signals.decision.emit(&DecisionEvent::Single {
            index,
            decision: Some(entry),
        });
        self.signals
            .change
            .emit(&ChangeEvent::Decisions { indices: vec![index] });
        Ok(())
    }

    /// Returns fix `index` to pending.
    ///
    /// Returns `Ok(false)` without recording history when it is already pending.
    pub fn clear_decision(&mut self, index: usize) -> Result<bool> {
        let session = active(&mut self.session).map_err(|e| refuse("clear", e))?;
        session.check_index(index).map_err(|e| refuse("clear", e))?;

        let Some(prev_state) = session.decisions.remove(&index) else {
            return Ok(false);
        };
        session
            .history
            .record(HistoryAction::Clear(ClearChange { index, prev_state }));
        tracing::debug!(index, "decision cleared");

        self.signals.decision.emit(&DecisionEvent::Single {
            index,
            decision: None,
        });
        self.signals
            .change
            .emit(&ChangeEvent::Decisions { indices: vec![index] });
        Ok(true)
    }

    /// Replaces the note on an existing decision and refreshes its timestamp.
    ///
    /// # Errors
    ///
    /// `NoteOnPending` when fix `index` has no decision yet.
    pub fn set_note(&mut self, index: usize, note: &str) -> Result<()> {
        let now = self.clock.now_millis();
        let session = active(&mut self.session).map_err(|e| refuse("set_note", e))?;
        session.check_index(index).map_err(|e| refuse("set_note", e))?;

        let Some(entry) = session.decisions.get_mut(&index) else {
            return Err(refuse("set_note", StoreError::NoteOnPending(index)));
        };
        let prev_state = entry.clone();
        entry.note = note.to_owned();
        entry.timestamp = now;
        let updated = entry.clone();

        session.history.record(HistoryAction::SetNote(NoteChange {
            index,
            note: note.to_owned(),
            prev_state,
        }));
        tracing::debug!(index, "note updated");

        self.signals.decision.emit(&DecisionEvent::Single {
            index,
            decision: Some(updated),
        });
        self.signals
            .change
            .emit(&ChangeEvent::Decisions { indices: vec![index] });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk decision engine
    // -----------------------------------------------------------------------

    /// Accepts every fix in group `group_id`, overwriting earlier decisions.
    /// Returns the affected indices.
    pub fn accept_group(&mut self, group_id: &str, note: &str) -> Result<Vec<usize>> {
        self.decide_group("accept_group", group_id, Verdict::Accepted, note)
    }

    /// Rejects every fix in group `group_id`, overwriting earlier decisions.
    pub fn reject_group(&mut self, group_id: &str, note: &str) -> Result<Vec<usize>> {
        self.decide_group("reject_group", group_id, Verdict::Rejected, note)
    }

    /// Accepts every pending fix whose confidence tier is `tier`.
    pub fn accept_by_tier(&mut self, tier: Tier) -> Result<Vec<usize>> {
        self.decide_pending("accept_by_tier", Verdict::Accepted, |f| f.confidence_tier == tier)
    }

    /// Rejects every pending fix whose confidence tier is `tier`.
    pub fn reject_by_tier(&mut self, tier: Tier) -> Result<Vec<usize>> {
        self.decide_pending("reject_by_tier", Verdict::Rejected, |f| f.confidence_tier == tier)
    }

    /// Accepts every pending fix. Already-decided fixes are untouched.
    pub fn accept_all_pending(&mut self) -> Result<Vec<usize>> {
        self.decide_pending("accept_all_pending", Verdict::Accepted, |_| true)
    }

    /// Rejects every pending fix. Already-decided fixes are untouched.
    pub fn reject_all_pending(&mut self) -> Result<Vec<usize>> {
        self.decide_pending("reject_all_pending", Verdict::Rejected, |_| true)
    }

    fn decide_group(
        &mut self,
        op: &'static str,
        group_id: &str,
        verdict: Verdict,
        note: &str,
    ) -> Result<Vec<usize>> {
        let session = active(&mut self.session).map_err(|e| refuse(op, e))?;
        let indices = match session.group(group_id) {
            Some(group) => group.fix_indices.clone(),
            None => return Err(refuse(op, StoreError::UnknownGroup(group_id.to_owned()))),
        };
        self.apply_bulk(
            op,
            BulkScope::Group,
            Some(group_id.to_owned()),
            verdict,
            note,
            indices,
        )
    }

    fn decide_pending<F>(&mut self, op: &'static str, verdict: Verdict, keep: F) -> Result<Vec<usize>>
    where
        F: Fn(&Fix) -> bool,
    {
        let session = active(&mut self.session).map_err(|e| refuse(op, e))?;
        let indices = session.pending_indices(keep);
        self.apply_bulk(op, BulkScope::Bulk, None, verdict, "", indices)
    }

    /// Writes one verdict to every index at a single shared timestamp and
    /// records one history action. An empty batch records and emits nothing.
    fn apply_bulk(
        &mut self,
        op: &'static str,
        scope: BulkScope,
        group_id: Option<String>,
        verdict: Verdict,
        note: &str,
        indices: Vec<usize>,
    ) -> Result<Vec<usize>> {
        if indices.is_empty() {
            tracing::debug!(op, "bulk operation matched no fixes");
            return Ok(indices);
        }
        let now = self.clock.now_millis();
        let session = active(&mut self.session)?;

        let mut prev_states = BTreeMap::new();
        for &index in &indices {
            let prior = session.decisions.insert(
                index,
                Decision {
                    decision: verdict,
                    note: note.to_owned(),
                    timestamp: now,
                },
            );
            prev_states.insert(index, prior);
        }

        let change = BulkChange {
            group_id,
            note: note.to_owned(),
            indices: indices.clone(),
            prev_states,
        };
        session.history.record(match (scope, verdict) {
            (BulkScope::Group, Verdict::Accepted) => HistoryAction::AcceptGroup(change),
            (BulkScope::Group, Verdict::Rejected) => HistoryAction::RejectGroup(change),
            (BulkScope::Bulk, Verdict::Accepted) => HistoryAction::AcceptBulk(change),
            (BulkScope::Bulk, Verdict::Rejected) => HistoryAction::RejectBulk(change),
        });
        tracing::debug!(op, count = indices.len(), ?verdict, "bulk decision recorded");

        self.signals.decision.emit(&DecisionEvent::Bulk {
            indices: indices.clone(),
            verdict,
        });
        self.signals.change.emit(&ChangeEvent::Decisions {
            indices: indices.clone(),
        });
        Ok(indices)
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    /// Reverts the most recent action, restoring the exact prior entries.
    ///
    /// Returns the reverted action, or `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<HistoryAction>> {
        let session = active(&mut self.session).map_err(|e| refuse("undo", e))?;
        let Some(action) = session.history.undo() else {
            return Ok(None);
        };
        for (index, prior) in action.prior_entries() {
            session.write_entry(index, prior);
        }
        tracing::debug!(kind = action.kind(), "action undone");

        self.signals.change.emit(&ChangeEvent::Undo(action.clone()));
        Ok(Some(action))
    }

    /// Reapplies the most recently undone action.
    ///
    /// The forward effect is re-derived at redo time. A single accept or
    /// reject comes back with an empty note and a fresh timestamp; the note
    /// recorded on the original action is not restored.
    pub fn redo(&mut self) -> Result<Option<HistoryAction>> {
        let now = self.clock.now_millis();
        let session = active(&mut self.session).map_err(|e| refuse("redo", e))?;
        let Some(action) = session.history.redo() else {
            return Ok(None);
        };

        let fresh = |verdict: Verdict, note: &str| Decision {
            decision: verdict,
            note: note.to_owned(),
            timestamp: now,
        };
        match &action {
            HistoryAction::Accept(c) => {
                session.decisions.insert(c.index, fresh(Verdict::Accepted, ""));
            }
            HistoryAction::Reject(c) => {
                session.decisions.insert(c.index, fresh(Verdict::Rejected, ""));
            }
            HistoryAction::Clear(c) => {
                session.decisions.remove(&c.index);
            }
            HistoryAction::SetNote(c) => {
                if let Some(entry) = session.decisions.get_mut(&c.index) {
                    entry.note = c.note.clone();
                    entry.timestamp = now;
                }
            }
            HistoryAction::AcceptGroup(b) | HistoryAction::AcceptBulk(b) => {
                for &index in &b.indices {
                    session.decisions.insert(index, fresh(Verdict::Accepted, &b.note));
                }
            }
            HistoryAction::RejectGroup(b) | HistoryAction::RejectBulk(b) => {
                for &index in &b.indices {
                    session.decisions.insert(index, fresh(Verdict::Rejected, &b.note));
                }
            }
        }
        tracing::debug!(kind = action.kind(), "action redone");

        self.signals.change.emit(&ChangeEvent::Redo(action.clone()));
        Ok(Some(action))
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// Recomputes the navigation order. The cursor stays on the same fix.
    pub fn set_navigation_mode(&mut self, mode: NavigationMode) -> Result<()> {
        let session = active(&mut self.session).map_err(|e| refuse("set_navigation_mode", e))?;
        session.navigation_mode = mode;
        session.navigation_order = navigation::compute_order(&session.fixes, mode);
        tracing::debug!(%mode, "navigation order recomputed");
        self.signals.change.emit(&ChangeEvent::NavigationMode(mode));
        Ok(())
    }

    /// Text form of [`Self::set_navigation_mode`].
    ///
    /// # Errors
    ///
    /// `UnknownMode` when `mode` names no ordering.
    pub fn set_navigation_mode_str(&mut self, mode: &str) -> Result<()> {
        let mode = mode
            .parse::<NavigationMode>()
            .map_err(|e| refuse("set_navigation_mode", e))?;
        self.set_navigation_mode(mode)
    }

    pub fn navigation_mode(&self) -> Result<NavigationMode> {
        Ok(self.session()?.navigation_mode)
    }

    pub fn navigation_order(&self) -> Result<&[usize]> {
        Ok(self.session()?.navigation_order.as_slice())
    }

    /// Fix index under the cursor; `None` when uninitialised or empty.
    pub fn current_index(&self) -> Option<usize> {
        self.session
            .as_ref()
            .filter(|s| !s.fixes.is_empty())
            .map(|s| s.current_index)
    }

    pub fn current_fix(&self) -> Option<&Fix> {
        let session = self.session.as_ref()?;
        session.fixes.get(session.current_index)
    }

    /// 1-based position of the cursor within the navigation order.
    pub fn current_position(&self) -> Option<usize> {
        let session = self.session.as_ref().filter(|s| !s.fixes.is_empty())?;
        Some(session.position_of(session.current_index))
    }

    /// Moves to the next fix in navigation order, optionally skipping decided
    /// fixes. Returns the new index, or `None` (cursor unchanged) at the end.
    pub fn go_to_next(&mut self, skip_decided: bool) -> Result<Option<usize>> {
        self.step("go_to_next", Direction::Forward, skip_decided)
    }

    /// Moves to the previous fix in navigation order.
    pub fn go_to_previous(&mut self, skip_decided: bool) -> Result<Option<usize>> {
        self.step("go_to_previous", Direction::Backward, skip_decided)
    }

    fn step(&mut self, op: &'static str, direction: Direction, skip_decided: bool) -> Result<Option<usize>> {
        let session = active(&mut self.session).map_err(|e| refuse(op, e))?;
        let decisions = &session.decisions;
        let target = navigation::step(
            &session.navigation_order,
            session.current_index,
            direction,
            |i| skip_decided && decisions.contains_key(&i),
        );
        let Some(index) = target else {
            tracing::debug!(op, "no eligible fix in that direction");
            return Ok(None);
        };
        session.current_index = index;
        let event = session.navigate_event();
        self.signals.navigate.emit(&event);
        Ok(Some(index))
    }

    /// Jumps the cursor to `index`.
    pub fn go_to_index(&mut self, index: usize) -> Result<()> {
        let session = active(&mut self.session).map_err(|e| refuse("go_to_index", e))?;
        session.check_index(index).map_err(|e| refuse("go_to_index", e))?;
        session.current_index = index;
        let event = session.navigate_event();
        self.signals.navigate.emit(&event);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Search and filters
    // -----------------------------------------------------------------------

    /// Sets the free-text query used by [`Self::filtered_indices`].
    pub fn set_search_query(&mut self, query: &str) -> Result<()> {
        let session = active(&mut self.session).map_err(|e| refuse("set_search_query", e))?;
        session.search_query = query.to_owned();
        self.signals.change.emit(&ChangeEvent::Filters);
        Ok(())
    }

    pub fn set_filters(&mut self, filters: Filters) -> Result<()> {
        let session = active(&mut self.session).map_err(|e| refuse("set_filters", e))?;
        session.filters = filters;
        self.signals.change.emit(&ChangeEvent::Filters);
        Ok(())
    }

    /// Clears both the query and every filter.
    pub fn clear_filters(&mut self) -> Result<()> {
        let session = active(&mut self.session).map_err(|e| refuse("clear_filters", e))?;
        session.search_query.clear();
        session.filters = Filters::default();
        self.signals.change.emit(&ChangeEvent::Filters);
        Ok(())
    }

    pub fn search_query(&self) -> Result<&str> {
        Ok(self.session()?.search_query.as_str())
    }

    pub fn filters(&self) -> Result<&Filters> {
        Ok(&self.session()?.filters)
    }

    /// Ascending indices of fixes matching the query and filters.
    ///
    /// Independent of the navigation order used by next/previous.
    pub fn filtered_indices(&self) -> Result<Vec<usize>> {
        let session = self.session()?;
        Ok(navigation::filtered_indices(
            &session.fixes,
            &session.decisions,
            &session.search_query,
            &session.filters,
        ))
    }

    // -----------------------------------------------------------------------
    // Statistics and export
    // -----------------------------------------------------------------------

    pub fn statistics(&self) -> Result<Statistics> {
        let session = self.session()?;
        Ok(stats::compute(&session.fixes, &session.decisions))
    }

    pub fn estimated_time_remaining(&self) -> Result<Duration> {
        let session = self.session()?;
        let decided = session.decisions.len();
        let pending = session.fixes.len() - decided;
        Ok(stats::estimate_remaining(
            decided,
            pending,
            session.session_start,
            self.clock.now_millis(),
        ))
    }

    pub fn export_data(&self) -> Result<ExportData> {
        let session = self.session()?;
        Ok(stats::export(&session.fixes, &session.decisions, &session.group_of))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Writes the session to the backend under the session's document id.
    ///
    /// # Errors
    ///
    /// `PersistenceFailure` when the backend refuses the write (e.g. quota).
    /// In-memory state is never modified by a save.
    pub fn save_progress(&mut self) -> Result<()> {
        let saved_at = self.clock.now_millis();
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| refuse("save_progress", StoreError::NotInitialized))?;
        let payload = SavedProgress {
            version: SAVE_VERSION,
            doc_id: session.doc_id.clone(),
            session_id: session.session_id.clone(),
            fix_count: session.fixes.len(),
            decisions: session.decisions.clone(),
            current_index: session.current_index,
            navigation_mode: session.navigation_mode,
            filters: session.filters.clone(),
            search_query: session.search_query.clone(),
            history: session.history.clone(),
            session_start_time: session.session_start,
            saved_at,
        };
        let json = serde_json::to_string(&payload)?;
        self.backend
            .set(&persist::progress_key(&session.doc_id), &json)
            .map_err(|e| {
                tracing::error!(doc_id = %session.doc_id, error = %e, "failed to save progress");
                StoreError::from(e)
            })?;
        tracing::debug!(doc_id = %session.doc_id, bytes = json.len(), "progress saved");
        Ok(())
    }

    /// Loads saved progress for `doc_id` into the current session.
    ///
    /// Returns `Ok(false)` (state untouched) when nothing usable is stored:
    /// no entry, undecodable JSON, a different format version, or a payload
    /// recorded against a different number of fixes.
    ///
    /// # Errors
    ///
    /// `NotInitialized` before `init`; `PersistenceFailure` when the backend
    /// read itself fails.
    pub fn restore_progress(&mut self, doc_id: &str) -> Result<bool> {
        let session = active(&mut self.session).map_err(|e| refuse("restore_progress", e))?;
        let raw = match self.backend.get(&persist::progress_key(doc_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::error!(doc_id, error = %e, "failed to read saved progress");
                return Err(e.into());
            }
        };
        let mut saved = match persist::decode(&raw) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(doc_id, error = %e, "ignoring unreadable saved progress");
                return Ok(false);
            }
        };

        let count = session.fixes.len();
        let out_of_range = saved.decisions.keys().next_back().is_some_and(|&i| i >= count)
            || saved.history.max_index().is_some_and(|i| i >= count);
        if saved.fix_count != count || out_of_range {
            tracing::warn!(
                doc_id,
                saved = saved.fix_count,
                current = count,
                "ignoring saved progress recorded against a different fix list"
            );
            return Ok(false);
        }
        let trimmed = saved.history.enforce_bound();
        if trimmed > 0 {
            tracing::warn!(doc_id, trimmed, "saved history exceeded the undo bound; oldest entries dropped");
        }

        session.doc_id = doc_id.to_owned();
        session.session_id = saved.session_id;
        session.decisions = saved.decisions;
        session.history = saved.history;
        session.navigation_mode = saved.navigation_mode;
        session.navigation_order = navigation::compute_order(&session.fixes, saved.navigation_mode);
        session.current_index = if saved.current_index < count { saved.current_index } else { 0 };
        session.filters = saved.filters;
        session.search_query = saved.search_query;
        session.session_start = saved.session_start_time;
        let event = session.navigate_event();

        tracing::info!(doc_id, decided = session.decisions.len(), "progress restored");
        self.signals.change.emit(&ChangeEvent::Restored);
        if count > 0 {
            self.signals.navigate.emit(&event);
        }
        Ok(true)
    }

    /// Returns `true` when the backend holds an entry for `doc_id`.
    ///
    /// Does not validate the payload; [`Self::restore_progress`] may still
    /// decline it.
    pub fn has_saved_progress(&self, doc_id: &str) -> Result<bool> {
        Ok(self.backend.get(&persist::progress_key(doc_id))?.is_some())
    }

    /// Deletes any saved progress for `doc_id`.
    pub fn clear_progress(&mut self, doc_id: &str) -> Result<()> {
        self.backend.remove(&persist::progress_key(doc_id))?;
        tracing::debug!(doc_id, "saved progress cleared");
        Ok(())
    }
}

impl std::fmt::Debug for DecisionHistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionHistoryStore")
            .field("session", &self.session)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}
