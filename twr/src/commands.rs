//! Command dispatcher for twr.
//!
//! Translates one line of reviewer input into store calls and returns a
//! `CommandAction` telling the event loop whether to continue or quit. Store
//! refusals are reported as messages; nothing here can abort the loop.

use twr_core::{Filters, Severity, Status, StoreError, Tier};

use crate::app::AppState;
use crate::render;

/// Control-flow signal returned from the command dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Keep reading commands.
    Continue,
    /// Save and exit.
    Quit,
}

/// Dispatches one input line.
///
/// The first whitespace-separated word selects the command; the rest of the
/// line (trimmed) is its argument.
pub fn handle_command(line: &str, state: &mut AppState) -> CommandAction {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let result = match verb {
        "" => Ok(()),
        "quit" | "q" | "exit" => return CommandAction::Quit,
        "help" | "?" => {
            state.say(render::HELP);
            Ok(())
        }

        // Decisions on the fix under the cursor.
        "accept" | "a" => on_current(state, |s, i| s.store.accept(i, rest)),
        "reject" | "r" => on_current(state, |s, i| s.store.reject(i, rest)),
        "clear" => on_current(state, |s, i| {
            if !s.store.clear_decision(i)? {
                s.say(format!("#{i} is already pending"));
            }
            Ok(())
        }),
        "note" => on_current(state, |s, i| s.store.set_note(i, rest)),

        // Bulk decisions.
        "group-accept" | "group-reject" => handle_group(verb, rest, state),
        "tier" => rest
            .parse::<Tier>()
            .and_then(|tier| state.store.accept_by_tier(tier))
            .map(|affected| state.say(format!("accepted {} pending fixes", affected.len()))),
        "accept-all" => state
            .store
            .accept_all_pending()
            .map(|affected| state.say(format!("accepted {} pending fixes", affected.len()))),
        "reject-all" => state
            .store
            .reject_all_pending()
            .map(|affected| state.say(format!("rejected {} pending fixes", affected.len()))),

        // History.
        "undo" | "u" => state.store.undo().map(|action| match action {
            Some(a) => state.say(format!("undid {}", a.kind())),
            None => state.say("nothing to undo"),
        }),
        "redo" => state.store.redo().map(|action| match action {
            Some(a) => state.say(format!("redid {}", a.kind())),
            None => state.say("nothing to redo"),
        }),

        // Navigation.
        "next" | "n" => step(state, true, true),
        "next-all" => step(state, true, false),
        "prev" | "p" => step(state, false, false),
        "prev-pending" => step(state, false, true),
        "goto" => match rest.parse::<usize>() {
            Ok(index) => state.store.go_to_index(index),
            Err(_) => {
                state.say(format!("goto needs a fix index, got {rest:?}"));
                Ok(())
            }
        },
        "mode" => state.store.set_navigation_mode_str(rest),
        "show" => {
            show_current(state);
            Ok(())
        }

        // Search and filters.
        "search" => state.store.set_search_query(rest).map(|()| list(state)),
        "filter" => handle_filter(rest, state),
        "unfilter" => state.store.clear_filters().map(|()| list(state)),
        "list" => {
            list(state);
            Ok(())
        }

        // Session.
        "stats" => state
            .store
            .statistics()
            .and_then(|stats| Ok((stats, state.store.estimated_time_remaining()?)))
            .map(|(stats, eta)| state.say(render::statistics(&stats, eta))),
        "export" => state.store.export_data().and_then(|data| {
            state.say(render::export_summary(&data));
            let json = serde_json::to_string_pretty(&data)?;
            state.say(json);
            Ok(())
        }),
        "save" => {
            if state.save() {
                state.say("progress saved");
            }
            Ok(())
        }

        other => {
            state.say(format!("unknown command {other:?} (try `help`)"));
            Ok(())
        }
    };

    if let Err(e) = result {
        state.say(format!("error: {e}"));
    }
    CommandAction::Continue
}

/// Runs `f` against the fix under the cursor.
fn on_current<F>(state: &mut AppState, f: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut AppState, usize) -> Result<(), StoreError>,
{
    match state.store.current_index() {
        Some(index) => f(state, index),
        None => {
            state.say("no fix selected");
            Ok(())
        }
    }
}

fn handle_group(verb: &str, rest: &str, state: &mut AppState) -> Result<(), StoreError> {
    let (group_id, note) = match rest.split_once(char::is_whitespace) {
        Some((id, note)) => (id, note.trim()),
        None => (rest, ""),
    };
    if group_id.is_empty() {
        state.say(format!("{verb} needs a group id"));
        return Ok(());
    }
    let affected = if verb == "group-accept" {
        state.store.accept_group(group_id, note)?
    } else {
        state.store.reject_group(group_id, note)?
    };
    state.say(format!("{verb}: {} fixes in {group_id}", affected.len()));
    Ok(())
}

/// Moves the cursor; `forward` picks the direction.
fn step(state: &mut AppState, forward: bool, skip_decided: bool) -> Result<(), StoreError> {
    let moved = if forward {
        state.store.go_to_next(skip_decided)?
    } else {
        state.store.go_to_previous(skip_decided)?
    };
    if moved.is_none() {
        state.say(if forward { "no more fixes ahead" } else { "already at the first fix" });
    }
    Ok(())
}

/// `filter <field> <value>`; merges with the filters already set.
fn handle_filter(rest: &str, state: &mut AppState) -> Result<(), StoreError> {
    let Some((field, value)) = rest.split_once(char::is_whitespace) else {
        state.say("usage: filter <category|severity|status|tier> <value>");
        return Ok(());
    };
    let value = value.trim();
    let mut filters: Filters = state.store.filters()?.clone();
    match field {
        "category" => filters.category = Some(value.to_owned()),
        "severity" => filters.severity = Some(value.parse::<Severity>()?),
        "status" => filters.status = Some(value.parse::<Status>()?),
        "tier" => filters.tier = Some(value.parse::<Tier>()?),
        other => {
            state.say(format!("cannot filter on {other:?}"));
            return Ok(());
        }
    }
    state.store.set_filters(filters)?;
    list(state);
    Ok(())
}

/// Prints the filtered list, one line per fix.
fn list(state: &mut AppState) {
    let Ok(indices) = state.store.filtered_indices() else {
        return;
    };
    let mut lines = Vec::with_capacity(indices.len() + 1);
    lines.push(format!("{} matching fixes", indices.len()));
    for index in indices {
        if let (Ok(fix), Ok(status)) = (state.store.fix(index), state.store.status(index)) {
            lines.push(format!(
                "  #{index:<4} {:<8} {:<9} {}",
                fix.severity.as_str(),
                status.as_str(),
                fix.flagged_text
            ));
        }
    }
    state.say(lines.join("\n"));
}

/// Prints the fix under the cursor.
pub fn show_current(state: &mut AppState) {
    let (Some(index), Some(position)) = (state.store.current_index(), state.store.current_position())
    else {
        state.say("no fixes to review");
        return;
    };
    let total = state.store.fix_count();
    let card = match (state.store.fix(index), state.store.decision(index)) {
        (Ok(fix), Ok(decision)) => render::fix_card(index, position, total, fix, decision),
        _ => return,
    };
    state.say(card);
}

#[cfg(test)]
mod tests {
    use twr_core::{DecisionHistoryStore, Fix, Group, Verdict};

    use super::*;

    fn state() -> AppState {
        let mut store = DecisionHistoryStore::in_memory();
        let fixes = vec![
            Fix { flagged_text: "teh".into(), ..Fix::default() },
            Fix { flagged_text: "recieve".into(), confidence_tier: Tier::Safe, ..Fix::default() },
            Fix { flagged_text: "alot".into(), ..Fix::default() },
        ];
        let groups = vec![Group { group_id: "typos".into(), fix_indices: vec![0, 2], label: None }];
        store.init("doc", fixes, groups).unwrap();
        AppState::new(store)
    }

    #[test]
    fn accept_uses_rest_of_line_as_note() {
        let mut app = state();
        assert_eq!(handle_command("accept  fine as is ", &mut app), CommandAction::Continue);
        let d = app.store.decision(0).unwrap().unwrap();
        assert_eq!(d.decision, Verdict::Accepted);
        assert_eq!(d.note, "fine as is");
    }

    #[test]
    fn next_skips_to_pending_fix() {
        let mut app = state();
        handle_command("accept", &mut app);
        handle_command("goto 1", &mut app);
        handle_command("reject", &mut app);
        handle_command("goto 0", &mut app);
        handle_command("next", &mut app);
        assert_eq!(app.store.current_index(), Some(2));
    }

    #[test]
    fn group_and_undo_commands() {
        let mut app = state();
        handle_command("group-reject typos same typo list", &mut app);
        assert_eq!(app.store.decision(2).unwrap().unwrap().note, "same typo list");
        handle_command("undo", &mut app);
        assert!(app.store.decisions().unwrap().is_empty());
        let messages = app.take_messages();
        assert_eq!(messages.last().map(String::as_str), Some("undid reject_group"));
    }

    #[test]
    fn refusals_become_messages() {
        let mut app = state();
        handle_command("note orphan", &mut app);
        handle_command("mode alphabetical", &mut app);
        handle_command("group-accept missing", &mut app);
        let messages = app.take_messages();
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.starts_with("error: ")));
    }

    #[test]
    fn filter_by_tier_lists_matches() {
        let mut app = state();
        handle_command("filter tier safe", &mut app);
        assert_eq!(app.store.filtered_indices().unwrap(), vec![1]);
        assert!(app.take_messages()[0].starts_with("1 matching fixes"));
    }

    #[test]
    fn quit_stops_the_loop() {
        let mut app = state();
        assert_eq!(handle_command("quit", &mut app), CommandAction::Quit);
    }
}
