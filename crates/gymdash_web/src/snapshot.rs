//! Render snapshot of the session.
//!
//! The session lives in a `RefCell` shared with background tasks, so views
//! never borrow it directly. After every input, and on a short timer for
//! what background tasks change, the app copies what it renders into a
//! [`Snapshot`] and only touches its signals when that differs.

use gymdash::form::SelectOption;
use gymdash::session::{Content, SessionState};
use gymdash::shaders::SHADER_KEYS;
use gymdash::tooltips::TooltipCard;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderState {
    pub label: &'static str,
    pub color: &'static str,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub feed_visible: bool,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterEntry {
    pub name: String,
    pub picked: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterState {
    pub open: bool,
    pub multi: bool,
    pub instructions: String,
    pub order: String,
    pub entries: Vec<CharacterEntry>,
    pub confirm_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub header: HeaderState,
    pub content: Content,
    pub selector: Vec<SelectOption>,
    pub selected: String,
    pub characters: CharacterState,
    pub tooltip: Option<TooltipCard>,
    pub shaders: Vec<(&'static str, bool)>,
    pub shader_all: bool,
    pub credentials_warning: bool,
    pub credentials_success: bool,
}

impl Snapshot {
    pub fn of(state: &SessionState) -> Self {
        let status = &state.status;
        let modal = &state.characters;
        let characters = if modal.is_open() {
            CharacterState {
                open: true,
                multi: modal.is_multi(),
                instructions: modal.instructions(),
                order: modal.order_text(),
                entries: modal
                    .roster()
                    .iter()
                    .map(|name| CharacterEntry {
                        name: name.clone(),
                        picked: modal.is_picked(name),
                        disabled: modal.is_disabled(name),
                    })
                    .collect(),
                confirm_enabled: modal.confirm_enabled(),
            }
        } else {
            CharacterState::default()
        };

        Self {
            header: HeaderState {
                label: status.label(),
                color: status.color(),
                start_enabled: status.start_enabled(),
                stop_enabled: status.stop_enabled(),
                feed_visible: status.feed_visible(),
                title: status.document_title(),
            },
            content: state.content.clone(),
            selector: state.selector.options(),
            selected: state.selector.selected().to_string(),
            characters,
            tooltip: state.tooltips.opened(),
            shaders: SHADER_KEYS
                .into_iter()
                .map(|key| (key, state.shaders.get(key).unwrap_or(false)))
                .collect(),
            shader_all: state.shaders.all(),
            credentials_warning: state.settings.warning_visible(),
            credentials_success: state.settings.success_visible(),
        }
    }
}

/// Position in the log stream already written to the page.
///
/// Lines are counted from the start of the stream, so lines evicted from the
/// bounded view are still accounted for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogCursor {
    written: u64,
}

/// New log lines to write to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDelta {
    /// Oldest first.
    pub append: Vec<String>,
    pub scroll: bool,
}

impl LogCursor {
    /// Lines pushed since the last call, or `None` when nothing changed.
    pub fn catch_up(&mut self, state: &SessionState) -> Option<LogDelta> {
        let logs = &state.logs;
        let total = logs.dropped() + logs.len() as u64;
        if total <= self.written {
            // A smaller total means the view was replaced.
            self.written = total;
            return None;
        }
        let fresh = usize::try_from(total - self.written)
            .unwrap_or(usize::MAX)
            .min(logs.len());
        let append = logs
            .lines()
            .skip(logs.len() - fresh)
            .map(str::to_string)
            .collect();
        self.written = total;
        Some(LogDelta {
            append,
            scroll: logs.is_following(),
        })
    }

    /// Forgets what was written, after the log pane was remounted.
    pub fn reset(&mut self) {
        self.written = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gymdash::api::CharacterRoster;
    use gymdash::logs::LogView;

    #[test]
    fn snapshot_reflects_status_and_modal() {
        let mut state = SessionState::default();
        state.status.set(true, false);
        state.characters.open(CharacterRoster {
            game_type: "double".into(),
            characters: vec!["Ryu".into(), "Ken".into(), "Chun-Li".into()],
        });
        state.characters.toggle("Ken");
        state.characters.toggle("Ryu");

        let snapshot = Snapshot::of(&state);
        assert!(snapshot.header.stop_enabled);
        assert!(!snapshot.header.start_enabled);
        assert!(snapshot.characters.open);
        assert!(snapshot.characters.multi);
        assert!(snapshot.characters.confirm_enabled);
        assert_eq!(snapshot.characters.order, "1st: Ken, 2nd: Ryu");
        let chun = &snapshot.characters.entries[2];
        assert!(chun.disabled && !chun.picked);
        assert_eq!(snapshot.shaders.len(), SHADER_KEYS.len());
        assert_eq!(snapshot.selected, "default");
    }

    #[test]
    fn cursor_appends_only_new_lines() {
        let mut state = SessionState::default();
        state.logs = LogView::with_capacity(3);
        let mut cursor = LogCursor::default();
        assert_eq!(cursor.catch_up(&state), None);

        state.logs.push("a");
        state.logs.push("b");
        assert_eq!(cursor.catch_up(&state).unwrap().append, vec!["a", "b"]);
        assert_eq!(cursor.catch_up(&state), None);

        for line in ["c", "d", "e", "f", "g"] {
            state.logs.push(line);
        }
        let delta = cursor.catch_up(&state).unwrap();
        assert_eq!(delta.append, vec!["e", "f", "g"]);
        assert!(delta.scroll);
    }

    #[test]
    fn cursor_restarts_after_a_fresh_view() {
        let mut state = SessionState::default();
        let mut cursor = LogCursor::default();
        state.logs.push("old");
        cursor.catch_up(&state);

        state.logs = LogView::default();
        assert_eq!(cursor.catch_up(&state), None);
        state.logs.push("new");
        assert_eq!(cursor.catch_up(&state).unwrap().append, vec!["new"]);
    }
}
