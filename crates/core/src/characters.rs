//! Character selection modal.
//!
//! `double` games take exactly two picks, everything else exactly one. Picks
//! keep click order, and the confirmed picks are written to the characters
//! control joined by `", "`.

use std::rc::Rc;

use crate::api::{Backend, CharacterRoster};
use crate::environment::{CHARACTERS_ID, GAME_SELECT_ID};
use crate::error::DashError;
use crate::session::{Component, NoticeLevel, Session};

const DOUBLE: &str = "double";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterModal {
    open: bool,
    game_type: String,
    roster: Vec<String>,
    picks: Vec<String>,
}

fn plural(n: usize) -> &'static str {
    if n > 1 {
        "s"
    } else {
        ""
    }
}

impl CharacterModal {
    pub fn open(&mut self, roster: CharacterRoster) {
        self.game_type = roster.game_type;
        self.roster = roster.characters;
        self.picks.clear();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn picks(&self) -> &[String] {
        &self.picks
    }

    pub fn max_picks(&self) -> usize {
        if self.game_type == DOUBLE {
            2
        } else {
            1
        }
    }

    /// Checkboxes for `double` games, radio buttons otherwise.
    pub fn is_multi(&self) -> bool {
        self.max_picks() > 1
    }

    pub fn is_picked(&self, name: &str) -> bool {
        self.picks.iter().any(|p| p == name)
    }

    /// Unpicked entries lock once the multi-select is full. Radio entries
    /// never lock; a new pick replaces the old one.
    pub fn is_disabled(&self, name: &str) -> bool {
        self.is_multi() && !self.is_picked(name) && self.picks.len() >= self.max_picks()
    }

    pub fn confirm_enabled(&self) -> bool {
        self.picks.len() == self.max_picks()
    }

    /// Clicks an entry. Returns whether the picks changed.
    pub fn toggle(&mut self, name: &str) -> bool {
        if !self.open || !self.roster.iter().any(|c| c == name) {
            return false;
        }
        if !self.is_multi() {
            if self.is_picked(name) {
                return false;
            }
            self.picks = vec![name.to_string()];
            return true;
        }
        if let Some(pos) = self.picks.iter().position(|p| p == name) {
            self.picks.remove(pos);
            return true;
        }
        if self.is_disabled(name) {
            return false;
        }
        self.picks.push(name.to_string());
        true
    }

    pub fn instructions(&self) -> String {
        let n = self.max_picks();
        format!("Please select {n} character{}.", plural(n))
    }

    pub fn order_text(&self) -> String {
        match (self.picks.as_slice(), self.is_multi()) {
            ([], _) => "No characters selected yet.".to_string(),
            ([first], true) => format!("1st: {first}"),
            ([first, second, ..], true) => format!("1st: {first}, 2nd: {second}"),
            ([first, ..], false) => format!("Selected: {first}"),
        }
    }

    /// Closes the modal and returns the joined picks, or the warning to show
    /// when the count is wrong.
    pub fn confirm(&mut self) -> Result<String, String> {
        let n = self.max_picks();
        if self.picks.len() != n {
            return Err(format!("Please select exactly {n} character{}.", plural(n)));
        }
        self.open = false;
        Ok(self.picks.join(", "))
    }
}

pub struct CharacterPicker<B> {
    session: Session,
    backend: Rc<B>,
}

impl<B> Clone for CharacterPicker<B> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B: Backend> CharacterPicker<B> {
    pub fn new(session: Session, backend: Rc<B>) -> Self {
        Self { session, backend }
    }

    pub fn attach(&self) {
        self.session.update(|s| {
            s.attach(Component::CharacterPicker);
            s.characters.close();
        });
    }

    pub fn detach(&self) {
        self.session.update(|s| {
            s.detach(Component::CharacterPicker);
            s.characters.close();
        });
    }

    /// Fetches the roster of the selected game and opens the modal.
    pub async fn open(&self) -> Result<(), DashError> {
        let game = self.session.with(|s| {
            s.form
                .field_by_id(GAME_SELECT_ID)
                .map(|f| f.value().to_string())
                .unwrap_or_default()
        });
        if game.is_empty() {
            let text = "Please select a game first.";
            self.session.notify(NoticeLevel::Warning, text);
            return Err(DashError::Rejected(text.to_string()));
        }

        match self.backend.characters(&game).await {
            Ok(roster) => {
                tracing::debug!(
                    game,
                    game_type = %roster.game_type,
                    count = roster.characters.len(),
                    "opening character selection"
                );
                self.session.update(|s| s.characters.open(roster));
                Ok(())
            }
            Err(e) => {
                tracing::error!(game, error = %e, "failed to fetch character data");
                Err(e.into())
            }
        }
    }

    pub fn toggle(&self, name: &str) -> bool {
        self.session.update(|s| s.characters.toggle(name))
    }

    pub fn close(&self) {
        self.session.update(|s| s.characters.close());
    }

    pub fn confirm(&self) -> Result<String, DashError> {
        self.session.update(|s| match s.characters.confirm() {
            Ok(joined) => {
                match s.form.field_by_id_mut(CHARACTERS_ID) {
                    Some(field) => {
                        field.set_value(&joined);
                    }
                    None => tracing::warn!("characters control missing"),
                }
                Ok(joined)
            }
            Err(text) => {
                s.notify(NoticeLevel::Warning, text.clone());
                Err(DashError::Rejected(text))
            }
        })
    }
}
