//! Help cards behind the `?` icons of the dashboard form.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::api::{Backend, TooltipEntry};
use crate::error::DashError;
use crate::session::{Component, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipCard {
    pub title: String,
    pub description: String,
    pub example: String,
    pub pro_tip: String,
}

fn fallback_title(key: &str) -> String {
    key.replacen('_', " ", 1).to_uppercase()
}

fn or_default(text: &Option<String>, default: &str) -> String {
    text.as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(default)
        .to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tooltips {
    entries: Option<BTreeMap<String, TooltipEntry>>,
    open: Option<String>,
}

impl Tooltips {
    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    pub fn load(&mut self, entries: BTreeMap<String, TooltipEntry>) {
        self.entries = Some(entries);
    }

    pub fn card(&self, key: &str) -> TooltipCard {
        match self.entries.as_ref().and_then(|e| e.get(key)) {
            Some(entry) => TooltipCard {
                title: entry
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| fallback_title(key)),
                description: or_default(&entry.description, "No description available."),
                example: or_default(&entry.example, "No example available."),
                pro_tip: or_default(&entry.pro_tip, "No pro tip available."),
            },
            None => TooltipCard {
                title: fallback_title(key),
                description: "No details available.".to_string(),
                example: String::new(),
                pro_tip: String::new(),
            },
        }
    }

    pub fn open(&mut self, key: &str) {
        if !self.entries.as_ref().is_some_and(|e| e.contains_key(key)) {
            tracing::warn!(key, "tooltip not found");
        }
        self.open = Some(key.to_string());
    }

    pub fn close(&mut self) {
        self.open = None;
    }

    /// Card of the open tooltip, if any.
    pub fn opened(&self) -> Option<TooltipCard> {
        self.open.as_deref().map(|key| self.card(key))
    }
}

pub struct TooltipLoader<B> {
    session: Session,
    backend: Rc<B>,
}

impl<B> Clone for TooltipLoader<B> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            backend: Rc::clone(&self.backend),
        }
    }
}

impl<B: Backend> TooltipLoader<B> {
    pub fn new(session: Session, backend: Rc<B>) -> Self {
        Self { session, backend }
    }

    /// Attaches and fetches the tooltip file unless this session already has
    /// it. A failed fetch is retried on the next attach.
    pub async fn attach(&self) -> Result<(), DashError> {
        let loaded = self.session.update(|s| {
            s.attach(Component::Tooltips);
            s.tooltips.close();
            s.tooltips.is_loaded()
        });
        if loaded {
            return Ok(());
        }
        match self.backend.tooltips().await {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "tooltips loaded");
                self.session.update(|s| s.tooltips.load(entries));
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch tooltips");
                Err(e.into())
            }
        }
    }

    pub fn detach(&self) {
        self.session.update(|s| {
            s.detach(Component::Tooltips);
            s.tooltips.close();
        });
    }

    pub fn open(&self, key: &str) -> TooltipCard {
        self.session.update(|s| {
            s.tooltips.open(key);
            s.tooltips.card(key)
        })
    }

    pub fn close(&self) {
        self.session.update(|s| s.tooltips.close());
    }
}
