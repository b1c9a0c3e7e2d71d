/// Multi-select checklist of observation filter keys, with a "select all"
/// control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checklist {
    entries: Vec<ChecklistEntry>,
    select_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistEntry {
    pub key: String,
    pub checked: bool,
}

impl Checklist {
    /// Replaces every entry with `keys`, all checked. Earlier exclusions are
    /// discarded.
    pub fn rebuild<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries = keys
            .into_iter()
            .map(|key| ChecklistEntry {
                key: key.into(),
                checked: true,
            })
            .collect();
        self.select_all = true;
    }

    pub fn entries(&self) -> &[ChecklistEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn select_all_checked(&self) -> bool {
        self.select_all
    }

    /// Returns false when `key` is not in the list.
    pub fn set(&mut self, key: &str, checked: bool) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) else {
            return false;
        };
        entry.checked = checked;
        self.select_all = self.entries.iter().all(|e| e.checked);
        true
    }

    pub fn toggle_all(&mut self, checked: bool) {
        for entry in &mut self.entries {
            entry.checked = checked;
        }
        self.select_all = checked;
    }

    /// Checks exactly the listed keys; unknown keys are ignored.
    pub fn restore(&mut self, checked_keys: &[String]) {
        for entry in &mut self.entries {
            entry.checked = checked_keys.contains(&entry.key);
        }
        self.select_all = !self.entries.is_empty() && self.entries.iter().all(|e| e.checked);
    }

    pub fn checked_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.checked)
            .map(|e| e.key.clone())
            .collect()
    }

    pub fn label(&self) -> String {
        format!("Selected ({})", self.entries.iter().filter(|e| e.checked).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_discards_prior_exclusions() {
        let mut list = Checklist::default();
        list.rebuild(["stage", "timer", "health"]);
        assert!(list.set("timer", false));
        assert!(!list.select_all_checked());
        assert_eq!(list.label(), "Selected (2)");

        list.rebuild(["own_health", "opp_health"]);
        assert_eq!(list.checked_keys(), vec!["own_health", "opp_health"]);
        assert!(list.select_all_checked());
    }

    #[test]
    fn toggle_all_and_unknown_keys() {
        let mut list = Checklist::default();
        list.rebuild(["a", "b"]);
        list.toggle_all(false);
        assert!(list.checked_keys().is_empty());
        assert_eq!(list.label(), "Selected (0)");
        assert!(!list.set("missing", true));

        list.restore(&["b".to_string(), "zzz".to_string()]);
        assert_eq!(list.checked_keys(), vec!["b"]);
    }
}
