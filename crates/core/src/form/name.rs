use std::fmt;
use std::str::FromStr;

use crate::error::FieldNameError;

/// Top-level groups of the training form. The wire names are shared with the
/// backend and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    TrainingConfig,
    Hyperparameters,
    EnvSettings,
    WrapperSettings,
}

impl Section {
    pub fn as_str(self) -> &'static str {
        match self {
            Section::TrainingConfig => "training_config",
            Section::Hyperparameters => "hyperparameters",
            Section::EnvSettings => "env_settings",
            Section::WrapperSettings => "wrapper_settings",
        }
    }

    pub fn all() -> &'static [Section] {
        &[
            Section::TrainingConfig,
            Section::Hyperparameters,
            Section::EnvSettings,
            Section::WrapperSettings,
        ]
    }
}

impl FromStr for Section {
    type Err = FieldNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::all()
            .iter()
            .copied()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| FieldNameError::UnknownSection(s.to_string()))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed binding of a form control to a config slot.
///
/// Parsed once from the `section[key]` (scalar) or `section[key][]` (repeated)
/// name attribute when a form is mounted; everything downstream works with the
/// typed value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldName {
    pub section: Section,
    pub key: String,
    pub repeated: bool,
}

impl FieldName {
    pub fn new(section: Section, key: impl Into<String>) -> Self {
        Self {
            section,
            key: key.into(),
            repeated: false,
        }
    }

    pub fn repeated(section: Section, key: impl Into<String>) -> Self {
        Self {
            section,
            key: key.into(),
            repeated: true,
        }
    }

    pub fn training(key: impl Into<String>) -> Self {
        Self::new(Section::TrainingConfig, key)
    }

    pub fn hyper(key: impl Into<String>) -> Self {
        Self::new(Section::Hyperparameters, key)
    }

    pub fn env(key: impl Into<String>) -> Self {
        Self::new(Section::EnvSettings, key)
    }

    pub fn wrapper(key: impl Into<String>) -> Self {
        Self::new(Section::WrapperSettings, key)
    }
}

impl FromStr for FieldName {
    type Err = FieldNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let shape = || FieldNameError::Shape(s.to_string());

        let open = s.find('[').ok_or_else(shape)?;
        let (section, rest) = s.split_at(open);
        let (key, repeated) = if let Some(key) = rest.strip_suffix("][]") {
            (&key[1..], true)
        } else if let Some(key) = rest.strip_suffix(']') {
            (&key[1..], false)
        } else {
            return Err(shape());
        };
        if key.contains('[') || key.contains(']') {
            return Err(shape());
        }
        let key = key.trim();
        if key.is_empty() {
            return Err(FieldNameError::EmptyKey(s.to_string()));
        }

        Ok(FieldName {
            section: section.trim().parse()?,
            key: key.to_string(),
            repeated,
        })
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.section, self.key)?;
        if self.repeated {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_and_repeated_names() {
        let scalar: FieldName = "hyperparameters[n_steps]".parse().unwrap();
        assert_eq!(scalar, FieldName::hyper("n_steps"));

        let repeated: FieldName = "wrapper_settings[filter_keys][]".parse().unwrap();
        assert_eq!(
            repeated,
            FieldName::repeated(Section::WrapperSettings, "filter_keys")
        );
        assert_eq!(repeated.to_string(), "wrapper_settings[filter_keys][]");
    }

    #[test]
    fn rejects_malformed_names() {
        assert_eq!(
            "n_steps".parse::<FieldName>(),
            Err(FieldNameError::Shape("n_steps".into()))
        );
        assert_eq!(
            "settings[n_steps]".parse::<FieldName>(),
            Err(FieldNameError::UnknownSection("settings".into()))
        );
        assert_eq!(
            "env_settings[]".parse::<FieldName>(),
            Err(FieldNameError::EmptyKey("env_settings[]".into()))
        );
        assert!("env_settings[a][b]".parse::<FieldName>().is_err());
    }

    #[test]
    fn section_names_round_trip() {
        for section in Section::all() {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), *section);
        }
    }
}
