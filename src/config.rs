//! Binding options and their TOML representation.
//!
//! ```toml
//! debounce = 250
//! events = ["change", "blur", "keydown", "submit"]
//! direction = "FROM_FORM | TO_FORM"
//! auto_notify = true
//! ```
//!
//! Every key is optional; missing keys fall back to [`Preset::Formul8`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR: &str = "formul8";
const OPTIONS_FILE: &str = "options.toml";

bitflags! {
    /// Which way values propagate between a form and its value view.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Direction: u8 {
        /// Form edits update the value snapshot and fire the change event.
        const FROM_FORM = 1;
        /// Writes through the value view update the form.
        const TO_FORM = 2;
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::FROM_FORM | Direction::TO_FORM
    }
}

/// Default option sets of the two binder flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    /// One-way binder: 250ms debounce, no `reset` event, form → object only.
    FormFactor,
    /// Two-way binder: no debounce, `reset` included, both directions.
    #[default]
    Formul8,
}

impl Preset {
    pub fn options(self) -> BindOptions {
        match self {
            Preset::FormFactor => BindOptions {
                debounce: 250,
                events: events(&["change", "blur", "keydown", "submit"]),
                direction: Direction::FROM_FORM,
                auto_notify: true,
            },
            Preset::Formul8 => BindOptions {
                debounce: 0,
                events: events(&["change", "blur", "keydown", "submit", "reset"]),
                direction: Direction::FROM_FORM | Direction::TO_FORM,
                auto_notify: true,
            },
        }
    }
}

fn events(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Options accepted by [`Binder::bind`](crate::binding::Binder::bind).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BindOptions {
    /// Quiet period in milliseconds before form edits are propagated
    pub debounce: u64,
    /// DOM event types that restart the debounce timer
    pub events: Vec<String>,
    /// Active propagation direction(s)
    pub direction: Direction,
    /// Whether writes through the value view dispatch the change event
    pub auto_notify: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Preset::default().options()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid options: {0}")]
    Invalid(String),
}

impl BindOptions {
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce)
    }

    pub fn with_debounce(mut self, millis: u64) -> Self {
        self.debounce = millis;
        self
    }

    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_auto_notify(mut self, auto_notify: bool) -> Self {
        self.auto_notify = auto_notify;
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: BindOptions = toml::from_str(content)?;
        options.validate()?;
        debug!("Parsed bind options: {:?}", options);
        Ok(options)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reads and validates an options file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading bind options from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    /// Rejects an empty direction and blank event names. An empty event list
    /// is allowed: the form is then only read once, at bind time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.direction.is_empty() {
            return Err(ConfigError::Invalid(
                "direction must include FROM_FORM, TO_FORM or both".to_string(),
            ));
        }
        if let Some(blank) = self.events.iter().position(|e| e.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "event name at position {} is blank",
                blank
            )));
        }
        Ok(())
    }
}

/// `<config dir>/formul8/options.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(CONFIG_DIR);
        path.push(OPTIONS_FILE);
        path
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn default_is_two_way_preset() {
        let options = BindOptions::default();
        assert_eq!(options.debounce, 0);
        assert_eq!(options.events.len(), 5);
        assert!(options.events.contains(&"reset".to_string()));
        assert_eq!(options.direction, Direction::FROM_FORM | Direction::TO_FORM);
        assert!(options.auto_notify);
    }

    #[test]
    fn form_factor_preset_is_one_way() {
        let options = Preset::FormFactor.options();
        assert_eq!(options.debounce_duration(), Duration::from_millis(250));
        assert_eq!(options.events, vec!["change", "blur", "keydown", "submit"]);
        assert_eq!(options.direction, Direction::FROM_FORM);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let options = BindOptions::from_toml_str("debounce = 100\nauto_notify = false\n").unwrap();
        assert_eq!(options.debounce, 100);
        assert!(!options.auto_notify);
        assert_eq!(options.events, BindOptions::default().events);
    }

    #[test]
    fn direction_parses_from_flag_names() {
        let options = BindOptions::from_toml_str("direction = \"TO_FORM\"").unwrap();
        assert_eq!(options.direction, Direction::TO_FORM);
    }

    #[test]
    fn toml_round_trip() {
        let options = Preset::FormFactor.options();
        let text = options.to_toml_string().unwrap();
        assert_eq!(BindOptions::from_toml_str(&text).unwrap(), options);
    }

    #[rstest]
    #[case("events = [\"change\", \" \"]")]
    #[case("events = [\"\"]")]
    fn blank_event_names_are_rejected(#[case] content: &str) {
        assert!(matches!(
            BindOptions::from_toml_str(content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn empty_direction_is_rejected() {
        let options = BindOptions::default().with_direction(Direction::empty());
        assert!(matches!(options.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            BindOptions::from_toml_str("debounce = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OPTIONS_FILE);
        tokio::fs::write(&path, "debounce = 50\nevents = [\"input\"]\n")
            .await
            .unwrap();

        let options = BindOptions::load(&path).await.unwrap();
        assert_eq!(options.debounce, 50);
        assert_eq!(options.events, vec!["input"]);
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BindOptions::load(dir.path().join("missing.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn default_path_ends_with_options_file() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("formul8/options.toml"));
        }
    }
}
