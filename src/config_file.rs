//! This module provides the bundled default settings resource and the [Overlay]
//! type used to override parts of it.
use crate::settings::{PreferDatesFrom, PreferDayOfMonth, Settings, SettingsError};

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};

// Keeps an explicit `null` apart from a missing key.
fn deserialize_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A partial set of settings supplied by a caller. Every field left as `None`
/// keeps the value of the [Settings] the overlay is applied to.
///
/// Option names are spelled the way the resource file spells them
/// (`PREFER_DATES_FROM`, `TIMEZONE`, ...). Unknown names are rejected.
#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(deny_unknown_fields)]
pub struct Overlay {
    pub prefer_dates_from: Option<PreferDatesFrom>,
    pub support_before_common_era: Option<bool>,
    pub prefer_day_of_month: Option<PreferDayOfMonth>,
    pub skip_tokens: Option<BTreeSet<String>>,
    pub timezone: Option<String>,
    pub return_as_timezone_aware: Option<bool>,
    /// `Some(None)` overrides the base with no date at all.
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub relative_base: Option<Option<NaiveDateTime>>,
}

impl Overlay {
    /// Whether no option is overridden.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// This constructs an Overlay from a YAML mapping of option names to values.
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        serde_yaml::from_str::<Self>(yaml).map_err(SettingsError::InvalidOverlay)
    }

    /// This constructs an Overlay from a YAML file.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self, SettingsError> {
        let file = file.as_ref();
        let content = fs::read(file).map_err(|source| SettingsError::Io {
            path: file.to_path_buf(),
            source,
        })?;
        let overlay = Self::from_yaml(&String::from_utf8_lossy(&content))?;
        tracing::debug!(path = %file.display(), "loaded settings overlay");
        Ok(overlay)
    }
}

#[derive(Deserialize)]
struct SettingsResource {
    settings: Settings,
}

/// Parses a settings resource. The `settings` mapping must name every option;
/// other top-level keys are ignored.
pub(crate) fn parse_resource(yaml: &str) -> Result<Settings, serde_yaml::Error> {
    serde_yaml::from_str::<SettingsResource>(yaml).map(|resource| resource.settings)
}

pub(crate) const DEFAULT_SETTINGS: &str = r#"---
settings:
  # == Prefer dates from ==
  # Which period to pick when a date is ambiguous, e.g. a bare weekday.
  # Possible values: current_period, future, past
  PREFER_DATES_FROM: current_period

  # == Support before common era ==
  # Whether years before 1 AD may be produced.
  # Possible values: false, true
  SUPPORT_BEFORE_COMMON_ERA: false

  # == Prefer day of month ==
  # Which day to pick when only a month and year are given.
  # Possible values: current, first, last
  PREFER_DAY_OF_MONTH: current

  # == Skip tokens ==
  # Tokens dropped from the input before parsing.
  SKIP_TOKENS:
    - t

  # == Timezone ==
  # A tz database name or an abbreviation.
  TIMEZONE: UTC

  # == Return as timezone aware ==
  # Whether to attach a timezone when one is found in the input.
  # Possible values: false, true
  RETURN_AS_TIMEZONE_AWARE: false

  # == Relative base ==
  # The date relative expressions count from. Empty means "now".
  RELATIVE_BASE:
"#;

#[cfg(test)]
mod test {
    use super::{DEFAULT_SETTINGS, Overlay, parse_resource};
    use crate::settings::{PreferDatesFrom, SettingsError};

    use chrono::NaiveDate;
    use std::io::Write;

    #[test]
    fn test_bundled_resource_parses() {
        let settings = parse_resource(DEFAULT_SETTINGS).unwrap();
        assert_eq!(settings.timezone(), "UTC");
        assert_eq!(settings.relative_base(), None);
        assert!(settings.skip_tokens().contains("t"));
    }

    #[test]
    fn test_resource_missing_option_is_rejected() {
        let yaml = "settings:\n  TIMEZONE: UTC\n";
        assert!(parse_resource(yaml).is_err());
    }

    #[test]
    fn test_resource_unknown_option_is_rejected() {
        let yaml = format!("{}  LANGUAGES: [en]\n", DEFAULT_SETTINGS);
        assert!(parse_resource(&yaml).is_err());
    }

    #[test]
    fn test_overlay_from_yaml() {
        let overlay = Overlay::from_yaml("TIMEZONE: EST\nPREFER_DATES_FROM: past\n").unwrap();
        assert_eq!(overlay.timezone.as_deref(), Some("EST"));
        assert_eq!(overlay.prefer_dates_from, Some(PreferDatesFrom::Past));
        assert_eq!(overlay.relative_base, None);
        assert!(!overlay.is_empty());
    }

    #[test]
    fn test_overlay_explicit_null_relative_base() {
        let overlay = Overlay::from_yaml("RELATIVE_BASE: null\n").unwrap();
        assert_eq!(overlay.relative_base, Some(None));

        let overlay = Overlay::from_yaml("RELATIVE_BASE: 2020-01-01T10:30:00\n").unwrap();
        let expected = NaiveDate::from_ymd_opt(2020, 1, 1)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        assert_eq!(overlay.relative_base, Some(Some(expected)));
    }

    #[test]
    fn test_overlay_unknown_key_is_rejected() {
        assert!(matches!(
            Overlay::from_yaml("TIMEZON: EST\n"),
            Err(SettingsError::InvalidOverlay(_))
        ));
    }

    #[test]
    fn test_overlay_bad_value_is_rejected() {
        assert!(matches!(
            Overlay::from_yaml("PREFER_DATES_FROM: someday\n"),
            Err(SettingsError::InvalidOverlay(_))
        ));
    }

    #[test]
    fn test_empty_overlay() {
        assert!(Overlay::default().is_empty());
        assert!(Overlay::from_yaml("{}").unwrap().is_empty());
    }

    #[test]
    fn test_overlay_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "SKIP_TOKENS: [t, at]").unwrap();
        let overlay = Overlay::from_file(file.path()).unwrap();
        let tokens = overlay.skip_tokens.unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("at"));
    }

    #[test]
    fn test_overlay_from_missing_file() {
        assert!(matches!(
            Overlay::from_file("/nonexistent/overlay.yaml"),
            Err(SettingsError::Io { .. })
        ));
    }
}
