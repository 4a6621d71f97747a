//! This module defines [Settings], the options that control parsing behavior,
//! together with the process-wide default instance they are derived from.

pub mod inject;
pub mod key;

use crate::cache::KeyedCache;
use crate::config_file::{self, Overlay};

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use once_cell::sync::{Lazy, OnceCell};
use serde::Deserialize;

/// Errors raised while loading or resolving settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings can only be either a mapping or a Settings instance, got {0}")]
    InvalidSettingsType(&'static str),

    #[error("invalid settings overlay: {0}")]
    InvalidOverlay(#[source] serde_yaml::Error),

    #[error("overlay does not specify {0}")]
    IncompleteOverlay(&'static str),

    #[error("bundled settings resource is malformed: {0}")]
    Resource(#[source] serde_yaml::Error),

    #[error("can not read settings file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::convert::Infallible> for SettingsError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Which period an ambiguous date is taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferDatesFrom {
    CurrentPeriod,
    Future,
    Past,
}

impl fmt::Display for PreferDatesFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CurrentPeriod => "current_period",
            Self::Future => "future",
            Self::Past => "past",
        })
    }
}

/// Which day is used when only a month is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferDayOfMonth {
    Current,
    First,
    Last,
}

impl fmt::Display for PreferDayOfMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Current => "current",
            Self::First => "first",
            Self::Last => "last",
        })
    }
}

/// A fully populated set of parsing options.
///
/// Instances are never partial: the default one comes from the bundled resource
/// and every other one is derived from an existing instance with
/// [replace](Settings::replace), which fills anything not overridden.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(deny_unknown_fields)]
pub struct Settings {
    prefer_dates_from: PreferDatesFrom,
    support_before_common_era: bool,
    prefer_day_of_month: PreferDayOfMonth,
    skip_tokens: BTreeSet<String>,
    timezone: String,
    return_as_timezone_aware: bool,
    relative_base: Option<NaiveDateTime>,

    #[serde(skip)]
    is_default: bool,
}

static DEFAULTS: OnceCell<Settings> = OnceCell::new();

/// Parses the bundled resource on first call and hands out the cached result
/// afterwards.
fn load_defaults() -> Result<&'static Settings, SettingsError> {
    DEFAULTS.get_or_try_init(|| {
        let mut settings =
            config_file::parse_resource(config_file::DEFAULT_SETTINGS).map_err(|e| {
                tracing::error!("failed to parse bundled settings: {}", e);
                SettingsError::Resource(e)
            })?;
        settings.is_default = true;
        tracing::debug!(?settings, "loaded default settings");
        Ok(settings)
    })
}

static SHARED_DEFAULTS: OnceCell<Arc<Settings>> = OnceCell::new();
static REGISTRY: Lazy<KeyedCache<Settings>> = Lazy::new(KeyedCache::new);

impl Settings {
    /// The process-wide default instance.
    pub fn global() -> Result<&'static Self, SettingsError> {
        load_defaults()
    }

    /// Builds an instance from scratch.
    ///
    /// Without an overlay this is a copy of the defaults. An overlay has to name
    /// every option, since there is nothing to fill the gaps from; use
    /// [replace](Settings::replace) to override only some of them.
    pub fn new(overlay: Option<&Overlay>) -> Result<Self, SettingsError> {
        let Some(overlay) = overlay else {
            return load_defaults().cloned();
        };

        let relative_base = overlay
            .relative_base
            .ok_or(SettingsError::IncompleteOverlay("RELATIVE_BASE"))?;
        Ok(Self {
            prefer_dates_from: overlay
                .prefer_dates_from
                .ok_or(SettingsError::IncompleteOverlay("PREFER_DATES_FROM"))?,
            support_before_common_era: overlay
                .support_before_common_era
                .ok_or(SettingsError::IncompleteOverlay("SUPPORT_BEFORE_COMMON_ERA"))?,
            prefer_day_of_month: overlay
                .prefer_day_of_month
                .ok_or(SettingsError::IncompleteOverlay("PREFER_DAY_OF_MONTH"))?,
            skip_tokens: overlay
                .skip_tokens
                .clone()
                .ok_or(SettingsError::IncompleteOverlay("SKIP_TOKENS"))?,
            timezone: overlay
                .timezone
                .clone()
                .ok_or(SettingsError::IncompleteOverlay("TIMEZONE"))?,
            return_as_timezone_aware: overlay
                .return_as_timezone_aware
                .ok_or(SettingsError::IncompleteOverlay("RETURN_AS_TIMEZONE_AWARE"))?,
            relative_base,
            is_default: false,
        })
    }

    /// Returns a new instance with the options present in `overrides` replaced
    /// and everything else carried over from `self`.
    pub fn replace(&self, overrides: &Overlay) -> Self {
        Self {
            prefer_dates_from: overrides.prefer_dates_from.unwrap_or(self.prefer_dates_from),
            support_before_common_era: overrides
                .support_before_common_era
                .unwrap_or(self.support_before_common_era),
            prefer_day_of_month: overrides
                .prefer_day_of_month
                .unwrap_or(self.prefer_day_of_month),
            skip_tokens: overrides
                .skip_tokens
                .clone()
                .unwrap_or_else(|| self.skip_tokens.clone()),
            timezone: overrides
                .timezone
                .clone()
                .unwrap_or_else(|| self.timezone.clone()),
            return_as_timezone_aware: overrides
                .return_as_timezone_aware
                .unwrap_or(self.return_as_timezone_aware),
            relative_base: overrides.relative_base.unwrap_or(self.relative_base),
            is_default: false,
        }
    }

    /// The defaults with `overlay` applied, shared between all callers passing an
    /// overlay with the same [CacheKey](key::CacheKey).
    ///
    /// Without an overlay this is the default instance. Any overlay, even an
    /// empty one, yields a derived instance, the same as
    /// [replace](Settings::replace) would.
    pub fn interned(overlay: Option<&Overlay>) -> Result<Arc<Self>, SettingsError> {
        let Some(overlay) = overlay else {
            return SHARED_DEFAULTS
                .get_or_try_init(|| load_defaults().cloned().map(Arc::new))
                .cloned();
        };
        REGISTRY.get_or_try_insert_with(&overlay.cache_key(), || {
            Ok(load_defaults()?.replace(overlay))
        })
    }

    pub fn prefer_dates_from(&self) -> PreferDatesFrom {
        self.prefer_dates_from
    }

    pub fn support_before_common_era(&self) -> bool {
        self.support_before_common_era
    }

    pub fn prefer_day_of_month(&self) -> PreferDayOfMonth {
        self.prefer_day_of_month
    }

    pub fn skip_tokens(&self) -> &BTreeSet<String> {
        &self.skip_tokens
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn return_as_timezone_aware(&self) -> bool {
        self.return_as_timezone_aware
    }

    pub fn relative_base(&self) -> Option<NaiveDateTime> {
        self.relative_base
    }

    /// True only for the instance loaded straight from the bundled defaults.
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}
