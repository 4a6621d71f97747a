//! Resolution of the `settings` argument accepted by parsing entry points.
//!
//! An entry point takes a [SettingsArg] and works with a concrete [Settings].
//! [apply_settings] wraps such a function so the conversion happens before the
//! body runs:
//!
//! ```
//! use dateparse_settings::{Settings, SettingsArg, SettingsError, apply_settings};
//!
//! let timezone = apply_settings(|(), settings: &Settings| {
//!     Ok::<_, SettingsError>(settings.timezone().to_string())
//! });
//! assert_eq!(timezone((), SettingsArg::Unset)?, "UTC");
//! # Ok::<(), SettingsError>(())
//! ```
use super::{Settings, SettingsError};
use crate::config_file::Overlay;

use std::borrow::Cow;

use serde_yaml::Value;

/// What a caller may pass as `settings`.
#[derive(Clone, Debug, Default)]
pub enum SettingsArg<'a> {
    /// Use the process-wide defaults.
    #[default]
    Unset,
    /// Apply these overrides on top of the defaults.
    Overlay(Overlay),
    /// Use this instance as is.
    Resolved(&'a Settings),
}

impl<'a> SettingsArg<'a> {
    /// Turns the argument into the [Settings] the wrapped code should see.
    pub fn resolve(self) -> Result<Cow<'a, Settings>, SettingsError> {
        match self {
            Self::Unset => Settings::global().map(Cow::Borrowed),
            Self::Overlay(overlay) => Ok(Cow::Owned(Settings::global()?.replace(&overlay))),
            Self::Resolved(settings) => Ok(Cow::Borrowed(settings)),
        }
    }
}

impl From<Overlay> for SettingsArg<'_> {
    fn from(overlay: Overlay) -> Self {
        Self::Overlay(overlay)
    }
}

impl<'a> From<&'a Settings> for SettingsArg<'a> {
    fn from(settings: &'a Settings) -> Self {
        Self::Resolved(settings)
    }
}

impl<'a, T: Into<SettingsArg<'a>>> From<Option<T>> for SettingsArg<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unset, Into::into)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

/// Accepts untyped input: `null` means unset, a mapping is an overlay and
/// anything else is rejected.
impl TryFrom<Value> for SettingsArg<'_> {
    type Error = SettingsError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Unset),
            Value::Mapping(_) => serde_yaml::from_value::<Overlay>(value)
                .map(Self::Overlay)
                .map_err(SettingsError::InvalidOverlay),
            other => Err(SettingsError::InvalidSettingsType(kind_of(&other))),
        }
    }
}

/// Wraps `f` so that it can be called with any [SettingsArg].
///
/// The argument is resolved before `f` runs; if resolution fails `f` is not
/// called at all.
pub fn apply_settings<'a, A, R, E, F>(f: F) -> impl Fn(A, SettingsArg<'a>) -> Result<R, E>
where
    F: Fn(A, &Settings) -> Result<R, E>,
    E: From<SettingsError>,
{
    move |args, settings| {
        let settings = settings.resolve()?;
        f(args, &*settings)
    }
}

/// Resolves `settings` and runs `f` with the result once.
///
/// Anything convertible to a [SettingsArg] is accepted, including an untyped
/// [Value]; a value of the wrong kind fails without running `f`.
pub fn with_settings<'a, S, R, E, F>(settings: S, f: F) -> Result<R, E>
where
    S: TryInto<SettingsArg<'a>>,
    SettingsError: From<S::Error>,
    F: FnOnce(&Settings) -> Result<R, E>,
    E: From<SettingsError>,
{
    let settings = settings
        .try_into()
        .map_err(SettingsError::from)?
        .resolve()?;
    f(&*settings)
}

#[cfg(test)]
mod test {
    use super::{SettingsArg, apply_settings, with_settings};
    use crate::config_file::Overlay;
    use crate::settings::{Settings, SettingsError};

    use std::borrow::Cow;
    use std::cell::Cell;

    use serde_yaml::Value;

    fn settings_arg(yaml: &str) -> Result<SettingsArg<'static>, SettingsError> {
        let value = serde_yaml::from_str::<Value>(yaml).unwrap();
        SettingsArg::try_from(value)
    }

    #[test]
    fn test_unset_resolves_to_default() {
        let resolved = SettingsArg::Unset.resolve().unwrap();
        assert!(resolved.is_default());
        assert!(matches!(resolved, Cow::Borrowed(_)));
    }

    #[test]
    fn test_none_resolves_to_default() {
        let arg = SettingsArg::from(None::<Overlay>);
        assert!(arg.resolve().unwrap().is_default());
        assert!(settings_arg("null").unwrap().resolve().unwrap().is_default());
    }

    #[test]
    fn test_overlay_resolves_to_derived() {
        let resolved = settings_arg("TIMEZONE: EST").unwrap().resolve().unwrap();
        let defaults = Settings::global().unwrap();
        assert_eq!(resolved.timezone(), "EST");
        assert!(!resolved.is_default());
        assert_eq!(resolved.prefer_dates_from(), defaults.prefer_dates_from());
        assert_eq!(resolved.skip_tokens(), defaults.skip_tokens());
    }

    #[test]
    fn test_resolved_passes_through() {
        let custom = Settings::global()
            .unwrap()
            .replace(&Overlay::from_yaml("TIMEZONE: PST").unwrap());
        let resolved = SettingsArg::from(&custom).resolve().unwrap();
        match resolved {
            Cow::Borrowed(s) => assert!(std::ptr::eq(s, &custom)),
            Cow::Owned(_) => panic!("resolved settings were copied"),
        }
    }

    #[test]
    fn test_other_types_are_rejected() {
        assert!(matches!(
            settings_arg("42"),
            Err(SettingsError::InvalidSettingsType("number"))
        ));
        assert!(matches!(
            settings_arg("[TIMEZONE]"),
            Err(SettingsError::InvalidSettingsType("sequence"))
        ));
        assert!(matches!(
            settings_arg("\"UTC\""),
            Err(SettingsError::InvalidSettingsType("string"))
        ));
    }

    #[test]
    fn test_mapping_with_unknown_option_is_rejected() {
        assert!(matches!(
            settings_arg("LANGUAGE: de"),
            Err(SettingsError::InvalidOverlay(_))
        ));
    }

    #[test]
    fn test_wrapper_injects_settings() {
        let describe = apply_settings(|prefix: &'static str, settings: &Settings| {
            Ok::<_, SettingsError>(format!("{}{}", prefix, settings.timezone()))
        });
        assert_eq!(describe("tz=", SettingsArg::Unset).unwrap(), "tz=UTC");
        assert_eq!(
            describe("tz=", settings_arg("TIMEZONE: EST").unwrap()).unwrap(),
            "tz=EST"
        );
    }

    #[test]
    fn test_wrapper_sees_default_marker() {
        let is_default = apply_settings(|(), settings: &Settings| {
            Ok::<_, SettingsError>(settings.is_default())
        });
        assert!(is_default((), SettingsArg::Unset).unwrap());
        assert!(!is_default((), Overlay::default().into()).unwrap());
    }

    #[test]
    fn test_with_settings_fails_before_running() {
        let ran = Cell::new(false);
        let value = serde_yaml::from_str::<Value>("42").unwrap();
        let result = with_settings(value, |_| {
            ran.set(true);
            Ok::<_, SettingsError>(())
        });
        assert!(matches!(result, Err(SettingsError::InvalidSettingsType(_))));
        assert!(!ran.get());
    }

    #[test]
    fn test_with_settings_accepts_typed_arguments() {
        let overlay = Overlay::from_yaml("TIMEZONE: EST").unwrap();
        let tz = with_settings(overlay, |s| Ok::<_, SettingsError>(s.timezone().to_string()));
        assert_eq!(tz.unwrap(), "EST");

        let tz = with_settings(None::<Overlay>, |s| {
            Ok::<_, SettingsError>(s.timezone().to_string())
        });
        assert_eq!(tz.unwrap(), "UTC");
    }

    #[test]
    fn test_wrapped_errors_propagate() {
        #[derive(Debug)]
        enum AppError {
            Settings,
            Body,
        }
        impl From<SettingsError> for AppError {
            fn from(_: SettingsError) -> Self {
                AppError::Settings
            }
        }

        let result = with_settings(SettingsArg::Unset, |_| Err::<(), _>(AppError::Body));
        assert!(matches!(result, Err(AppError::Body)));
    }
}
