//! Settings store and locale-scoped parsing for the date parser.
//!
//! [Settings] carries the options that steer parsing. The process-wide default is
//! loaded once from the bundled resource, and per-call variants are derived with
//! [Settings::replace]. [Settings::get_key] gives every overlay a stable
//! [CacheKey] so expensive per-configuration work can be memoized with a
//! [KeyedCache].
//!
//! [locale::strptime] parses a date string under a given C locale inside a
//! [LocaleScope], restoring the previous locale when it returns.

pub mod cache;
pub mod config_file;
pub mod locale;
pub mod settings;

pub use cache::KeyedCache;
pub use config_file::Overlay;
pub use locale::{LocaleScope, ParseError, ParsedDateTime, strptime, with_locale};
pub use settings::inject::{SettingsArg, apply_settings, with_settings};
pub use settings::key::CacheKey;
pub use settings::{PreferDatesFrom, PreferDayOfMonth, Settings, SettingsError};
