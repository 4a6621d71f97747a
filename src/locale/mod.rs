//! Scoped switching of the process locale and locale-aware date parsing.
//!
//! The C locale is process-global and shared by every thread. Nothing here
//! locks it: if several threads may open a [LocaleScope] at the same time, the
//! caller has to serialize them.

mod sys;

use std::ffi::CString;
use std::marker::PhantomData;

use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// Why a date string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("time data {input:?} does not match format {format:?}")]
    NoMatch { input: String, format: String },

    #[error("unconverted data remains: {0:?}")]
    TrailingInput(String),

    #[error("{0:?} is not a valid calendar date and time")]
    OutOfRange(String),

    #[error("date string or format contains a NUL byte")]
    InteriorNul,

    #[error("directive %{0} is not supported, zone names can not be mapped to an offset")]
    UnsupportedDirective(char),
}

/// A parsed date and time. It carries the offset read from the input when the
/// format contains `%z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDateTime {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl ParsedDateTime {
    /// The wall-clock date and time as written in the input.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Self::Naive(datetime) => *datetime,
            Self::Aware(datetime) => datetime.naive_local(),
        }
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            Self::Naive(_) => None,
            Self::Aware(datetime) => Some(*datetime.offset()),
        }
    }
}

impl From<NaiveDateTime> for ParsedDateTime {
    fn from(datetime: NaiveDateTime) -> Self {
        Self::Naive(datetime)
    }
}

impl From<DateTime<FixedOffset>> for ParsedDateTime {
    fn from(datetime: DateTime<FixedOffset>) -> Self {
        Self::Aware(datetime)
    }
}

/// Holds the locale that was active before [enter](LocaleScope::enter) and
/// puts it back when dropped.
///
/// The guard cannot be sent to another thread, so it is always dropped on the
/// thread that entered it.
#[must_use = "the previous locale is restored as soon as the scope is dropped"]
#[derive(Debug)]
pub struct LocaleScope {
    previous: Option<CString>,
    _not_send: PhantomData<*const ()>,
}

impl LocaleScope {
    /// Switches every locale category to `name`.
    ///
    /// A name the system does not know is ignored and whatever locale is
    /// active stays in effect.
    pub fn enter(name: &str) -> Self {
        let previous = sys::query();
        match CString::new(name) {
            Ok(requested) if sys::set(&requested) => {
                tracing::trace!(locale = name, "switched locale");
            }
            _ => tracing::debug!(locale = name, "locale not available, keeping current one"),
        }
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for LocaleScope {
    fn drop(&mut self) {
        if let Some(previous) = &self.previous
            && !sys::set(previous)
        {
            tracing::warn!(locale = ?previous, "failed to restore locale");
        }
    }
}

/// The name of the active locale, as reported for all categories.
pub fn current_locale() -> Option<String> {
    sys::query().map(|name| name.to_string_lossy().into_owned())
}

/// Runs `f` with the locale switched to `name`.
pub fn with_locale<R>(name: &str, f: impl FnOnce() -> R) -> R {
    let _scope = LocaleScope::enter(name);
    f()
}

/// The conversion characters of `format`, without `%%` and the `E`/`O`
/// modifiers.
fn directives(format: &str) -> impl Iterator<Item = char> + '_ {
    let mut chars = format.chars();
    std::iter::from_fn(move || {
        while let Some(c) = chars.next() {
            if c != '%' {
                continue;
            }
            let mut directive = chars.next()?;
            if matches!(directive, 'E' | 'O') {
                directive = chars.next()?;
            }
            if directive != '%' {
                return Some(directive);
            }
        }
        None
    })
}

/// Parses `input` against the strftime-style `format` with the month and
/// weekday names of locale `locale`.
///
/// Fields the format does not mention default to 1900-01-01 00:00:00, and the
/// whole input has to be consumed. A `%z` in the format makes the result
/// [Aware](ParsedDateTime::Aware); `%Z` is refused, since a zone name alone
/// does not say which offset applies.
pub fn strptime(input: &str, format: &str, locale: &str) -> Result<ParsedDateTime, ParseError> {
    let mut with_offset = false;
    for directive in directives(format) {
        match directive {
            'Z' => return Err(ParseError::UnsupportedDirective('Z')),
            'z' => with_offset = true,
            _ => {}
        }
    }

    let _scope = LocaleScope::enter(locale);
    sys::strptime(input, format, with_offset)
}
