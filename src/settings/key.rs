//! Cache keys for settings overlays.
use super::Settings;
use crate::config_file::Overlay;

use std::collections::BTreeSet;
use std::fmt;

use sha2::{Digest, Sha256};

const DEFAULT_KEY: &str = "default";

/// Identifies the effective content of an overlay. Equal overlays always map
/// to equal keys, whatever order their options were written in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_KEY
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Strings are quoted and escaped so that no value can run into the next one.
fn quote(value: &str) -> String {
    format!("{:?}", value)
}

fn format_tokens(tokens: &BTreeSet<String>) -> String {
    let joined = tokens.iter().map(|t| quote(t)).collect::<Vec<_>>().join(", ");
    format!("[{}]", joined)
}

impl Overlay {
    /// The overridden options as `(name, value)` pairs, values in their
    /// canonical text form.
    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::new();
        if let Some(v) = self.prefer_dates_from {
            entries.push(("PREFER_DATES_FROM", v.to_string()));
        }
        if let Some(v) = self.support_before_common_era {
            entries.push(("SUPPORT_BEFORE_COMMON_ERA", v.to_string()));
        }
        if let Some(v) = self.prefer_day_of_month {
            entries.push(("PREFER_DAY_OF_MONTH", v.to_string()));
        }
        if let Some(v) = &self.skip_tokens {
            entries.push(("SKIP_TOKENS", format_tokens(v)));
        }
        if let Some(v) = &self.timezone {
            entries.push(("TIMEZONE", quote(v)));
        }
        if let Some(v) = self.return_as_timezone_aware {
            entries.push(("RETURN_AS_TIMEZONE_AWARE", v.to_string()));
        }
        if let Some(v) = self.relative_base {
            let value = v.map_or_else(|| "null".to_string(), |dt| dt.to_string());
            entries.push(("RELATIVE_BASE", value));
        }
        entries
    }

    /// Shorthand for [Settings::get_key].
    pub fn cache_key(&self) -> CacheKey {
        Settings::get_key(Some(self))
    }
}

impl Settings {
    /// Derives the cache key of `overlay`.
    ///
    /// An absent or empty overlay is `"default"`. Anything else is the hex
    /// SHA-256 digest of its `NAME-value` strings, sorted and concatenated.
    /// String values are written quoted, so token lists like `["a, b"]` and
    /// `["a", "b"]` stay apart.
    pub fn get_key(overlay: Option<&Overlay>) -> CacheKey {
        let entries = overlay.map(Overlay::entries).unwrap_or_default();
        if entries.is_empty() {
            return CacheKey(DEFAULT_KEY.to_string());
        }

        let mut parts = entries
            .into_iter()
            .map(|(name, value)| format!("{}-{}", name, value))
            .collect::<Vec<_>>();
        parts.sort();

        let digest = Sha256::digest(parts.concat().as_bytes());
        CacheKey(format!("{:x}", digest))
    }
}
