#![deny(missing_docs)]

//! # Format Registry
//!
//! Process-wide map from a normalized format name to a string predicate.
//! Lookup normalizes by lower-casing and stripping `-`, so `date-time`,
//! `dateTime`, and `DATETIME` all hit the same entry. Unknown formats are
//! not an error; callers accept them silently.
//!
//! The strongly-typed format implementations (UUID, IP, ...) live
//! outside this crate; the registry only carries their predicates.

use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A string-format predicate.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Process-wide registry of named string formats.
pub struct FormatRegistry {
    formats: RwLock<HashMap<String, FormatPredicate>>,
}

/// Normalizes a format name: lower-cased, `-` stripped.
pub fn normalize_format_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        FormatRegistry {
            formats: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a predicate under a normalized name. Re-registering an
    /// identical entry is a no-op; a differing predicate wins.
    pub fn register(&self, name: &str, predicate: FormatPredicate) {
        let key = normalize_format_name(name);
        let mut formats = self.formats.write();
        if let Some(existing) = formats.get(&key) {
            if Arc::ptr_eq(existing, &predicate) {
                return;
            }
        }
        formats.insert(key, predicate);
    }

    /// Looks up a predicate; lookup is case-insensitive and `-`-blind.
    pub fn lookup(&self, name: &str) -> Option<FormatPredicate> {
        self.formats
            .read()
            .get(&normalize_format_name(name))
            .cloned()
    }

    /// True when a format is registered under the normalized name.
    pub fn contains(&self, name: &str) -> bool {
        self.formats
            .read()
            .contains_key(&normalize_format_name(name))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn regex_predicate(pattern: &'static str) -> FormatPredicate {
    // Compiled lazily, once per predicate.
    let cell: Arc<OnceLock<Option<Regex>>> = Arc::new(OnceLock::new());
    Arc::new(move |input: &str| {
        cell.get_or_init(|| Regex::new(pattern).ok())
            .as_ref()
            .is_some_and(|regex| regex.is_match(input))
    })
}

/// Returns the process-wide registry, seeding default formats on first use.
pub fn global_formats() -> &'static FormatRegistry {
    static GLOBAL: OnceLock<FormatRegistry> = OnceLock::new();
    GLOBAL.get_or_init(|| {
        let registry = FormatRegistry::new();
        seed_defaults(&registry);
        registry
    })
}

fn seed_defaults(registry: &FormatRegistry) {
    registry.register(
        "date-time",
        regex_predicate(
            r"^\d{4}-\d{2}-\d{2}[Tt]\d{2}:\d{2}:\d{2}(\.\d+)?([Zz]|[+-]\d{2}:\d{2})$",
        ),
    );
    registry.register("date", regex_predicate(r"^\d{4}-\d{2}-\d{2}$"));
    registry.register(
        "uuid",
        regex_predicate(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"),
    );
    registry.register(
        "email",
        regex_predicate(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"),
    );
    registry.register(
        "byte",
        regex_predicate(r"^[A-Za-z0-9+/]*={0,2}$"),
    );
    registry.register("ipv4", Arc::new(|s: &str| s.parse::<std::net::Ipv4Addr>().is_ok()));
    registry.register("ipv6", Arc::new(|s: &str| s.parse::<std::net::Ipv6Addr>().is_ok()));
    registry.register(
        "uri",
        regex_predicate(r"^[A-Za-z][A-Za-z0-9+.-]*://[^\s]+$"),
    );
}
