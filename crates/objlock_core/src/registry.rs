//! Class isolation registry.
//!
//! Resolves the isolation level configured for a persistent class. The
//! registry can be loaded from a JSON document of the form
//!
//! ```json
//! {
//!   "default": "repeatable",
//!   "classes": {
//!     "Order": "serializable",
//!     "AuditLog": "none"
//!   }
//! }
//! ```
//!
//! Level names are checked at load time. A class that is neither listed nor
//! covered by a default is an error at lookup time rather than a silent
//! fallback to the weakest level.

use crate::error::{LockError, LockResult};
use crate::types::IsolationLevel;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RegistryDocument {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    classes: BTreeMap<String, String>,
}

/// Maps persistent class names to isolation levels.
#[derive(Debug, Clone, Default)]
pub struct IsolationRegistry {
    classes: HashMap<String, IsolationLevel>,
    default: Option<IsolationLevel>,
}

impl IsolationRegistry {
    /// Creates an empty registry without a default level.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level used for classes without their own entry.
    #[must_use]
    pub fn with_default(mut self, level: IsolationLevel) -> Self {
        self.default = Some(level);
        self
    }

    /// Adds or replaces the level of a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>, level: IsolationLevel) -> Self {
        self.register(class, level);
        self
    }

    /// Adds or replaces the level of a class.
    pub fn register(&mut self, class: impl Into<String>, level: IsolationLevel) {
        self.classes.insert(class.into(), level);
    }

    /// Builds a registry from `(class, level name)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Config`] if a level name is unknown.
    pub fn from_pairs<I, C, L>(pairs: I) -> LockResult<Self>
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<String>,
        L: AsRef<str>,
    {
        let mut registry = Self::new();
        for (class, level) in pairs {
            let class = class.into();
            let level = parse_level(&class, level.as_ref())?;
            registry.register(class, level);
        }
        Ok(registry)
    }

    /// Parses a registry from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Serialization`] for malformed JSON and
    /// [`LockError::Config`] for unknown level names.
    pub fn from_json(json: &str) -> LockResult<Self> {
        let doc: RegistryDocument = serde_json::from_str(json)?;
        let mut registry = Self::from_pairs(doc.classes)?;
        if let Some(default) = doc.default {
            registry.default = Some(parse_level("default", &default)?);
        }
        Ok(registry)
    }

    /// Loads a registry from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Io`] if the file cannot be read, otherwise the
    /// errors of [`IsolationRegistry::from_json`].
    pub fn load(path: impl AsRef<Path>) -> LockResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns the isolation level of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::UnknownClass`] when the class is not listed and
    /// no default is configured.
    pub fn resolve(&self, class: &str) -> LockResult<IsolationLevel> {
        self.classes
            .get(class)
            .copied()
            .or(self.default)
            .ok_or_else(|| LockError::unknown_class(class))
    }

    /// Returns the default level, if configured.
    #[must_use]
    pub fn default_level(&self) -> Option<IsolationLevel> {
        self.default
    }

    /// Returns the number of explicitly configured classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no class is configured explicitly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates over the explicitly configured classes.
    pub fn iter(&self) -> impl Iterator<Item = (&str, IsolationLevel)> {
        self.classes.iter().map(|(c, l)| (c.as_str(), *l))
    }
}

fn parse_level(owner: &str, name: &str) -> LockResult<IsolationLevel> {
    name.parse()
        .map_err(|_| LockError::config(format!("{owner}: unknown isolation level {name:?}")))
}
