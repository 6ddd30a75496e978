//! Remote application catalog.
//!
//! The catalog maps an application name to the locator of the repository that
//! publishes its releases:
//!
//! ```json
//! {
//!   "foo": { "link": "someone/foo", "description": "Does foo things" },
//!   "bar": { "sourceLocator": "someone/bar" }
//! }
//! ```
//!
//! It is fetched once per command and never cached across runs. Lookups are
//! by exact name; a miss is [`CmamError::AppNotInCatalog`], which is a normal
//! negative answer and is kept distinct from a failed fetch
//! ([`CmamError::CatalogUnavailable`]) or a broken payload
//! ([`CmamError::CatalogMalformed`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::SUGGESTION_MAX_DISTANCE;
use crate::core::{CmamError, Result};
use crate::utils::fs::check_path_component;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Application name, unique within the catalog
    pub name: String,
    /// Opaque locator understood by the release transport, e.g. `owner/repo`
    pub source_locator: String,
    /// Optional human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(alias = "sourceLocator", alias = "source_locator")]
    link: String,
    #[serde(default)]
    description: Option<String>,
}

/// A fetched catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Parse the catalog JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::CatalogMalformed`] if the payload is not a JSON
    /// object of entries, or an entry has an empty locator. Entries whose
    /// name is not a plain file name are skipped with a warning, since the
    /// name becomes the artifact file name under `bin/`.
    pub fn from_json(payload: &str) -> Result<Self> {
        let raw: BTreeMap<String, RawEntry> =
            serde_json::from_str(payload).map_err(|e| CmamError::CatalogMalformed {
                reason: e.to_string(),
            })?;

        let mut entries = BTreeMap::new();
        for (name, entry) in raw {
            if let Err(e) = check_path_component("application name", &name) {
                warn!("Skipping catalog entry: {}", e);
                continue;
            }
            let locator = entry.link.trim();
            if locator.is_empty() {
                return Err(CmamError::CatalogMalformed {
                    reason: format!("entry '{name}' has an empty link"),
                });
            }
            entries.insert(
                name.clone(),
                CatalogEntry {
                    name,
                    source_locator: locator.to_string(),
                    description: entry.description.filter(|d| !d.trim().is_empty()),
                },
            );
        }

        Ok(Self { entries })
    }

    /// Build a catalog from entries directly.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    /// Look up `name` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`CmamError::AppNotInCatalog`], with the closest name as a
    /// suggestion when one is within a small edit distance.
    pub fn resolve(&self, name: &str) -> Result<&CatalogEntry> {
        self.entries.get(name).ok_or_else(|| CmamError::AppNotInCatalog {
            name: name.to_string(),
            suggestion: self.closest(name),
        })
    }

    /// Non-failing lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Whether `name` is in the catalog.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Case-insensitive substring search over names and descriptions.
    /// An empty query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&CatalogEntry> {
        let query = query.trim().to_lowercase();
        self.entries
            .values()
            .filter(|entry| {
                query.is_empty()
                    || entry.name.to_lowercase().contains(&query)
                    || entry
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// All entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn closest(&self, name: &str) -> Option<String> {
        let needle = name.to_lowercase();
        self.entries
            .keys()
            .map(|candidate| (strsim::levenshtein(&needle, &candidate.to_lowercase()), candidate))
            .filter(|(distance, _)| *distance <= SUGGESTION_MAX_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "foo": { "link": "x/foo", "description": "The foo tool" },
        "bar": { "sourceLocator": "x/bar" },
        "foobar": { "link": "x/foobar", "description": "" }
    }"#;

    #[test]
    fn test_parse_and_resolve() {
        let catalog = Catalog::from_json(PAYLOAD).unwrap();
        assert_eq!(catalog.len(), 3);

        let foo = catalog.resolve("foo").unwrap();
        assert_eq!(foo.source_locator, "x/foo");
        assert_eq!(foo.description.as_deref(), Some("The foo tool"));

        assert_eq!(catalog.resolve("bar").unwrap().source_locator, "x/bar");
        assert!(catalog.get("foobar").unwrap().description.is_none());
    }

    #[test]
    fn test_lookup_is_exact() {
        let catalog = Catalog::from_json(PAYLOAD).unwrap();
        let err = catalog.resolve("Foo").unwrap_err();
        match err {
            CmamError::AppNotInCatalog { name, suggestion } => {
                assert_eq!(name, "Foo");
                assert_eq!(suggestion.as_deref(), Some("foo"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_suggestion_for_distant_names() {
        let catalog = Catalog::from_json(PAYLOAD).unwrap();
        let err = catalog.resolve("completely-different").unwrap_err();
        assert!(matches!(err, CmamError::AppNotInCatalog { suggestion: None, .. }));
    }

    #[test]
    fn test_malformed_payloads() {
        for payload in ["not json", "[]", r#"{"foo": "x/foo"}"#, r#"{"foo": {"link": "  "}}"#] {
            let err = Catalog::from_json(payload).unwrap_err();
            assert!(
                matches!(err, CmamError::CatalogMalformed { .. }),
                "expected CatalogMalformed for {payload}"
            );
        }
    }

    #[test]
    fn test_path_like_names_are_skipped() {
        let payload = r#"{
            "../escape": { "link": "x/escape" },
            "nested/tool": { "link": "x/nested" },
            "..": { "link": "x/dots" },
            "ok": { "link": "x/ok" }
        }"#;
        let catalog = Catalog::from_json(payload).unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve("ok").unwrap().source_locator, "x/ok");
        assert!(matches!(
            catalog.resolve("../escape").unwrap_err(),
            CmamError::AppNotInCatalog { .. }
        ));
    }

    #[test]
    fn test_search() {
        let catalog = Catalog::from_json(PAYLOAD).unwrap();
        let names = |q: &str| catalog.search(q).iter().map(|e| e.name.clone()).collect::<Vec<_>>();

        assert_eq!(names("FOO"), vec!["foo", "foobar"]);
        assert_eq!(names("tool"), vec!["foo"]);
        assert_eq!(names("").len(), 3);
        assert!(names("zzz").is_empty());
    }
}
