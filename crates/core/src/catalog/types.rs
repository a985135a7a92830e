//! Types for the film catalog.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One media item of the catalog.
///
/// Identity is the `url`: two entries with the same URL are the same logical
/// item, whatever their other attributes say.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Broadcasting channel (e.g., "ARD", "ZDF").
    #[serde(default)]
    pub channel: String,
    /// Topic / series the item belongs to.
    #[serde(default)]
    pub topic: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Stream URL. Identity key of the entry.
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url_hd: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url_small: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url_subtitle: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,
    /// When the item was aired. Livestreams carry no airdate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airdate: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: u32,
    #[serde(default)]
    pub size_mb: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub hd: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub subtitles: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub sign_language: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub trailer: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub livestream: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub audio_description: bool,
    /// Position of this entry in the full list a diff was generated against.
    /// Only meaningful for diff payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_hint: Option<u32>,
    /// Position of this entry in the source's full list, recorded when the
    /// list was parsed. Diff `index_hint`s are matched against it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_index: Option<u32>,
    /// Set by the new-entry pass; never persisted.
    #[serde(skip)]
    pub is_new: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CatalogEntry {
    /// Create an entry with the identifying fields set.
    pub fn new(
        channel: impl Into<String>,
        topic: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            topic: topic.into(),
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Builder-style airdate setter.
    pub fn with_airdate(mut self, airdate: DateTime<Utc>) -> Self {
        self.airdate = Some(airdate);
        self
    }

    /// Canonical display order: topic, then title, then airdate.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.topic
            .cmp(&other.topic)
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.airdate.cmp(&other.airdate))
    }
}

/// Catalog-level metadata taken from the payload header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMeta {
    /// When the source generated the list (source clock, not ours).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    /// Opaque freshness token.
    #[serde(default)]
    pub id: String,
    /// Payload format version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

/// The set of URLs held by a catalog at some point in time.
pub type UrlSnapshot = HashSet<String>;

/// An ordered collection of entries plus freshness metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub meta: CatalogMeta,
    pub entries: Vec<CatalogEntry>,
    /// Whether the last new-entry pass flagged anything.
    pub had_updates: bool,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog from metadata and entries.
    pub fn with_entries(meta: CatalogMeta, entries: Vec<CatalogEntry>) -> Self {
        Self {
            meta,
            entries,
            had_updates: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Opaque freshness token of this catalog.
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.meta.generated_at
    }

    /// Number of entries flagged as new by the last detection pass.
    pub fn count_new(&self) -> usize {
        self.entries.par_iter().filter(|e| e.is_new).count()
    }

    /// Capture the URLs currently held by the catalog.
    pub fn urls(&self) -> UrlSnapshot {
        self.entries.par_iter().map(|e| e.url.clone()).collect()
    }

    /// Age of the list relative to `now`, if the generation date is known.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.meta.generated_at.map(|generated| now - generated)
    }

    /// Whether the catalog is older than the diff window.
    ///
    /// A catalog without a generation date is always too old: diffs are only
    /// safe against a known, recent base.
    pub fn is_too_old_for_diff(&self, window: Duration, now: DateTime<Utc>) -> bool {
        match self.age(now) {
            Some(age) => age > window,
            None => true,
        }
    }

    /// Sort entries into the canonical display order.
    pub fn sort(&mut self) {
        self.entries.par_sort_by(CatalogEntry::display_cmp);
    }

    /// Drop all entries and metadata.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.meta = CatalogMeta::default();
        self.had_updates = false;
    }

    /// Human readable generation date for log lines.
    pub fn gen_date(&self) -> String {
        self.meta
            .generated_at
            .map(|d| d.format("%d.%m.%Y, %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
