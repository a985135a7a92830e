//! Catalog payload format.
//!
//! Full lists, diff lists and the durable last-known-good file share one JSON
//! layout: a `meta` header followed by an `entries` array. Inside a payload
//! an entry with an empty `channel` or `topic` inherits the value of the
//! entry before it.

use std::collections::HashSet;
use std::io::Write;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Catalog, CatalogEntry, CatalogMeta};
use crate::config::CatalogConfig;

/// Which entries survive parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Drop entries aired more than this many days ago (0 = keep all).
    pub max_age_days: u32,
    pub load_trailers: bool,
    pub load_audio_description: bool,
    pub load_sign_language: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_age_days: 0,
            load_trailers: true,
            load_audio_description: true,
            load_sign_language: true,
        }
    }
}

impl ParseOptions {
    /// Options that keep entries up to `max_age_days` old.
    pub fn with_max_age_days(max_age_days: u32) -> Self {
        Self {
            max_age_days,
            ..Default::default()
        }
    }

    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.max_age_days > 0).then(|| now - Duration::days(i64::from(self.max_age_days)))
    }

    fn excludes(&self, entry: &CatalogEntry) -> bool {
        (!self.load_trailers && entry.trailer)
            || (!self.load_audio_description && entry.audio_description)
            || (!self.load_sign_language && entry.sign_language)
    }
}

impl From<&CatalogConfig> for ParseOptions {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            max_age_days: config.max_age_days,
            load_trailers: config.load_trailers,
            load_audio_description: config.load_audio_description,
            load_sign_language: config.load_sign_language,
        }
    }
}

/// Counters collected while parsing a payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub read: usize,
    pub kept: usize,
    pub too_old: usize,
    pub filtered: usize,
    pub duplicates: usize,
    pub invalid: usize,
}

#[derive(Deserialize)]
struct RawPayload {
    meta: CatalogMeta,
    entries: Vec<CatalogEntry>,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    meta: &'a CatalogMeta,
    entries: &'a [CatalogEntry],
}

/// Parse a payload into a catalog.
///
/// Entries without a URL are skipped; of several entries sharing a URL the
/// first one wins. Entries of a source list record their position in it as
/// `source_index`; a payload that already carries positions (the durable
/// file) keeps them.
pub fn parse_catalog(
    bytes: &[u8],
    options: &ParseOptions,
    now: DateTime<Utc>,
) -> Result<(Catalog, ParseStats), serde_json::Error> {
    let raw: RawPayload = serde_json::from_slice(bytes)?;
    let cutoff = options.cutoff(now);
    let positioned = raw.entries.iter().any(|e| e.source_index.is_some());

    let mut stats = ParseStats {
        read: raw.entries.len(),
        ..Default::default()
    };
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.entries.len());
    let mut entries = Vec::with_capacity(raw.entries.len());
    let mut channel = String::new();
    let mut topic = String::new();

    for (ordinal, mut entry) in raw.entries.into_iter().enumerate() {
        if !positioned {
            entry.source_index = u32::try_from(ordinal).ok();
        }
        if entry.channel.is_empty() {
            entry.channel.clone_from(&channel);
        } else {
            channel.clone_from(&entry.channel);
        }
        if entry.topic.is_empty() {
            entry.topic.clone_from(&topic);
        } else {
            topic.clone_from(&entry.topic);
        }

        if entry.url.is_empty() {
            stats.invalid += 1;
            continue;
        }
        if let (Some(cutoff), Some(airdate)) = (cutoff, entry.airdate) {
            if airdate < cutoff {
                stats.too_old += 1;
                continue;
            }
        }
        if options.excludes(&entry) {
            stats.filtered += 1;
            continue;
        }
        if !seen.insert(entry.url.clone()) {
            stats.duplicates += 1;
            continue;
        }
        entries.push(entry);
    }

    stats.kept = entries.len();
    debug!(
        "Parsed catalog payload: read={}, kept={}, too_old={}, filtered={}, duplicates={}, invalid={}",
        stats.read, stats.kept, stats.too_old, stats.filtered, stats.duplicates, stats.invalid
    );

    Ok((Catalog::with_entries(raw.meta, entries), stats))
}

/// Serialize a catalog in payload format.
///
/// `human_readable` selects pretty-printed output over the compact form.
pub fn write_catalog<W: Write>(
    writer: W,
    catalog: &Catalog,
    human_readable: bool,
) -> Result<(), serde_json::Error> {
    let payload = PayloadRef {
        meta: &catalog.meta,
        entries: &catalog.entries,
    };
    if human_readable {
        serde_json::to_writer_pretty(writer, &payload)
    } else {
        serde_json::to_writer(writer, &payload)
    }
}

/// Serialize a catalog into a byte buffer.
pub fn encode_catalog(
    catalog: &Catalog,
    human_readable: bool,
) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::new();
    write_catalog(&mut buffer, catalog, human_readable)?;
    Ok(buffer)
}
