//! Diff merge engine.
//!
//! Applies a diff catalog onto a base catalog. Each diff entry either replaces
//! its matching base entry in place or is appended; replacement is atomic per
//! entry. Afterwards the base takes over the diff's metadata and is re-sorted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Catalog, CatalogEntry};

/// How diff entries are matched against base entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Match the entry's `index_hint` (position in the full list the diff was
    /// generated against) with the `source_index` base entries recorded when
    /// that list was parsed, falling back to URL equality.
    ByIndex,
    /// URL equality only.
    ByUrl,
}

impl MatchStrategy {
    pub fn from_flag(match_by_index: bool) -> Self {
        if match_by_index {
            Self::ByIndex
        } else {
            Self::ByUrl
        }
    }
}

/// What a merge did to the base catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Base entries replaced by a diff entry.
    pub replaced: usize,
    /// Diff entries without a match, appended to the base.
    pub appended: usize,
    /// Base entries dropped because another position now holds their URL.
    pub dropped_duplicates: usize,
}

/// Merge `diff` into `base`.
///
/// On return `base` holds no duplicate URLs, carries the diff's metadata and
/// is sorted in display order; `diff` is left empty. An empty diff leaves
/// `base` untouched, metadata included.
pub fn merge(base: &mut Catalog, diff: &mut Catalog, strategy: MatchStrategy) -> MergeStats {
    let mut stats = MergeStats::default();
    if diff.is_empty() {
        debug!("Empty diff, catalog unchanged");
        diff.clear();
        return stats;
    }

    let mut slots: Vec<Option<CatalogEntry>> = base.entries.drain(..).map(Some).collect();
    let mut by_url: HashMap<String, usize> = HashMap::with_capacity(slots.len());
    let mut by_position: HashMap<u32, usize> = HashMap::new();
    for (pos, slot) in slots.iter_mut().enumerate() {
        let Some(entry) = slot.as_ref() else { continue };
        if by_url.contains_key(&entry.url) {
            *slot = None;
            stats.dropped_duplicates += 1;
            continue;
        }
        by_url.insert(entry.url.clone(), pos);
        if let Some(index) = entry.source_index {
            by_position.insert(index, pos);
        }
    }

    for mut entry in diff.entries.drain(..) {
        let existing = by_url.get(&entry.url).copied();
        let target = match strategy {
            MatchStrategy::ByIndex => entry
                .index_hint
                .and_then(|hint| by_position.get(&hint).copied())
                .or(existing),
            MatchStrategy::ByUrl => existing,
        };

        // the diff is authoritative: its URL may live in one slot only
        if let Some(pos) = existing.filter(|&pos| Some(pos) != target) {
            if let Some(stale) = slots[pos].take() {
                forget_position(&mut by_position, &stale, pos);
                stats.dropped_duplicates += 1;
            }
        }

        let hint = entry.index_hint.take();
        match target {
            Some(pos) => {
                let previous = slots[pos].take();
                if let Some(old) = &previous {
                    if by_url.get(&old.url) == Some(&pos) {
                        by_url.remove(&old.url);
                    }
                    forget_position(&mut by_position, old, pos);
                }
                entry.source_index = hint.or(previous.and_then(|old| old.source_index));
                remember(&mut by_url, &mut by_position, &entry, pos);
                slots[pos] = Some(entry);
                stats.replaced += 1;
            }
            None => {
                entry.source_index = hint;
                remember(&mut by_url, &mut by_position, &entry, slots.len());
                slots.push(Some(entry));
                stats.appended += 1;
            }
        }
    }

    base.entries = slots.into_iter().flatten().collect();
    base.meta = std::mem::take(&mut diff.meta);
    base.sort();
    diff.clear();

    debug!(
        "Merged diff: replaced={}, appended={}, dropped_duplicates={}, total={}",
        stats.replaced,
        stats.appended,
        stats.dropped_duplicates,
        base.len()
    );

    stats
}

fn remember(
    by_url: &mut HashMap<String, usize>,
    by_position: &mut HashMap<u32, usize>,
    entry: &CatalogEntry,
    pos: usize,
) {
    by_url.insert(entry.url.clone(), pos);
    if let Some(index) = entry.source_index {
        by_position.insert(index, pos);
    }
}

fn forget_position(by_position: &mut HashMap<u32, usize>, entry: &CatalogEntry, pos: usize) {
    if let Some(index) = entry.source_index {
        if by_position.get(&index) == Some(&pos) {
            by_position.remove(&index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogMeta;
    use std::collections::HashSet;

    fn entry(url: &str, title: &str) -> CatalogEntry {
        CatalogEntry::new("ARD", "topic", title, url)
    }

    fn hinted(url: &str, title: &str, hint: u32) -> CatalogEntry {
        CatalogEntry {
            index_hint: Some(hint),
            ..entry(url, title)
        }
    }

    fn meta(id: &str) -> CatalogMeta {
        CatalogMeta {
            generated_at: None,
            id: id.to_string(),
            version: String::new(),
        }
    }

    /// Source list `[u3, u1, u2]`, held sorted as `[u1, u2, u3]`.
    fn base() -> Catalog {
        let source = [("u3", "c"), ("u1", "a"), ("u2", "b")];
        let entries = source
            .iter()
            .zip(0u32..)
            .map(|(&(url, title), index)| CatalogEntry {
                source_index: Some(index),
                ..entry(url, title)
            })
            .collect();
        let mut catalog = Catalog::with_entries(meta("base"), entries);
        catalog.sort();
        catalog
    }

    fn assert_unique(catalog: &Catalog) {
        let urls: HashSet<_> = catalog.entries.iter().map(|e| &e.url).collect();
        assert_eq!(urls.len(), catalog.len(), "duplicate URLs after merge");
    }

    fn titles(catalog: &Catalog) -> Vec<&str> {
        catalog.entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn test_merge_by_url_replaces_and_appends() {
        let mut base = base();
        let mut diff = Catalog::with_entries(
            meta("diff"),
            vec![entry("u2", "b-updated"), entry("u4", "d")],
        );

        let stats = merge(&mut base, &mut diff, MatchStrategy::ByUrl);

        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.appended, 1);
        assert_eq!(base.len(), 4);
        let u2 = base.entries.iter().find(|e| e.url == "u2").unwrap();
        assert_eq!(u2.title, "b-updated");
        assert_eq!(u2.source_index, Some(2));
        assert_eq!(base.id(), "diff");
        assert!(diff.is_empty());
        assert_unique(&base);
    }

    #[test]
    fn test_merge_empty_diff_leaves_base_untouched() {
        let mut merged = base();
        merged.meta.generated_at = Some(chrono::Utc::now());
        let expected = merged.clone();

        let stats = merge(&mut merged, &mut Catalog::new(), MatchStrategy::ByIndex);

        assert_eq!(stats, MergeStats::default());
        assert_eq!(merged, expected);
        assert_eq!(merged.id(), "base");
        assert!(merged.generated_at().is_some());
    }

    #[test]
    fn test_merge_by_index_matches_source_position() {
        let mut base = base();
        // source position 0 holds u3, although u1 sorts first
        let mut diff = Catalog::with_entries(meta("diff"), vec![hinted("u9", "z", 0)]);

        let stats = merge(&mut base, &mut diff, MatchStrategy::ByIndex);

        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.appended, 0);
        assert_eq!(titles(&base), vec!["a", "b", "z"]);
        let u9 = base.entries.iter().find(|e| e.url == "u9").unwrap();
        assert_eq!(u9.source_index, Some(0));
        assert_eq!(u9.index_hint, None);
    }

    #[test]
    fn test_merge_by_index_falls_back_to_url() {
        let mut base = base();
        let mut diff = Catalog::with_entries(
            meta("diff"),
            vec![hinted("u3", "c-updated", 42), entry("u1", "a-updated")],
        );

        let stats = merge(&mut base, &mut diff, MatchStrategy::ByIndex);

        assert_eq!(stats.replaced, 2);
        assert_eq!(base.len(), 3);
        assert_eq!(titles(&base), vec!["a-updated", "b", "c-updated"]);
    }

    #[test]
    fn test_merge_by_index_drops_stale_copy_of_url() {
        let mut base = base();
        // u3 moves to u1's source position; its old slot must not survive
        let mut diff = Catalog::with_entries(meta("diff"), vec![hinted("u3", "c-moved", 1)]);

        let stats = merge(&mut base, &mut diff, MatchStrategy::ByIndex);

        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.dropped_duplicates, 1);
        assert_unique(&base);
        assert_eq!(titles(&base), vec!["b", "c-moved"]);
    }

    #[test]
    fn test_merge_appended_entry_takes_its_hint_as_position() {
        let mut base = base();
        let mut first = Catalog::with_entries(meta("d1"), vec![hinted("u7", "g", 7)]);
        merge(&mut base, &mut first, MatchStrategy::ByIndex);

        let mut second = Catalog::with_entries(meta("d2"), vec![hinted("u8", "h", 7)]);
        let stats = merge(&mut base, &mut second, MatchStrategy::ByIndex);

        assert_eq!(stats.replaced, 1);
        assert_eq!(titles(&base), vec!["a", "b", "c", "h"]);
    }

    #[test]
    fn test_merge_last_diff_occurrence_wins() {
        let mut base = base();
        let mut diff = Catalog::with_entries(
            meta("diff"),
            vec![entry("u5", "first"), entry("u5", "second")],
        );

        merge(&mut base, &mut diff, MatchStrategy::ByUrl);

        let u5: Vec<_> = base.entries.iter().filter(|e| e.url == "u5").collect();
        assert_eq!(u5.len(), 1);
        assert_eq!(u5[0].title, "second");
        assert_unique(&base);
    }

    #[test]
    fn test_merge_deduplicates_base() {
        let mut base = Catalog::with_entries(
            meta("base"),
            vec![entry("u1", "a"), entry("u1", "a-dup")],
        );
        let mut diff = Catalog::with_entries(meta("diff"), vec![entry("u2", "b")]);

        let stats = merge(&mut base, &mut diff, MatchStrategy::ByUrl);

        assert_eq!(stats.dropped_duplicates, 1);
        assert_eq!(base.len(), 2);
        assert_eq!(base.entries[0].title, "a");
    }

    #[test]
    fn test_strategy_from_flag() {
        assert_eq!(MatchStrategy::from_flag(true), MatchStrategy::ByIndex);
        assert_eq!(MatchStrategy::from_flag(false), MatchStrategy::ByUrl);
    }
}
