//! New-entry detection against a prior URL snapshot.

use std::time::Instant;

use rayon::prelude::*;
use tracing::debug;

use super::{Catalog, UrlSnapshot};

/// Flag every entry whose URL is absent from `prior` as new.
///
/// All flags are reset first. Returns the number of flagged entries and sets
/// `catalog.had_updates` accordingly. Runs in parallel over the entries, so
/// call it from a blocking context for large catalogs.
pub fn mark_new(catalog: &mut Catalog, prior: &UrlSnapshot) -> usize {
    let started = Instant::now();

    let count: usize = catalog
        .entries
        .par_iter_mut()
        .map(|entry| {
            entry.is_new = !prior.contains(&entry.url);
            usize::from(entry.is_new)
        })
        .sum();

    catalog.had_updates = count > 0;
    debug!("mark_new() took {:?}, {} new entries", started.elapsed(), count);
    count
}
