//! Types for the fetcher module.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, ParseOptions, ParseStats};
use crate::config::RemoteConfig;

/// Where a catalog update should come from, as requested by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "location", rename_all = "snake_case")]
pub enum CatalogSource {
    /// Pick the configured full or diff list automatically.
    #[default]
    Auto,
    /// An explicit HTTP(S) locator.
    Remote(String),
    /// An explicit local file.
    File(PathBuf),
}

impl CatalogSource {
    /// Interpret a user-supplied string: empty means `Auto`, anything starting
    /// with `http` is remote, everything else a local path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            Self::Auto
        } else if raw.starts_with("http") {
            Self::Remote(raw.to_string())
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Resolve into a concrete fetch target.
    ///
    /// `Auto` yields the full list when `full_required` is set and the diff
    /// list otherwise. Explicit sources always load a full catalog.
    pub fn resolve(&self, remote: &RemoteConfig, full_required: bool) -> FetchTarget {
        match self {
            Self::Auto if full_required => {
                FetchTarget::full(FetchLocation::Remote(remote.full_url.clone()))
            }
            Self::Auto => FetchTarget::diff(FetchLocation::Remote(remote.diff_url.clone())),
            Self::Remote(url) => FetchTarget::full(FetchLocation::Remote(url.clone())),
            Self::File(path) => FetchTarget::full(FetchLocation::File(path.clone())),
        }
    }

    /// The explicit location, if any.
    pub fn location(&self) -> Option<FetchLocation> {
        match self {
            Self::Auto => None,
            Self::Remote(url) => Some(FetchLocation::Remote(url.clone())),
            Self::File(path) => Some(FetchLocation::File(path.clone())),
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Remote(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Whether a payload is a complete catalog or a patch against a recent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Full,
    Diff,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Diff => "diff",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchLocation {
    Remote(String),
    File(PathBuf),
}

impl fmt::Display for FetchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A concrete payload to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchTarget {
    pub kind: FetchKind,
    pub location: FetchLocation,
}

impl FetchTarget {
    pub fn full(location: FetchLocation) -> Self {
        Self {
            kind: FetchKind::Full,
            location,
        }
    }

    pub fn diff(location: FetchLocation) -> Self {
        Self {
            kind: FetchKind::Diff,
            location,
        }
    }
}

/// One fetch attempt.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Update cycle this fetch belongs to.
    pub run_id: String,
    pub target: FetchTarget,
    /// Bounds the entries retained while parsing.
    pub options: ParseOptions,
}

/// Progress update while a payload is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchProgress {
    pub run_id: String,
    /// Bytes read so far.
    pub bytes_read: u64,
    /// Payload size, when announced by the source.
    pub total_bytes: Option<u64>,
}

/// A parsed payload.
#[derive(Debug, Clone)]
pub struct FetchedCatalog {
    pub catalog: Catalog,
    pub stats: ParseStats,
    /// Raw payload size.
    pub bytes: u64,
}
