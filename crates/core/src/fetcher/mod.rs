//! Catalog fetcher - retrieves a full or diff catalog from a remote source
//! or a local file and parses it into a [`Catalog`](crate::catalog::Catalog).
//!
//! A fetcher performs exactly one attempt per call; retrying is up to the
//! update orchestrator.

mod error;
mod http;
mod traits;
mod types;

pub use error::FetchError;
pub use http::{build_client, HttpCatalogFetcher};
pub use traits::CatalogFetcher;
pub use types::{
    CatalogSource, FetchKind, FetchLocation, FetchProgress, FetchRequest, FetchTarget,
    FetchedCatalog,
};
