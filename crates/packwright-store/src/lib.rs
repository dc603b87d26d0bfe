//! Packwright-Store: Blob Storage and Remote Sources for packwright
//!
//! This crate provides the I/O boundary of the resource-pack build pipeline.
//! Everything that talks to the network or disk lives here behind two async
//! traits, so the pipeline itself stays a pure function of its inputs.
//!
//! ## Key Components
//!
//! - `BlobStore`: keyed, overwritable storage for snapshots, version
//!   records, changelog history and the published artifact
//! - `RemoteSource`: read-only fetch of the source archive and pack metadata
//! - `HttpBlobStore` / `HttpSource`: reqwest-backed implementations
//! - `FsBlobStore`: local directory store
//! - `fakes`: in-memory implementations with fault injection

mod error;
pub mod fakes;
pub mod fs;
pub mod http;
pub mod storage_traits;

pub use error::StoreError;
pub use fs::FsBlobStore;
pub use http::{HttpBlobStore, HttpSource, HttpStoreConfig};
pub use storage_traits::{BlobStore, PutReceipt, RemoteSource, StoreResult};
