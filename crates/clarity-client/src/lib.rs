//! `clarity-client` — typed async client for Clarity-style LIMS REST APIs.
//!
//! The LIMS is modeled as three operations behind the [`LimsClient`] trait:
//! fetch one entity by uri, fetch a batch of uris, and submit a routing
//! request. Entities come back as immutable snapshots of a tagged wire
//! union ([`Entity`]), cross-referencing each other by uri only.
//!
//! # Architecture
//!
//! ```text
//! LimsClient (trait)        ← fetch / fetch_many / submit_routing
//!     │
//!     ├── HttpLimsClient    ← reqwest + basic auth; status → error taxonomy
//!     │
//!     └── EntityCache       ← uri-keyed read-through memo over any client;
//!                             shared by concurrent history walks
//! ```
//!
//! Higher-level operations (history traversal, batched routing, sample
//! lookups) live in `clarity-core` and are written purely against the
//! trait, so they are testable with in-memory clients.

pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use cache::EntityCache;
pub use client::{LimsClient, RoutingAction};
pub use error::LimsError;
pub use http::{HttpLimsClient, HttpSettings};
pub use types::{
    is_file_uri, limsid, strip_state, Artifact, ArtifactKind, Entity, Generation, InputOutputMap,
    Process, Project, Sample, Step,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LimsError>;
