#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
//! Client-side list synchronization for MCP tool servers, markets and market tools.
//!
//! # Design
//! - [`store::EntityStore`] owns one collection snapshot per resource; every
//!   mutation replaces the snapshot wholesale.
//! - [`query::QueryCoordinator`] decides between cached and network reads and
//!   schedules forced refreshes when the search term or filters change.
//! - [`sync::CollectionSync`] wraps remote mutations in the optimistic
//!   apply/commit/rollback protocol and returns outcomes as values.
//! - [`job_gate::JobGate`] rate-limits long-running background jobs with
//!   per-collection cooldown locks.
//! - [`normalize`] and [`projection`] keep the persisted compatibility view
//!   well-formed across schema versions.

pub mod config;
pub mod entity;
pub mod error;
pub mod job_gate;
pub mod market_tools;
pub mod mutation;
pub mod normalize;
pub mod persistence;
pub mod projection;
pub mod query;
pub mod remote;
pub mod store;
pub mod sync;
#[cfg(test)]
pub mod testing;

pub use config::SyncConfig;
pub use entity::{Editable, Entity, Toggleable};
pub use error::{ConfigError, PersistError, ValidationError};
pub use job_gate::{JobGate, JobTicket};
pub use market_tools::MarketToolsSync;
pub use mutation::{Failure, FailureKind, MutationOutcome, Operation};
pub use persistence::{FileStore, KeyValueStore, MemoryStore};
pub use projection::CompatibilityMirror;
pub use query::{QueryCoordinator, Resolution, ViewQuery};
pub use remote::{MarketToolsRemote, RemoteCollection, RemoteError};
pub use store::{EntityStore, PendingMutation, Snapshot, SnapshotObserver};
pub use sync::{CollectionSync, LoadOutcome, Page};
