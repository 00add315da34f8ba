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
//! Shared wire DTOs for the mcpdeck tool-management API.
//!
//! These types are re-used by the sync core, the HTTP client and the CLI so the
//! JSON contract with the backend lives in exactly one place. Field names follow
//! the backend's `camelCase` payloads.

mod compat;
mod entities;
mod envelopes;
mod ids;

pub use compat::CompatServer;
pub use entities::{Market, MarketDraft, MarketTool, ToolKind, ToolServer, ToolServerDraft};
pub use envelopes::{AckEnvelope, DataEnvelope, ListEnvelope};
pub use ids::{EntityId, EntityStatus};
