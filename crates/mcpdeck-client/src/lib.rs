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
//! HTTP adapter implementing the remote traits of `mcpdeck-core`.
//!
//! # Design
//! - One [`HttpBackend`] owns the connection pool and base URL; typed views
//!   ([`ServersClient`], [`MarketsClient`]) expose one collection each.
//! - Non-2xx responses become a status-bearing `RemoteError` carrying the
//!   body's `message` when it has one; `success: false` bodies are passed
//!   through as envelopes.

pub mod backend;
pub mod error;
pub mod markets;
pub mod servers;

pub use backend::HttpBackend;
pub use error::{ClientError, ClientResult};
pub use markets::MarketsClient;
pub use servers::ServersClient;
