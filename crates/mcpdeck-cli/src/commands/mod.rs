//! Command handlers grouped by collection.

pub(crate) mod markets;
pub(crate) mod servers;
