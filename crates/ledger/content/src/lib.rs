//! Data-driven ledger content.
//!
//! Loads the item catalog from RON and the authority configuration from TOML.
//! Content is read once at startup; the resulting catalog is sealed before it
//! reaches the authority.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, ContentFactory, ItemLoader, LoadResult};
