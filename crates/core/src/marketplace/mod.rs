//! Extension marketplace abstraction.
//!
//! This module provides a `MarketplaceClient` trait for searching the
//! extension gallery and fetching package byte streams, plus the concrete
//! Visual Studio Marketplace gallery implementation.

mod gallery;
mod types;

pub use gallery::GalleryClient;
pub use types::*;
