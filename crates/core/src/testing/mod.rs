//! Test doubles and fixtures.
//!
//! Compiled into the library so integration tests and downstream crates
//! can drive the pipeline without network access.

mod mock_marketplace;
mod scripted_prompt;

pub use mock_marketplace::{fixtures, MockMarketplaceClient};
pub use scripted_prompt::ScriptedPrompt;
