//! Shared types for the web search plugin.
//!
//! These types form the contract between the host runtime and the search
//! pipeline:
//!
//! - [`WebSearchResult`]: the canonical shape every search produces, success or failure
//! - [`WebSearchError`] / [`ErrorKind`]: the typed error envelope embedded in a result
//! - [`AuthRecord`]: one provider's credentials as handed over by the host auth store
//! - [`Provider`]: the supported upstream providers

pub mod auth;
pub mod provider;
pub mod result;

pub use auth::AuthRecord;
pub use provider::{ParseProviderError, Provider};
pub use result::{ErrorKind, Source, WebSearchError, WebSearchResult, WebSource};
