//! # billscope
//!
//! Browse U.S. Congress bills and members from the terminal, with LLM-written
//! overviews of bill summaries.
//!
//! ## Features
//!
//! - **Enrichment**: each summary gets an AI overview, and optionally simulated
//!   Democratic and Republican perspectives, with a fixed fallback sentence for
//!   every case where the model is not called
//! - **Latest wins**: an `EnrichmentSession` drops results of superseded attempts
//! - **Cached data**: internal data API responses are kept in sled for an hour
//! - **Provider**: Gemini via rstructor

pub mod agent;
pub mod cache;
pub mod config;
pub mod congress;
pub mod display;
pub mod enrich;
pub mod sanitize;
pub mod summary;
pub mod viewer;

pub use agent::{AiClient, Completion, GeminiAgent, Viewpoint};
pub use config::Config;
pub use congress::{Bill, CongressApi, Member};
pub use enrich::{enrich, EnrichmentMode, EnrichmentResult, EnrichmentSession};
pub use summary::Summary;
