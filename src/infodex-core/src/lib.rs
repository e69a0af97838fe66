//! Infodex Core Library
//!
//! This crate provides the engine-independent pieces of infodex:
//! - The `UserRecord` data model
//! - The `FilterExpr` algebra and its compiler to the engine query DSL
//! - Search body construction (sort, projection, paging)
//! - Wire types for engine responses
//! - Client and engine configuration

pub mod config;
pub mod filter;
pub mod models;
pub mod query;
pub mod response;

// Re-export commonly used types
pub use config::{ClientConfig, EngineConfig};
pub use filter::{FilterExpr, RangeBounds};
pub use models::*;
pub use query::{DeleteByQueryBody, SearchBody};
