//! Infodex Client Library
//!
//! Access layer for user records kept in an Elasticsearch-compatible engine.
//!
//! ```rust,no_run
//! use infodex_rs::{CallContext, Client, FilterExpr, SearchOptions, SortSpec};
//!
//! # async fn run() -> infodex_rs::Result<()> {
//! let client = Client::new("http://127.0.0.1:9200")?;
//! let ctx = CallContext::background();
//!
//! let adults = client
//!     .search(
//!         &ctx,
//!         &FilterExpr::between("age", 35, 36),
//!         &SearchOptions::new().sort(SortSpec::desc("age")),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod context;

pub use client::Client;
pub use context::CallContext;
pub use infodex_core::response::InfoResponse as EngineInfo;
pub use infodex_core::{
    ClientConfig, FilterExpr, Page, RangeBounds, SearchOptions, SortOrder, SortSpec, UserRecord,
};
pub use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("connection to engine failed: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("document {id} already exists")]
    Conflict { id: i64 },

    #[error("failed to encode request: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("failed to decode response: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error("request timed out")]
    Timeout,

    #[error("request cancelled")]
    Cancelled,

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Connection(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
