//! Bindings for the engine's REST responses.
//!
//! The shapes follow the Elasticsearch document, search and delete-by-query
//! APIs. The client only reads the parts it needs, so everything besides the
//! payload defaults when absent (for example when a `filter_path` trims it).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `GET /{index}/_doc/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse<T> {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<T>,
}

/// Response of create and delete calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteResponse {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    /// `created`, `deleted` or `not_found`
    pub result: String,
}

/// Response of `POST /{index}/_search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub hits: Hits<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hits<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<HitsTotal>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub hits: Vec<Hit<T>>,
}

impl<T> Default for Hits<T> {
    fn default() -> Self {
        Self {
            total: None,
            max_score: None,
            hits: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HitsTotal {
    pub value: u64,
    pub relation: HitsTotalRelation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HitsTotalRelation {
    #[serde(rename = "eq")]
    Accurate,
    #[serde(rename = "gte")]
    LowerBound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit<T> {
    #[serde(rename = "_index", default)]
    pub index: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    /// Absent when the search disabled source retrieval
    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
}

/// Response of `POST /{index}/_delete_by_query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteByQueryResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub deleted: u64,
    #[serde(default)]
    pub failures: Vec<Value>,
}

/// Response of `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub cluster_name: String,
    pub version: VersionInfo,
    #[serde(default)]
    pub tagline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub number: String,
}

/// Error body the engine returns with non-success statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorCause,
    pub status: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorCause {
    #[serde(rename = "type")]
    pub error_type: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, error_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            error: ErrorCause {
                error_type: error_type.into(),
                reason: reason.into(),
                index: None,
            },
            status,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.error.index = Some(index.into());
        self
    }

    pub fn is_index_not_found(&self) -> bool {
        self.error.error_type == INDEX_NOT_FOUND
    }
}

pub const INDEX_NOT_FOUND: &str = "index_not_found_exception";
pub const VERSION_CONFLICT: &str = "version_conflict_engine_exception";
pub const PARSING_EXCEPTION: &str = "parsing_exception";
