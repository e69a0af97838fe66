use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};

use infodex_core::response::{
    ErrorResponse, Hit, Hits, HitsTotal, HitsTotalRelation, SearchResponse, INDEX_NOT_FOUND,
    PARSING_EXCEPTION, VERSION_CONFLICT,
};

use crate::dsl::{self, DslError, SortKey, SourceFilter};

/// Hits returned when a search names no size
pub const DEFAULT_SEARCH_SIZE: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no such index [{0}]")]
    IndexNotFound(String),

    #[error("[{id}]: version conflict, document already exists (current version [{version}])")]
    VersionConflict {
        index: String,
        id: String,
        version: u64,
    },

    #[error("failed to parse: {0}")]
    MapperParsing(String),

    #[error(transparent)]
    Parsing(#[from] DslError),
}

impl EngineError {
    pub fn status(&self) -> u16 {
        match self {
            EngineError::IndexNotFound(_) => 404,
            EngineError::VersionConflict { .. } => 409,
            EngineError::MapperParsing(_) | EngineError::Parsing(_) => 400,
        }
    }

    /// Error body in the engine's wire shape
    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status();
        let reason = self.to_string();
        match self {
            EngineError::IndexNotFound(index) => {
                ErrorResponse::new(status, INDEX_NOT_FOUND, reason).with_index(index.clone())
            }
            EngineError::VersionConflict { index, .. } => {
                ErrorResponse::new(status, VERSION_CONFLICT, reason).with_index(index.clone())
            }
            EngineError::MapperParsing(_) => {
                ErrorResponse::new(status, "mapper_parsing_exception", reason)
            }
            EngineError::Parsing(_) => ErrorResponse::new(status, PARSING_EXCEPTION, reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Search request as parsed from the body and query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub sort: Option<Value>,
    #[serde(rename = "_source", default)]
    pub source: Option<Value>,
    #[serde(default)]
    pub from: Option<usize>,
    #[serde(default)]
    pub size: Option<usize>,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    source: Value,
}

/// In-memory document indices, keyed by index name then document id
#[derive(Debug, Default)]
pub struct MemoryEngine {
    indices: HashMap<String, BTreeMap<String, StoredDocument>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, index: &str) -> usize {
        self.indices.get(index).map(BTreeMap::len).unwrap_or(0)
    }

    /// Create-only indexing; the index is created on first write
    pub fn create(&mut self, index: &str, id: &str, source: Value) -> Result<u64> {
        if !source.is_object() {
            return Err(EngineError::MapperParsing(
                "document source must be a JSON object".to_string(),
            ));
        }

        let documents = self.indices.entry(index.to_string()).or_default();
        if let Some(existing) = documents.get(id) {
            return Err(EngineError::VersionConflict {
                index: index.to_string(),
                id: id.to_string(),
                version: existing.version,
            });
        }

        documents.insert(id.to_string(), StoredDocument { version: 1, source });
        tracing::debug!(index, id, "Document created");
        Ok(1)
    }

    /// Version and source of a document, `None` when the index has no such id
    pub fn get(&self, index: &str, id: &str) -> Result<Option<(u64, &Value)>> {
        let documents = self.index(index)?;
        Ok(documents.get(id).map(|doc| (doc.version, &doc.source)))
    }

    /// Remove a document, returning its version when it existed
    pub fn delete(&mut self, index: &str, id: &str) -> Result<Option<u64>> {
        let documents = self
            .indices
            .get_mut(index)
            .ok_or_else(|| EngineError::IndexNotFound(index.to_string()))?;
        Ok(documents.remove(id).map(|doc| doc.version + 1))
    }

    pub fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResponse<Value>> {
        let started = Instant::now();
        let query = request.query.clone().unwrap_or_else(|| json!({"match_all": {}}));
        dsl::validate(&query)?;

        let sort_keys: Vec<SortKey> = match &request.sort {
            Some(sort) => dsl::parse_sort(sort)?,
            None => Vec::new(),
        };
        let source_filter = SourceFilter::parse(request.source.as_ref())?;
        let documents = self.index(index)?;

        let mut matched = Vec::new();
        for (id, doc) in documents {
            if dsl::matches(&query, &doc.source)? {
                matched.push((id, doc));
            }
        }

        let sorted = !sort_keys.is_empty();
        if sorted {
            matched.sort_by(|a, b| dsl::compare_docs(&a.1.source, &b.1.source, &sort_keys));
        }

        let total = matched.len();
        let from = request.from.unwrap_or(0);
        let size = request.size.unwrap_or(DEFAULT_SEARCH_SIZE);
        // Every match scores the same; sorted searches report no score
        let score = if sorted { None } else { Some(1.0) };

        let hits: Vec<Hit<Value>> = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(id, doc)| Hit {
                index: index.to_string(),
                id: id.clone(),
                score,
                source: source_filter.apply(&doc.source),
                sort: sorted.then(|| dsl::sort_values(&doc.source, &sort_keys)),
            })
            .collect();

        tracing::debug!(index, total, returned = hits.len(), "Search evaluated");

        Ok(SearchResponse {
            took: started.elapsed().as_millis() as u64,
            timed_out: false,
            hits: Hits {
                total: Some(HitsTotal {
                    value: total as u64,
                    relation: HitsTotalRelation::Accurate,
                }),
                max_score: if total > 0 { score } else { None },
                hits,
            },
        })
    }

    /// Remove every document matching `query`, returning how many went away
    pub fn delete_by_query(&mut self, index: &str, query: &Value) -> Result<u64> {
        dsl::validate(query)?;
        let documents = self
            .indices
            .get_mut(index)
            .ok_or_else(|| EngineError::IndexNotFound(index.to_string()))?;

        let mut doomed = Vec::new();
        for (id, doc) in documents.iter() {
            if dsl::matches(query, &doc.source)? {
                doomed.push(id.clone());
            }
        }

        for id in &doomed {
            documents.remove(id);
        }

        tracing::debug!(index, deleted = doomed.len(), "Delete by query evaluated");
        Ok(doomed.len() as u64)
    }

    fn index(&self, index: &str) -> Result<&BTreeMap<String, StoredDocument>> {
        self.indices
            .get(index)
            .ok_or_else(|| EngineError::IndexNotFound(index.to_string()))
    }
}
