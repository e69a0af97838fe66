use serde::Serialize;
use serde_json::{Map, Value};

use crate::filter::FilterExpr;
use crate::models::{SearchOptions, SortSpec};

/// SearchBody is the JSON request body of a `_search` call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchBody {
    pub query: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<Value>>,
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl SearchBody {
    pub fn new(filter: &FilterExpr, options: &SearchOptions) -> Self {
        Self {
            query: filter.to_query(),
            sort: options.sort.as_ref().map(|sort| vec![sort_clause(sort)]),
            source: options.projection.clone(),
            from: options.page.map(|page| page.from),
            size: options.page.map(|page| page.size),
        }
    }
}

/// DeleteByQueryBody is the JSON request body of a `_delete_by_query` call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeleteByQueryBody {
    pub query: Value,
}

impl DeleteByQueryBody {
    pub fn new(filter: &FilterExpr) -> Self {
        Self {
            query: filter.to_query(),
        }
    }
}

/// `{"<field>": {"order": "<dir>"}}`
fn sort_clause(sort: &SortSpec) -> Value {
    let mut order = Map::new();
    order.insert(
        "order".to_string(),
        Value::String(sort.order.as_str().to_string()),
    );

    let mut clause = Map::new();
    clause.insert(sort.field.clone(), Value::Object(order));
    Value::Object(clause)
}
