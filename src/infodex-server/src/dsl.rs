//! Evaluation of the query DSL subset the access layer emits.
//!
//! Supported: `bool` (must / filter / should / must_not /
//! minimum_should_match), `term`, `terms`, `match`, `range`, `match_all`,
//! `match_none`; sort clauses; `_source` filtering.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Clause keys carrying metadata rather than a field
const META_KEYS: [&str; 2] = ["boost", "_name"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DslError(String);

impl DslError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type Result<T> = std::result::Result<T, DslError>;

/// Check a query's structure without any document to match against
pub fn validate(query: &Value) -> Result<()> {
    matches(query, &Value::Object(Map::new())).map(|_| ())
}

/// Whether `doc` satisfies `query`
pub fn matches(query: &Value, doc: &Value) -> Result<bool> {
    let (kind, body) = single_entry(query, "query")?;

    match kind {
        "match_all" => Ok(true),
        "match_none" => Ok(false),
        "term" => {
            let (field, value) = field_clause(body, "term", "value")?;
            Ok(field_values(doc, field).into_iter().any(|v| term_eq(v, value)))
        }
        "terms" => {
            let (field, values) = field_entry(body, "terms")?;
            let values = values
                .as_array()
                .ok_or_else(|| DslError::new(format!("[terms] query for [{}] requires an array", field)))?;
            Ok(field_values(doc, field)
                .into_iter()
                .any(|v| values.iter().any(|candidate| term_eq(v, candidate))))
        }
        "match" => {
            let (field, text) = field_clause(body, "match", "query")?;
            Ok(field_values(doc, field).into_iter().any(|v| text_match(v, text)))
        }
        "range" => {
            let (field, bounds) = field_entry(body, "range")?;
            let bounds = bounds
                .as_object()
                .ok_or_else(|| DslError::new(format!("[range] query for [{}] requires an object", field)))?;
            Ok(field_values(doc, field)
                .into_iter()
                .any(|v| in_range(v, bounds)))
        }
        "bool" => eval_bool(body, doc),
        other => Err(DslError::new(format!("unknown query [{}]", other))),
    }
}

fn eval_bool(body: &Value, doc: &Value) -> Result<bool> {
    let body = body
        .as_object()
        .ok_or_else(|| DslError::new("[bool] query malformed, expected an object"))?;

    for key in body.keys() {
        match key.as_str() {
            "must" | "filter" | "should" | "must_not" | "minimum_should_match" => {}
            key if META_KEYS.contains(&key) => {}
            other => {
                return Err(DslError::new(format!("[bool] query does not support [{}]", other)))
            }
        }
    }

    // Every clause is evaluated so malformed ones surface even after a miss
    let must = eval_all(clauses(body, "must"), doc)?;
    let filter = eval_all(clauses(body, "filter"), doc)?;
    let must_not = eval_all(clauses(body, "must_not"), doc)?;
    let should = eval_all(clauses(body, "should"), doc)?;

    let required_should = match body.get("minimum_should_match") {
        Some(value) => minimum_should_match(value)?,
        None if must.is_empty() && filter.is_empty() && !should.is_empty() => 1,
        None => 0,
    };

    Ok(must.iter().all(|m| *m)
        && filter.iter().all(|m| *m)
        && !must_not.iter().any(|m| *m)
        && should.iter().filter(|m| **m).count() >= required_should)
}

fn clauses<'a>(body: &'a Map<String, Value>, key: &str) -> Vec<&'a Value> {
    match body.get(key) {
        Some(Value::Array(list)) => list.iter().collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    }
}

fn eval_all(queries: Vec<&Value>, doc: &Value) -> Result<Vec<bool>> {
    queries.into_iter().map(|query| matches(query, doc)).collect()
}

fn minimum_should_match(value: &Value) -> Result<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .map(|n| n as usize)
        .ok_or_else(|| DslError::new(format!("unsupported minimum_should_match [{}]", value)))
}

fn single_entry<'a>(value: &'a Value, what: &str) -> Result<(&'a str, &'a Value)> {
    let entry = value
        .as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.iter().next());

    match entry {
        Some((key, body)) => Ok((key.as_str(), body)),
        None => Err(DslError::new(format!(
            "[{}] malformed, expected an object with a single key",
            what
        ))),
    }
}

/// The one field entry of a leaf query, ignoring `boost` and `_name`
fn field_entry<'a>(body: &'a Value, kind: &str) -> Result<(&'a str, &'a Value)> {
    let object = body
        .as_object()
        .ok_or_else(|| DslError::new(format!("[{}] query malformed, expected an object", kind)))?;

    let mut fields = object
        .iter()
        .filter(|(key, _)| !META_KEYS.contains(&key.as_str()));

    match (fields.next(), fields.next()) {
        (Some((field, value)), None) => Ok((field.as_str(), value)),
        _ => Err(DslError::new(format!(
            "[{}] query requires exactly one field",
            kind
        ))),
    }
}

/// Field entry in either short (`{"f": v}`) or long (`{"f": {"<inner>": v}}`) form
fn field_clause<'a>(body: &'a Value, kind: &str, inner: &str) -> Result<(&'a str, &'a Value)> {
    let (field, value) = field_entry(body, kind)?;
    match value {
        Value::Object(long_form) => long_form
            .get(inner)
            .map(|v| (field, v))
            .ok_or_else(|| DslError::new(format!("[{}] query for [{}] is missing [{}]", kind, field, inner))),
        short_form => Ok((field, short_form)),
    }
}

/// Values at a dotted path, array fields expanded
pub fn field_values<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }

    match current {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        value => vec![value],
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Exact equality with numeric coercion (`"3"` equals `3`)
fn term_eq(doc_value: &Value, query_value: &Value) -> bool {
    match (doc_value, query_value) {
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(a), Value::String(b)) => a.to_string() == *b,
        _ => match (as_number(doc_value), as_number(query_value)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Analyzed match: any shared lowercase token for strings, `term_eq` otherwise
fn text_match(doc_value: &Value, text: &Value) -> bool {
    match (doc_value, text) {
        (Value::String(doc_text), Value::String(query_text)) => {
            let doc_tokens = tokens(doc_text);
            tokens(query_text)
                .iter()
                .any(|token| doc_tokens.contains(token))
        }
        _ => term_eq(doc_value, text),
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => {
            match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y),
                _ => Some(a.cmp(b)),
            }
        }
        _ => match (as_number(a), as_number(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn in_range(value: &Value, bounds: &Map<String, Value>) -> bool {
    bounds.iter().all(|(op, bound)| {
        let ordering = compare_values(value, bound);
        match op.as_str() {
            "gt" => ordering == Some(Ordering::Greater),
            "gte" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            "lt" => ordering == Some(Ordering::Less),
            "lte" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            // format, boost, time_zone and friends do not narrow the range here
            _ => true,
        }
    })
}

/// One sort criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Parse a body `sort` value: a field name, `{"f": "desc"}`,
/// `{"f": {"order": "desc"}}`, or an array of those
pub fn parse_sort(sort: &Value) -> Result<Vec<SortKey>> {
    let items: Vec<&Value> = match sort {
        Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut keys = Vec::new();
    for item in items {
        let (field, order) = match item {
            Value::String(field) => (field.as_str(), "asc"),
            Value::Object(_) => {
                let (field, spec) = single_entry(item, "sort")?;
                let order = match spec {
                    Value::String(order) => order.as_str(),
                    Value::Object(options) => options
                        .get("order")
                        .and_then(Value::as_str)
                        .unwrap_or("asc"),
                    _ => return Err(DslError::new(format!("malformed sort for [{}]", field))),
                };
                (field, order)
            }
            _ => return Err(DslError::new("malformed sort clause")),
        };
        keys.push(sort_key(field, order)?);
    }

    Ok(keys)
}

/// Parse the `sort` query-string parameter: `field[:order][,field[:order]]`
pub fn parse_sort_param(param: &str) -> Result<Vec<SortKey>> {
    param
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once(':') {
            Some((field, order)) => sort_key(field, order),
            None => sort_key(part, "asc"),
        })
        .collect()
}

/// Body form of parsed sort keys, `[{"<field>": {"order": "<dir>"}}]`
pub fn sort_to_value(keys: &[SortKey]) -> Value {
    let clauses = keys
        .iter()
        .map(|key| {
            let mut order = Map::new();
            let direction = if key.descending { "desc" } else { "asc" };
            order.insert("order".to_string(), Value::String(direction.to_string()));

            let mut clause = Map::new();
            clause.insert(key.field.clone(), Value::Object(order));
            Value::Object(clause)
        })
        .collect();
    Value::Array(clauses)
}

fn sort_key(field: &str, order: &str) -> Result<SortKey> {
    let descending = match order {
        "asc" => false,
        "desc" => true,
        other => return Err(DslError::new(format!("unknown sort order [{}]", other))),
    };
    Ok(SortKey {
        field: field.to_string(),
        descending,
    })
}

/// Order two documents; documents missing a sort field go last either way
pub fn compare_docs(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        if key.field == "_score" || key.field == "_doc" {
            continue;
        }

        let left = field_values(a, &key.field).into_iter().next();
        let right = field_values(b, &key.field).into_iter().next();

        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(l), Some(r)) => {
                let natural = compare_values(l, r).unwrap_or(Ordering::Equal);
                if key.descending {
                    natural.reverse()
                } else {
                    natural
                }
            }
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Per-hit sort values, as reported in the `sort` array of a hit
pub fn sort_values(doc: &Value, keys: &[SortKey]) -> Vec<Value> {
    keys.iter()
        .map(|key| {
            field_values(doc, &key.field)
                .into_iter()
                .next()
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect()
}

/// How `_source` is trimmed in hits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    All,
    Nothing,
    Fields {
        includes: Vec<String>,
        excludes: Vec<String>,
    },
}

impl SourceFilter {
    /// Accepts `true` / `false`, a field pattern, an array of patterns, or
    /// `{"includes": .., "excludes": ..}`
    pub fn parse(spec: Option<&Value>) -> Result<Self> {
        match spec {
            None | Some(Value::Null) | Some(Value::Bool(true)) => Ok(SourceFilter::All),
            Some(Value::Bool(false)) => Ok(SourceFilter::Nothing),
            Some(value @ (Value::String(_) | Value::Array(_))) => Ok(SourceFilter::Fields {
                includes: patterns(value)?,
                excludes: Vec::new(),
            }),
            Some(Value::Object(options)) => {
                let includes = match options.get("includes") {
                    Some(value) => patterns(value)?,
                    None => Vec::new(),
                };
                let excludes = match options.get("excludes") {
                    Some(value) => patterns(value)?,
                    None => Vec::new(),
                };
                Ok(SourceFilter::Fields { includes, excludes })
            }
            Some(other) => Err(DslError::new(format!("malformed _source [{}]", other))),
        }
    }

    pub fn apply(&self, source: &Value) -> Option<Value> {
        match self {
            SourceFilter::All => Some(source.clone()),
            SourceFilter::Nothing => None,
            SourceFilter::Fields { includes, excludes } => {
                let object = match source.as_object() {
                    Some(object) => object,
                    None => return Some(source.clone()),
                };
                let kept: Map<String, Value> = object
                    .iter()
                    .filter(|(key, _)| {
                        (includes.is_empty() || includes.iter().any(|p| pattern_matches(p, key)))
                            && !excludes.iter().any(|p| pattern_matches(p, key))
                    })
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Some(Value::Object(kept))
            }
        }
    }
}

fn patterns(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(pattern) => Ok(pattern.split(',').map(|p| p.trim().to_string()).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| DslError::new(format!("malformed _source pattern [{}]", item)))
            })
            .collect(),
        other => Err(DslError::new(format!("malformed _source pattern [{}]", other))),
    }
}

/// Exact field name or a trailing `*` prefix pattern
fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}
