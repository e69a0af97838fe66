use serde_json::{Map, Value};

/// Filter expression over document fields, compiled to the engine's
/// boolean query DSL by [`FilterExpr::to_query`].
///
/// `Or` follows the engine's `should` semantics: inside an `And` that also
/// has required clauses, the alternatives only contribute to relevance; on
/// its own (or next to `Not` clauses only) at least one alternative must match.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Exact value match (`term`)
    Equals { field: String, value: Value },
    /// Set membership (`terms`)
    In { field: String, values: Vec<Value> },
    Range { field: String, bounds: RangeBounds },
    /// Analyzed full-text match (`match`)
    Match { field: String, text: Value },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

/// Bounds of a range filter; unset bounds are left out of the query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeBounds {
    pub gt: Option<Value>,
    pub gte: Option<Value>,
    pub lt: Option<Value>,
    pub lte: Option<Value>,
}

impl RangeBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    fn to_value(&self) -> Value {
        let mut bounds = Map::new();
        for (key, bound) in [
            ("gt", &self.gt),
            ("gte", &self.gte),
            ("lt", &self.lt),
            ("lte", &self.lte),
        ] {
            if let Some(value) = bound {
                bounds.insert(key.to_string(), value.clone());
            }
        }
        Value::Object(bounds)
    }
}

impl FilterExpr {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        FilterExpr::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn range(field: impl Into<String>, bounds: RangeBounds) -> Self {
        FilterExpr::Range {
            field: field.into(),
            bounds,
        }
    }

    /// Inclusive range, `gte` .. `lte`
    pub fn between(field: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::range(field, RangeBounds::new().gte(low).lte(high))
    }

    pub fn matches(field: impl Into<String>, text: impl Into<Value>) -> Self {
        FilterExpr::Match {
            field: field.into(),
            text: text.into(),
        }
    }

    pub fn and(children: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = FilterExpr>) -> Self {
        FilterExpr::Or(children.into_iter().collect())
    }

    pub fn not(expr: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(expr))
    }

    /// Matches every document
    pub fn all() -> Self {
        FilterExpr::And(Vec::new())
    }

    /// Compile into the engine's query DSL
    pub fn to_query(&self) -> Value {
        match self {
            FilterExpr::Equals { field, value } => keyed("term", keyed(field, value.clone())),
            FilterExpr::In { field, values } => {
                keyed("terms", keyed(field, Value::Array(values.clone())))
            }
            FilterExpr::Range { field, bounds } => keyed("range", keyed(field, bounds.to_value())),
            FilterExpr::Match { field, text } => keyed("match", keyed(field, text.clone())),
            FilterExpr::And(children) if children.is_empty() => keyed("match_all", empty()),
            FilterExpr::And(children) => compile_and(children),
            FilterExpr::Or(children) if children.is_empty() => keyed("match_none", empty()),
            FilterExpr::Or(children) => bool_query(Vec::new(), Vec::new(), compile_all(children)),
            FilterExpr::Not(inner) => bool_query(Vec::new(), vec![inner.to_query()], Vec::new()),
        }
    }
}

/// `And` flattens into one bool query: `Not` children feed `must_not`, the
/// first non-empty `Or` feeds `should`, everything else is `must`.
fn compile_and(children: &[FilterExpr]) -> Value {
    let mut must = Vec::new();
    let mut must_not = Vec::new();
    let mut should = Vec::new();

    for child in children {
        match child {
            FilterExpr::Not(inner) => must_not.push(inner.to_query()),
            FilterExpr::Or(options) if should.is_empty() && !options.is_empty() => {
                should = compile_all(options);
            }
            other => must.push(other.to_query()),
        }
    }

    bool_query(must, must_not, should)
}

fn compile_all(children: &[FilterExpr]) -> Vec<Value> {
    children.iter().map(FilterExpr::to_query).collect()
}

fn bool_query(must: Vec<Value>, must_not: Vec<Value>, should: Vec<Value>) -> Value {
    let mut clauses = Map::new();
    for (key, list) in [("must", must), ("must_not", must_not), ("should", should)] {
        if !list.is_empty() {
            clauses.insert(key.to_string(), Value::Array(list));
        }
    }
    keyed("bool", Value::Object(clauses))
}

fn keyed(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}

fn empty() -> Value {
    Value::Object(Map::new())
}
