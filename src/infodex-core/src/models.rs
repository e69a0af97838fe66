use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the collection user records live in
pub const DEFAULT_INDEX: &str = "info";

pub const SEX_FEMALE: i64 = 1;
pub const SEX_MALE: i64 = 2;

/// UserRecord is the single document type stored in the `info` collection.
///
/// Every field defaults when absent so that projected search hits, which only
/// carry the selected fields, still decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub age: i64,
    pub sex: i64, // 1: female, 2: male
    pub registered_at: i64, // epoch seconds
}

impl UserRecord {
    /// Document key the record is stored under
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }

    pub fn registered_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.registered_at, 0)
    }
}

/// SortOrder is the direction of a single-field sort
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// SortSpec orders search hits by one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Page is an offset/limit window over the hits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub from: usize,
    pub size: usize,
}

impl Page {
    pub fn new(from: usize, size: usize) -> Self {
        Self { from, size }
    }
}

/// SearchOptions carries everything about a search besides its filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub sort: Option<SortSpec>,
    /// Field paths to return; `None` returns whole documents
    pub projection: Option<Vec<String>>,
    pub page: Option<Page>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn page(mut self, from: usize, size: usize) -> Self {
        self.page = Some(Page::new(from, size));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_names() {
        let record = UserRecord {
            id: 5,
            name: "nht".to_string(),
            address: "Huzhou".to_string(),
            age: 30,
            sex: SEX_FEMALE,
            registered_at: 1_700_000_000,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["registered_at"], 1_700_000_000);
        assert_eq!(value["sex"], 1);
        assert_eq!(record.document_id(), "5");
    }

    #[test]
    fn test_projected_record_decodes_with_defaults() {
        let record: UserRecord =
            serde_json::from_value(serde_json::json!({"id": 4, "name": "lcq4", "age": 36}))
                .unwrap();

        assert_eq!(record.id, 4);
        assert_eq!(record.age, 36);
        assert_eq!(record.address, "");
        assert_eq!(record.registered_at, 0);
    }

    #[test]
    fn test_registered_at_utc() {
        let record = UserRecord {
            registered_at: 86_400,
            ..Default::default()
        };
        let at = record.registered_at_utc().unwrap();
        assert_eq!(at.to_rfc3339(), "1970-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_search_options_builder() {
        let options = SearchOptions::new()
            .sort(SortSpec::desc("age"))
            .project(["id", "name"])
            .page(0, 1);

        assert_eq!(options.sort.unwrap().order, SortOrder::Desc);
        assert_eq!(options.projection.unwrap(), vec!["id", "name"]);
        assert_eq!(options.page, Some(Page { from: 0, size: 1 }));
    }
}
