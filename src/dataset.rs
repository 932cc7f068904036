use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::{Instant, SystemTime};

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::domain::TableError;

/// The fixed columns of a record, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Name,
    Type,
    Traffic,
    Country,
    Os,
    Price,
    Description,
}

impl Column {
    pub const COUNT: usize = 8;

    pub const ALL: [Column; Column::COUNT] = [
        Column::Id,
        Column::Name,
        Column::Type,
        Column::Traffic,
        Column::Country,
        Column::Os,
        Column::Price,
        Column::Description,
    ];

    /// Field name in the JSON document.
    pub fn key(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Name => "name",
            Column::Type => "type",
            Column::Traffic => "traffic",
            Column::Country => "country",
            Column::Os => "os",
            Column::Price => "price",
            Column::Description => "description",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Column {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Column::ALL
            .into_iter()
            .find(|c| c.key() == key)
            .ok_or_else(|| TableError::UnknownColumn(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Record {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub traffic: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub os: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub price: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
}

impl Record {
    pub fn cell(&self, column: Column) -> Cow<'_, str> {
        match column {
            Column::Id => Cow::Borrowed(&self.id),
            Column::Name => Cow::Borrowed(&self.name),
            Column::Type => Cow::Borrowed(&self.kind),
            Column::Traffic => Cow::Borrowed(&self.traffic),
            Column::Country => Cow::Borrowed(&self.country),
            Column::Os => Cow::Borrowed(&self.os),
            Column::Price => Cow::Borrowed(&self.price),
            Column::Description => Cow::Borrowed(&self.description),
        }
    }
}

// Text fields accept any JSON scalar; null becomes empty text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// The immutable collection of records loaded for a session.
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<Record>,
    last_modified: Option<SystemTime>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            last_modified: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let start_time = Instant::now();
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(TableError::LoadingFailed("Not a file!".into()));
        }
        debug!("Reading {} ({} bytes)", path.display(), metadata.len());

        let text = fs::read_to_string(path)?;
        let mut dataset = Self::from_json(&text)?;
        dataset.last_modified = metadata.modified().ok();

        info!(
            "Loaded {} records from {} in {}ms",
            dataset.len(),
            path.display(),
            start_time.elapsed().as_millis()
        );
        Ok(dataset)
    }

    pub fn from_json(text: &str) -> Result<Self, TableError> {
        let records: Vec<Record> = serde_json::from_str(text)?;
        Ok(Self::new(records))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cell(&self, row: usize, column: Column) -> Cow<'_, str> {
        self.records[row].cell(column)
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests/fixtures")
            .join(name)
    }

    #[test]
    fn loads_fixture() {
        let dataset = Dataset::load(&fixture("vpn_01.json")).unwrap();
        assert_eq!(dataset.len(), 8);
        assert!(dataset.last_modified().is_some());

        let first = &dataset.records()[0];
        assert_eq!(first.id, "1");
        assert_eq!(first.kind, "Free");
        assert_eq!(dataset.cell(0, Column::Id), "1");
        assert_eq!(dataset.cell(0, Column::Country), first.country);
    }

    #[test]
    fn missing_and_odd_fields_become_text() {
        let dataset = Dataset::from_json(
            r#"[{"id": "7", "name": null, "price": 4.5, "os": true, "traffic": 10}]"#,
        )
        .unwrap();
        let record = &dataset.records()[0];
        assert_eq!(record.id, "7");
        assert_eq!(record.name, "");
        assert_eq!(record.price, "4.5");
        assert_eq!(record.os, "true");
        assert_eq!(record.traffic, "10");
        assert_eq!(record.description, "");
    }

    #[test]
    fn ids_keep_their_written_form() {
        let dataset =
            Dataset::from_json(r#"[{"name": "NoId"}, {"id": 2.7, "name": "Float"}, {"id": null}]"#)
                .unwrap();
        assert_eq!(dataset.cell(0, Column::Id), "");
        assert_eq!(dataset.cell(1, Column::Id), "2.7");
        assert_eq!(dataset.cell(2, Column::Id), "");
    }

    #[test]
    fn rejects_documents_that_are_not_record_arrays() {
        assert!(matches!(
            Dataset::from_json(r#"{"id": 1}"#),
            Err(TableError::ParseError(_))
        ));
        assert!(matches!(
            Dataset::from_json("[{\"id\": 1,"),
            Err(TableError::ParseError(_))
        ));
        assert!(Dataset::from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, TableError::FileNotFound));

        let err = Dataset::load(dir.path()).unwrap_err();
        assert!(matches!(err, TableError::LoadingFailed(_)));
    }

    #[test]
    fn columns_parse_from_keys() {
        for column in Column::ALL {
            assert_eq!(column.key().parse::<Column>().unwrap(), column);
        }
        assert_eq!(" Price ".parse::<Column>().unwrap(), Column::Price);
        assert!("colour".parse::<Column>().is_err());
    }
}
