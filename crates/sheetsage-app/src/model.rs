// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::ids::DatasetId;

pub const DEFAULT_ACCEPTED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Query,
}

impl Operation {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Query => "query",
        }
    }

    pub const fn busy_label(self) -> &'static str {
        match self {
            Self::Upload => "Processing Data...",
            Self::Query => "Getting Insights...",
        }
    }

    pub const fn failure_prefix(self) -> &'static str {
        match self {
            Self::Upload => "Upload failed",
            Self::Query => "Query failed",
        }
    }
}

/// A spreadsheet the user picked, held in memory until it is uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadTarget {
    file_name: String,
    bytes: Vec<u8>,
}

impl UploadTarget {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Reads `path` after checking its extension against `accept`
    /// (case-insensitive, without the leading dot).
    pub fn from_path(path: &Path, accept: &[String]) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .with_context(|| format!("{} does not name a file", path.display()))?
            .to_owned();

        if !extension_accepted(&file_name, accept) {
            bail!(
                "{file_name} is not a spreadsheet; expected one of: {}",
                accept
                    .iter()
                    .map(|ext| format!(".{ext}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTarget")
            .field("file_name", &self.file_name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

pub fn extension_accepted(file_name: &str, accept: &[String]) -> bool {
    let Some((stem, extension)) = file_name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && accept
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
}

/// A dataset the service finished processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    pub id: DatasetId,
    pub sheets: Vec<String>,
}

impl DatasetHandle {
    pub fn new(id: impl Into<DatasetId>) -> Self {
        Self {
            id: id.into(),
            sheets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponsePayload {
    #[serde(default)]
    pub text_summary: String,
    #[serde(default)]
    pub data: Option<DataPayload>,
}

pub type Record = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawColumn")]
pub struct ColumnSpec {
    pub key: String,
    pub label: String,
}

impl ColumnSpec {
    pub fn named(name: impl Into<String>) -> Self {
        let key = name.into();
        Self {
            label: key.clone(),
            key,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawColumn {
    Name(String),
    Number(serde_json::Number),
    Described {
        #[serde(alias = "field", alias = "accessor")]
        key: String,
        #[serde(default, alias = "header", alias = "title")]
        label: Option<String>,
    },
}

impl From<RawColumn> for ColumnSpec {
    fn from(raw: RawColumn) -> Self {
        match raw {
            RawColumn::Name(name) => Self::named(name),
            RawColumn::Number(number) => Self::named(number.to_string()),
            RawColumn::Described { key, label } => Self {
                label: label.unwrap_or_else(|| key.clone()),
                key,
            },
        }
    }
}

/// How a query result should be displayed, keyed by the payload's `type`.
///
/// Decoding never fails: unknown tags land in `Unknown` and known tags with
/// missing or mistyped fields land in `Malformed`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataPayload {
    Table {
        rows: Vec<Record>,
        columns: Vec<ColumnSpec>,
    },
    Summary {
        label: String,
        currency: String,
        value: f64,
    },
    Error {
        message: String,
    },
    Malformed {
        kind: String,
        reason: String,
    },
    Unknown {
        kind: Option<String>,
    },
}

#[derive(Deserialize)]
struct TableFields {
    data: Vec<Record>,
    columns: Vec<ColumnSpec>,
}

#[derive(Deserialize)]
struct SummaryFields {
    label: String,
    currency: String,
    value: f64,
}

#[derive(Deserialize)]
struct ErrorFields {
    message: String,
}

impl DataPayload {
    pub fn from_value(value: Value) -> Self {
        let kind = match value.get("type") {
            Some(Value::String(kind)) => Some(kind.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };

        match kind.as_deref() {
            Some("table") => match serde_json::from_value::<TableFields>(value) {
                Ok(fields) => Self::Table {
                    rows: fields.data,
                    columns: fields.columns,
                },
                Err(error) => Self::malformed("table", error),
            },
            Some("summary") => match serde_json::from_value::<SummaryFields>(value) {
                Ok(fields) => Self::Summary {
                    label: fields.label,
                    currency: fields.currency,
                    value: fields.value,
                },
                Err(error) => Self::malformed("summary", error),
            },
            Some("error") => match serde_json::from_value::<ErrorFields>(value) {
                Ok(fields) => Self::Error {
                    message: fields.message,
                },
                Err(error) => Self::malformed("error", error),
            },
            _ => Self::Unknown { kind },
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::Table { .. } => Some("table"),
            Self::Summary { .. } => Some("summary"),
            Self::Error { .. } => Some("error"),
            Self::Malformed { kind, .. } => Some(kind),
            Self::Unknown { kind } => kind.as_deref(),
        }
    }

    fn malformed(kind: &str, error: serde_json::Error) -> Self {
        Self::Malformed {
            kind: kind.to_owned(),
            reason: error.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for DataPayload {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}
