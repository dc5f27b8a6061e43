// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use serde_json::{Value, json};
use sheetsage_app::{
    AnalysisService, DataPayload, DatasetHandle, DatasetId, ResponsePayload, ServiceError,
    UploadTarget,
};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Zip local-file signature; enough for anything that only sniffs the header.
const XLSX_MAGIC: &[u8] = b"PK\x03\x04\x14\x00\x06\x00";

pub const SAMPLE_SHEETS: [&str; 2] = ["Sales Data", "Regions"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub dataset: DatasetId,
    pub question: String,
}

/// `AnalysisService` that replays queued outcomes and records every call.
///
/// When a queue runs dry the call fails with a transport error, so a test
/// that forgets to script a call sees a clear failure instead of a hang.
#[derive(Debug, Default)]
pub struct ScriptedService {
    uploads: VecDeque<Result<DatasetHandle, ServiceError>>,
    queries: VecDeque<Result<ResponsePayload, ServiceError>>,
    pub uploaded: Vec<String>,
    pub asked: Vec<RecordedQuery>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(mut self, outcome: Result<DatasetHandle, ServiceError>) -> Self {
        self.uploads.push_back(outcome);
        self
    }

    pub fn with_query(mut self, outcome: Result<ResponsePayload, ServiceError>) -> Self {
        self.queries.push_back(outcome);
        self
    }

    pub fn push_query(&mut self, outcome: Result<ResponsePayload, ServiceError>) {
        self.queries.push_back(outcome);
    }

    pub fn call_count(&self) -> usize {
        self.uploaded.len() + self.asked.len()
    }
}

impl AnalysisService for ScriptedService {
    fn upload(&mut self, target: &UploadTarget) -> Result<DatasetHandle, ServiceError> {
        self.uploaded.push(target.file_name().to_owned());
        self.uploads
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::transport("no scripted upload outcome")))
    }

    fn query(
        &mut self,
        dataset: &DatasetId,
        question: &str,
    ) -> Result<ResponsePayload, ServiceError> {
        self.asked.push(RecordedQuery {
            dataset: dataset.clone(),
            question: question.to_owned(),
        });
        self.queries
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::transport("no scripted query outcome")))
    }
}

pub fn sample_target() -> UploadTarget {
    UploadTarget::new("sales.xlsx", XLSX_MAGIC.to_vec())
}

pub fn sample_handle(id: &str) -> DatasetHandle {
    DatasetHandle {
        id: DatasetId::new(id),
        sheets: SAMPLE_SHEETS.iter().map(|sheet| (*sheet).to_owned()).collect(),
    }
}

pub fn summary_json(label: &str, currency: &str, value: f64) -> Value {
    json!({
        "type": "summary",
        "label": label,
        "currency": currency,
        "value": value,
    })
}

pub fn revenue_table_json() -> Value {
    json!({
        "type": "table",
        "data": [
            {"region": "East", "revenue": 48200.5},
            {"region": "North", "revenue": 31000},
            {"region": "West", "revenue": 125000},
        ],
        "columns": ["region", "revenue"],
    })
}

pub fn response(text_summary: &str, data: Option<Value>) -> ResponsePayload {
    ResponsePayload {
        text_summary: text_summary.to_owned(),
        data: data.map(DataPayload::from_value),
    }
}

/// Wire body the analysis service sends back for a query.
pub fn query_body(text_summary: &str, data: Option<Value>) -> String {
    json!({
        "result": {
            "text_summary": text_summary,
            "data": data,
        }
    })
    .to_string()
}

pub fn upload_body(file_id: &str) -> String {
    json!({
        "file_id": file_id,
        "sheets": SAMPLE_SHEETS,
        "message": "File processed successfully.",
    })
    .to_string()
}

/// Writes a spreadsheet-shaped file into a fresh temp dir.
pub fn write_sample_workbook(file_name: &str) -> Result<(tempfile::TempDir, PathBuf)> {
    let temp = tempfile::tempdir().context("create temp dir")?;
    let path = temp.path().join(file_name);
    std::fs::write(&path, XLSX_MAGIC).with_context(|| format!("write {}", path.display()))?;
    Ok((temp, path))
}
