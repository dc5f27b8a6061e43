// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetsage_app::{
    AnalysisService, DatasetHandle, DatasetId, ResponsePayload, ServiceError, UploadTarget,
};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const XLS_MIME: &str = "application/vnd.ms-excel";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Blocking client for the spreadsheet analysis service.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }

        let parsed =
            Url::parse(&base_url).with_context(|| format!("parse api.base_url {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url {base_url:?} must use http or https, got {}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn upload(&self, target: &UploadTarget) -> Result<DatasetHandle, ServiceError> {
        let url = self.endpoint("upload");
        debug!(
            %url,
            file = target.file_name(),
            bytes = target.size(),
            "uploading spreadsheet"
        );

        let part = Part::bytes(target.bytes().to_vec())
            .file_name(target.file_name().to_owned())
            .mime_str(mime_for(target.file_name()))
            .map_err(|error| ServiceError::transport(format!("build upload form: {error}")))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|error| self.connection_error(error))?;

        let parsed: UploadResponse = decode(response, "upload")?;
        if parsed.file_id.trim().is_empty() {
            return Err(ServiceError::transport(
                "upload response carried an empty file_id",
            ));
        }

        info!(
            dataset = %parsed.file_id,
            sheets = parsed.sheets.len(),
            message = %parsed.message,
            "spreadsheet processed"
        );
        Ok(DatasetHandle {
            id: DatasetId::new(parsed.file_id),
            sheets: parsed.sheets,
        })
    }

    pub fn query(
        &self,
        dataset: &DatasetId,
        question: &str,
    ) -> Result<ResponsePayload, ServiceError> {
        let url = self.endpoint("query");
        debug!(%url, %dataset, "submitting question");

        let response = self
            .http
            .post(&url)
            .json(&QueryRequest {
                file_id: dataset.as_str(),
                question,
            })
            .send()
            .map_err(|error| self.connection_error(error))?;

        let parsed: QueryEnvelope = decode(response, "query")?;
        info!(
            %dataset,
            kind = parsed
                .result
                .data
                .as_ref()
                .and_then(|data| data.kind())
                .unwrap_or("none"),
            "answer received"
        );
        Ok(parsed.result)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}/", self.base_url)
    }

    fn connection_error(&self, error: reqwest::Error) -> ServiceError {
        let message = if error.is_timeout() {
            format!(
                "request to {} timed out after {}s",
                self.base_url,
                self.timeout.as_secs_f32()
            )
        } else {
            format!(
                "cannot reach {} -- is the analysis service running? ({error})",
                self.base_url
            )
        };
        warn!(%message, "transport failure");
        ServiceError::transport(message)
    }
}

impl AnalysisService for Client {
    fn upload(&mut self, target: &UploadTarget) -> Result<DatasetHandle, ServiceError> {
        Client::upload(self, target)
    }

    fn query(
        &mut self,
        dataset: &DatasetId,
        question: &str,
    ) -> Result<ResponsePayload, ServiceError> {
        Client::query(self, dataset, question)
    }
}

fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let error = clean_error_response(status, &body);
        warn!(
            status = status.as_u16(),
            message = error.user_message(),
            "{what} rejected"
        );
        return Err(error);
    }

    response
        .json()
        .map_err(|error| ServiceError::transport(format!("decode {what} response: {error}")))
}

fn clean_error_response(status: StatusCode, body: &str) -> ServiceError {
    let code = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<DetailEnvelope>(body) {
        match parsed.detail {
            Some(Value::String(text)) if !text.trim().is_empty() => {
                return ServiceError::http(code, Some(text.trim().to_owned()));
            }
            Some(Value::Array(items)) => {
                let messages = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str))
                    .filter(|msg| !msg.is_empty())
                    .collect::<Vec<_>>();
                if !messages.is_empty() {
                    return ServiceError::http(code, Some(messages.join("; ")));
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return ServiceError::http(code, Some(trimmed.to_owned()));
    }

    ServiceError::http(code, None)
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xlsx") => XLSX_MIME,
        Some("xls") => XLS_MIME,
        _ => FALLBACK_MIME,
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    file_id: &'a str,
    question: &'a str,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_id: String,
    #[serde(default)]
    sheets: Vec<String>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    result: ResponsePayload,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    detail: Option<Value>,
}
