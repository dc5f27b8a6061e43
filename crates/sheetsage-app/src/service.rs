// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{DatasetHandle, DatasetId, ResponsePayload, UploadTarget};

/// Failure reported by the remote analysis service or the transport under it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.user_message())]
pub struct ServiceError {
    pub status: Option<u16>,
    pub detail: Option<String>,
    pub message: String,
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            detail: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, detail: Option<String>) -> Self {
        Self {
            status: Some(status),
            detail,
            message: format!("server returned {status}"),
        }
    }

    /// The service-supplied detail when there is one, else the generic message.
    pub fn user_message(&self) -> &str {
        match self.detail.as_deref().map(str::trim) {
            Some(detail) if !detail.is_empty() => detail,
            _ => &self.message,
        }
    }
}

pub trait AnalysisService {
    fn upload(&mut self, target: &UploadTarget) -> Result<DatasetHandle, ServiceError>;
    fn query(&mut self, dataset: &DatasetId, question: &str)
    -> Result<ResponsePayload, ServiceError>;
}
