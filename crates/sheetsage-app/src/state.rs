// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    AnalysisService, DatasetHandle, DatasetId, MISSING_DATASET_OR_QUERY, NO_FILE_SELECTED,
    Operation, ResponsePayload, ServiceError, SessionError, UploadTarget,
};

/// Question to send once a query has been started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub dataset: DatasetId,
    pub question: String,
}

/// Interaction state for one upload-then-ask session.
///
/// Every network operation is split into `begin_*` and `complete_*` so the
/// caller can run the request elsewhere while the session stays busy. At
/// most one operation is in flight; `begin_*` refuses while busy.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    upload_target: Option<UploadTarget>,
    dataset: Option<DatasetHandle>,
    query: String,
    in_flight: Option<Operation>,
    response: Option<ResponsePayload>,
    error: String,
    notice: Option<String>,
}

impl Session {
    pub fn upload_target(&self) -> Option<&UploadTarget> {
        self.upload_target.as_ref()
    }

    pub fn dataset(&self) -> Option<&DatasetHandle> {
        self.dataset.as_ref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn response(&self) -> Option<&ResponsePayload> {
        self.response.as_ref()
    }

    /// Message from the last failed attempt; empty when the last attempt
    /// did not fail.
    pub fn error_message(&self) -> &str {
        &self.error
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn can_upload(&self) -> bool {
        !self.is_busy() && self.upload_target.is_some()
    }

    pub fn can_edit_query(&self) -> bool {
        !self.is_busy() && self.dataset.is_some()
    }

    pub fn can_query(&self) -> bool {
        self.can_edit_query() && !self.query.trim().is_empty()
    }

    /// Records the candidate file. The current dataset and answer stay
    /// until an upload actually starts.
    pub fn select_file(&mut self, target: UploadTarget) {
        self.upload_target = Some(target);
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(message.into());
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn begin_upload(&mut self) -> Result<UploadTarget, SessionError> {
        if let Some(operation) = self.in_flight {
            return Err(SessionError::Busy(operation));
        }
        let Some(target) = self.upload_target.clone() else {
            return Err(self.fail(SessionError::Validation(NO_FILE_SELECTED)));
        };

        self.in_flight = Some(Operation::Upload);
        self.error.clear();
        self.notice = None;
        self.dataset = None;
        self.response = None;
        Ok(target)
    }

    pub fn complete_upload(
        &mut self,
        outcome: Result<DatasetHandle, ServiceError>,
    ) -> Result<&DatasetHandle, SessionError> {
        if self.in_flight != Some(Operation::Upload) {
            return Err(SessionError::NotInFlight(Operation::Upload));
        }
        self.in_flight = None;

        match outcome {
            Ok(handle) => {
                self.notice = Some(format!(
                    "File processed! ID: {}. Ready to query.",
                    handle.id
                ));
                Ok(self.dataset.insert(handle))
            }
            Err(error) => Err(self.fail(SessionError::Transport {
                operation: Operation::Upload,
                error,
            })),
        }
    }

    pub fn submit_upload<S>(&mut self, service: &mut S) -> Result<&DatasetHandle, SessionError>
    where
        S: AnalysisService + ?Sized,
    {
        let target = self.begin_upload()?;
        let outcome = service.upload(&target);
        self.complete_upload(outcome)
    }

    pub fn begin_query(&mut self) -> Result<QueryRequest, SessionError> {
        if let Some(operation) = self.in_flight {
            return Err(SessionError::Busy(operation));
        }
        let dataset = self
            .dataset
            .as_ref()
            .filter(|_| !self.query.trim().is_empty())
            .map(|handle| handle.id.clone());
        let Some(dataset) = dataset else {
            return Err(self.fail(SessionError::Validation(MISSING_DATASET_OR_QUERY)));
        };

        self.in_flight = Some(Operation::Query);
        self.error.clear();
        self.notice = None;
        Ok(QueryRequest {
            dataset,
            question: self.query.clone(),
        })
    }

    /// On failure the previous answer, if any, stays in place.
    pub fn complete_query(
        &mut self,
        outcome: Result<ResponsePayload, ServiceError>,
    ) -> Result<&ResponsePayload, SessionError> {
        if self.in_flight != Some(Operation::Query) {
            return Err(SessionError::NotInFlight(Operation::Query));
        }
        self.in_flight = None;

        match outcome {
            Ok(response) => Ok(self.response.insert(response)),
            Err(error) => Err(self.fail(SessionError::Transport {
                operation: Operation::Query,
                error,
            })),
        }
    }

    pub fn submit_query<S>(&mut self, service: &mut S) -> Result<&ResponsePayload, SessionError>
    where
        S: AnalysisService + ?Sized,
    {
        let request = self.begin_query()?;
        let outcome = service.query(&request.dataset, &request.question);
        self.complete_query(outcome)
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        self.error = error.to_string();
        self.notice = None;
        error
    }
}
