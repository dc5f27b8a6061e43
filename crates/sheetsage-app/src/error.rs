// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::{Operation, ServiceError};

pub const NO_FILE_SELECTED: &str = "no file selected";
pub const MISSING_DATASET_OR_QUERY: &str = "missing dataset or query";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A local precondition failed; nothing was sent.
    #[error("{0}")]
    Validation(&'static str),
    #[error("{}: {}", .operation.failure_prefix(), .error.user_message())]
    Transport {
        operation: Operation,
        error: ServiceError,
    },
    #[error("{} already in progress", .0.label())]
    Busy(Operation),
    #[error("no {} in flight", .0.label())]
    NotInFlight(Operation),
}
