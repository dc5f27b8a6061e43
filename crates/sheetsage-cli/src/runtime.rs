// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use sheetsage_app::{
    DatasetHandle, DatasetId, QueryRequest, ResponsePayload, ServiceError, UploadTarget,
};
use sheetsage_client::Client;
use sheetsage_tui::InternalEvent;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;

pub struct ServiceRuntime {
    client: Client,
    accept: Vec<String>,
}

impl ServiceRuntime {
    pub fn new(client: Client, accept: Vec<String>) -> Self {
        Self { client, accept }
    }
}

impl sheetsage_tui::AppRuntime for ServiceRuntime {
    fn select_path(&mut self, raw: &str) -> Result<UploadTarget> {
        UploadTarget::from_path(&expand_path(raw), &self.accept)
    }

    fn upload(&mut self, target: &UploadTarget) -> Result<DatasetHandle, ServiceError> {
        self.client.upload(target)
    }

    fn query(
        &mut self,
        dataset: &DatasetId,
        question: &str,
    ) -> Result<ResponsePayload, ServiceError> {
        self.client.query(dataset, question)
    }

    fn spawn_upload(&mut self, target: UploadTarget, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name("sheetsage-upload".to_owned())
            .spawn(move || {
                let outcome = client.upload(&target);
                let _ = tx.send(InternalEvent::UploadFinished(outcome));
            })
            .context("spawn upload worker")?;
        Ok(())
    }

    fn spawn_query(&mut self, request: QueryRequest, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name("sheetsage-query".to_owned())
            .spawn(move || {
                let outcome = client.query(&request.dataset, &request.question);
                let _ = tx.send(InternalEvent::QueryFinished(outcome));
            })
            .context("spawn query worker")?;
        Ok(())
    }
}

/// Accepts paths pasted or dropped into a terminal: surrounding quotes are
/// stripped and a leading `~/` expands to the home directory.
fn expand_path(raw: &str) -> PathBuf {
    let trimmed = raw
        .trim()
        .trim_matches(|ch: char| ch == '"' || ch == '\'')
        .trim();
    if let Some(rest) = trimmed.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(trimmed)
}
