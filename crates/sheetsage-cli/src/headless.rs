// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sheetsage_app::{AnalysisService, Session, UploadTarget, render_response_text};
use tracing::{info, warn};

/// Uploads `target`, asks `question` and returns what a user would have
/// seen. Failures end up in `session.error_message()`, not in the text.
pub fn run_once<S>(
    session: &mut Session,
    service: &mut S,
    target: UploadTarget,
    question: &str,
) -> String
where
    S: AnalysisService + ?Sized,
{
    let mut out = String::new();

    session.select_file(target);
    if let Err(error) = session.submit_upload(service) {
        warn!(%error, "headless upload failed");
        return out;
    }
    if let Some(notice) = session.notice() {
        out.push_str(notice);
        out.push('\n');
    }
    if let Some(handle) = session.dataset()
        && !handle.sheets.is_empty()
    {
        out.push_str(&format!("Sheets: {}\n", handle.sheets.join(", ")));
    }

    session.set_query(question);
    match session.submit_query(service) {
        Ok(answer) => {
            info!("headless query answered");
            out.push('\n');
            out.push_str(&render_response_text(answer));
        }
        Err(error) => warn!(%error, "headless query failed"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::run_once;
    use anyhow::{Result, anyhow};
    use sheetsage_app::{ServiceError, Session};
    use sheetsage_client::Client;
    use sheetsage_testkit::{
        ScriptedService, query_body, response, revenue_table_json, sample_handle, sample_target,
        summary_json, upload_body,
    };
    use std::thread;
    use std::time::Duration;
    use tiny_http::{Header, Response, Server};

    #[test]
    fn prints_confirmation_and_rendered_answer() {
        let mut service = ScriptedService::new()
            .with_upload(Ok(sample_handle("abc123")))
            .with_query(Ok(response(
                "Total is high",
                Some(summary_json("Total", "USD", 5000.0)),
            )));
        let mut session = Session::default();

        let transcript = run_once(&mut session, &mut service, sample_target(), "total revenue");
        assert_eq!(
            transcript,
            "File processed! ID: abc123. Ready to query.\n\
Sheets: Sales Data, Regions\n\
\n\
Total is high\n\
\n\
Total: USD 5,000\n"
        );
        assert!(session.error_message().is_empty());
    }

    #[test]
    fn upload_failure_skips_the_question() {
        let mut service = ScriptedService::new().with_upload(Err(ServiceError::http(
            400,
            Some("Must be an Excel file (.xlsx or .xls)".to_owned()),
        )));
        let mut session = Session::default();

        let transcript = run_once(&mut session, &mut service, sample_target(), "total revenue");
        assert_eq!(transcript, "");
        assert_eq!(
            session.error_message(),
            "Upload failed: Must be an Excel file (.xlsx or .xls)"
        );
        assert!(service.asked.is_empty());
    }

    #[test]
    fn blank_question_is_a_validation_error() {
        let mut service = ScriptedService::new().with_upload(Ok(sample_handle("abc123")));
        let mut session = Session::default();

        let transcript = run_once(&mut session, &mut service, sample_target(), "   ");
        assert!(transcript.starts_with("File processed!"));
        assert_eq!(session.error_message(), "missing dataset or query");
        assert!(service.asked.is_empty());
    }

    #[test]
    fn talks_to_a_live_service_over_http() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let bodies = [
                upload_body("2f1c9a7e-55b0-4c1e"),
                query_body("Revenue by region", Some(revenue_table_json())),
            ];
            for body in bodies {
                let request = server.recv().expect("request expected");
                let response = Response::from_string(body).with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
                request.respond(response).expect("response should succeed");
            }
        });

        let mut client = Client::new(&addr, Duration::from_secs(2))?;
        let mut session = Session::default();
        let transcript = run_once(
            &mut session,
            &mut client,
            sample_target(),
            "revenue by region",
        );

        assert!(transcript.contains("ID: 2f1c9a7e-55b0-4c1e"));
        assert!(transcript.contains("Revenue by region\n\n"));
        assert!(transcript.contains(" | "), "table missing: {transcript}");
        assert!(session.error_message().is_empty());

        handle.join().expect("server thread should join");
        Ok(())
    }
}
