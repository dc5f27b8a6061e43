// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;

use crate::{ColumnSpec, DataPayload, Record, ResponsePayload};

const SUMMARY_FRACTION_DIGITS: usize = 3;

/// Display instruction for one data payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendering<'a> {
    /// Hand off to a table widget.
    Table {
        rows: &'a [Record],
        columns: &'a [ColumnSpec],
    },
    Line(String),
    /// An `error` payload from the service, shown inline with the answer.
    VisualizationError(String),
    Unsupported(String),
}

impl Rendering<'_> {
    pub fn to_text(&self) -> String {
        match self {
            Self::Table { rows, columns } => format_table_text(rows, columns),
            Self::Line(line) => line.clone(),
            Self::VisualizationError(message) => format!("Visualization Error: {message}"),
            Self::Unsupported(notice) => notice.clone(),
        }
    }
}

pub fn render_payload(payload: Option<&DataPayload>) -> Option<Rendering<'_>> {
    let rendering = match payload? {
        DataPayload::Table { rows, columns } => Rendering::Table { rows, columns },
        DataPayload::Summary {
            label,
            currency,
            value,
        } => Rendering::Line(format!("{label}: {currency} {}", format_grouped(*value))),
        DataPayload::Error { message } => Rendering::VisualizationError(message.clone()),
        DataPayload::Malformed { kind, reason } => Rendering::Unsupported(format!(
            "Data payload type: {kind} (malformed: {reason})"
        )),
        DataPayload::Unknown { kind } => Rendering::Unsupported(format!(
            "Data payload type: {} (not rendered)",
            kind.as_deref().unwrap_or("(none)")
        )),
    };
    Some(rendering)
}

/// Plain-text form of a whole answer: the summary, then the payload.
pub fn render_response_text(response: &ResponsePayload) -> String {
    let mut out = String::new();
    if !response.text_summary.is_empty() {
        out.push_str(&response.text_summary);
        out.push('\n');
    }
    if let Some(rendering) = render_payload(response.data.as_ref()) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&rendering.to_text());
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

pub fn table_cells(rows: &[Record], columns: &[ColumnSpec]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| format_cell(row.get(&column.key)))
                .collect()
        })
        .collect()
}

pub fn format_table_text(rows: &[Record], columns: &[ColumnSpec]) -> String {
    let mut out = String::new();
    out.push_str(
        &columns
            .iter()
            .map(|column| column.label.as_str())
            .collect::<Vec<_>>()
            .join(" | "),
    );
    out.push('\n');
    if rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }
    for row in table_cells(rows, columns) {
        out.push_str(&row.join(" | "));
        out.push('\n');
    }
    out
}

pub fn format_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(Value::Number(number)) => number.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Formats `value` with `,` thousands separators and at most three
/// fraction digits, trailing zeros dropped.
pub fn format_grouped(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-∞" } else { "∞" }.to_owned();
    }

    let fixed = format!("{:.*}", SUMMARY_FRACTION_DIGITS, value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::new();
    if value < 0.0 && (whole != "0" || !fraction.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(whole));
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (len - index) % 3 == 0 {
            out.push(',');
        }
        out.push(digit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        Rendering, format_cell, format_grouped, format_table_text, render_payload,
        render_response_text,
    };
    use crate::{DataPayload, ResponsePayload};
    use serde_json::json;

    fn payload(value: serde_json::Value) -> DataPayload {
        DataPayload::from_value(value)
    }

    #[test]
    fn table_payload_hands_rows_and_columns_to_the_widget() {
        let table = payload(json!({
            "type": "table",
            "data": [{"region": "West", "revenue": 1200}, {"region": "East", "revenue": 800}],
            "columns": ["region", "revenue"],
        }));
        let Some(Rendering::Table { rows, columns }) = render_payload(Some(&table)) else {
            panic!("expected table rendering");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn summary_payload_renders_grouped_line() {
        let summary = payload(json!({
            "type": "summary",
            "label": "Revenue",
            "currency": "USD",
            "value": 125000,
        }));
        assert_eq!(
            render_payload(Some(&summary)),
            Some(Rendering::Line("Revenue: USD 125,000".to_owned()))
        );
    }

    #[test]
    fn error_payload_renders_visualization_notice() {
        let error = payload(json!({"type": "error", "message": "bad query"}));
        let rendering = render_payload(Some(&error)).expect("error payload renders");
        assert_eq!(
            rendering,
            Rendering::VisualizationError("bad query".to_owned())
        );
        assert!(rendering.to_text().contains("bad query"));
    }

    #[test]
    fn unknown_payload_renders_fallback_naming_tag() {
        let chart = payload(json!({"type": "chart"}));
        let text = render_payload(Some(&chart))
            .expect("unknown payload renders")
            .to_text();
        assert!(text.contains("chart"), "unexpected fallback: {text}");
    }

    #[test]
    fn missing_tag_and_malformed_payloads_render_notices() {
        let untagged = payload(json!({"value": 3}));
        assert_eq!(
            render_payload(Some(&untagged)),
            Some(Rendering::Unsupported(
                "Data payload type: (none) (not rendered)".to_owned()
            ))
        );

        let malformed = payload(json!({"type": "table", "columns": ["a"]}));
        let Some(Rendering::Unsupported(notice)) = render_payload(Some(&malformed)) else {
            panic!("expected unsupported rendering");
        };
        assert!(notice.starts_with("Data payload type: table (malformed"));
    }

    #[test]
    fn absent_payload_renders_nothing() {
        assert_eq!(render_payload(None), None);
    }

    #[test]
    fn rendering_is_repeatable() {
        let summary = payload(json!({
            "type": "summary",
            "label": "Total",
            "currency": "EUR",
            "value": 1234.5,
        }));
        assert_eq!(render_payload(Some(&summary)), render_payload(Some(&summary)));
    }

    #[test]
    fn grouped_numbers_follow_thousands_rules() {
        assert_eq!(format_grouped(0.0), "0");
        assert_eq!(format_grouped(999.0), "999");
        assert_eq!(format_grouped(1000.0), "1,000");
        assert_eq!(format_grouped(5000.0), "5,000");
        assert_eq!(format_grouped(125_000.0), "125,000");
        assert_eq!(format_grouped(1_234_567.0), "1,234,567");
        assert_eq!(format_grouped(1234.5), "1,234.5");
        assert_eq!(format_grouped(0.12345), "0.123");
        assert_eq!(format_grouped(-9876.25), "-9,876.25");
        assert_eq!(format_grouped(-0.0001), "0");
        assert_eq!(format_grouped(f64::NAN), "NaN");
        assert_eq!(format_grouped(f64::NEG_INFINITY), "-∞");
    }

    #[test]
    fn cells_render_scalars_plainly() {
        assert_eq!(format_cell(None), "");
        assert_eq!(format_cell(Some(&json!(null))), "");
        assert_eq!(format_cell(Some(&json!("West"))), "West");
        assert_eq!(format_cell(Some(&json!(42))), "42");
        assert_eq!(format_cell(Some(&json!(1.5))), "1.5");
        assert_eq!(format_cell(Some(&json!(true))), "true");
        assert_eq!(format_cell(Some(&json!({"a": 1}))), r#"{"a":1}"#);
    }

    #[test]
    fn table_text_uses_labels_and_column_order() {
        let table = payload(json!({
            "type": "table",
            "data": [{"revenue": 1200, "region": "West"}],
            "columns": [{"key": "region", "label": "Region"}, "revenue"],
        }));
        let DataPayload::Table { rows, columns } = &table else {
            panic!("expected table payload");
        };
        assert_eq!(
            format_table_text(rows, columns),
            "Region | revenue\nWest | 1200\n"
        );
        assert_eq!(
            format_table_text(&[], columns),
            "Region | revenue\n(no rows)\n"
        );
    }

    #[test]
    fn response_text_joins_summary_and_payload() {
        let response = ResponsePayload {
            text_summary: "Total is high".to_owned(),
            data: Some(payload(json!({
                "type": "summary",
                "label": "Total",
                "currency": "USD",
                "value": 5000,
            }))),
        };
        assert_eq!(
            render_response_text(&response),
            "Total is high\n\nTotal: USD 5,000\n"
        );

        let bare = ResponsePayload {
            text_summary: "Nothing to show".to_owned(),
            data: None,
        };
        assert_eq!(render_response_text(&bare), "Nothing to show\n");
    }
}
