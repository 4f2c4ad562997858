//! Text and JSON rendering for CLI results

use anyhow::Result;
use clap::ValueEnum;
use healthlog_core::analytics::{AnalyzerStatus, InsightReport};
use healthlog_core::{Insight, InsightRecord, LogEntry};
use serde::Serialize;
use serde_json::Value;

/// Output format for every command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Format a payload value for display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            Some(f) => format!("{:.2}", f),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!(
            "[{}]",
            arr.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(obj) => format!("{{{} keys}}", obj.len()),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// One line per entry: time, id, then `key=value` pairs
pub fn entry_line(entry: &LogEntry) -> String {
    let fields = entry
        .fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, format_value(v)))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{:<5}  {}  {}",
        entry.time.as_deref().unwrap_or("-"),
        entry.id,
        fields
    )
}

pub fn print_entries_text(entries: &[LogEntry]) {
    let mut current = None;
    for entry in entries {
        if current != Some(entry.date) {
            println!("{}", entry.date);
            current = Some(entry.date);
        }
        println!("  {}", entry_line(entry));
    }
}

pub fn print_insights_text(insights: &[Insight]) {
    for insight in insights {
        println!("[{}] {} ({})", insight.priority, insight.title, insight.kind);
        println!("    {}", insight.content);
        println!("    id: {}", insight.id);
    }
}

pub fn print_report_text(report: &InsightReport) {
    println!(
        "Window {} .. {} ({})",
        report.window_start,
        report.as_of,
        if report.sufficient {
            "sufficient data"
        } else {
            "not enough data"
        }
    );
    for run in &report.runs {
        let status_icon = match run.status {
            AnalyzerStatus::Fired => "+",
            AnalyzerStatus::Silent => " ",
            AnalyzerStatus::Skipped => "-",
            AnalyzerStatus::Failed => "!",
        };
        println!(
            "  [{}] {} {} ({}ms)",
            status_icon,
            run.analyzer,
            run.status.as_str(),
            run.duration_ms
        );
        if let Some(ref e) = run.error {
            println!("      {}", e);
        }
    }
    if report.fallback_used {
        println!("  fallback used");
    }
    println!();
    print_insights_text(&report.insights);
}

pub fn print_ledger_text(records: &[InsightRecord]) {
    for record in records {
        let state = match record.read_at {
            Some(at) => format!("read {}", at.format("%Y-%m-%d %H:%M")),
            None => "unread".to_string(),
        };
        println!(
            "{}  [{}] {} ({})",
            record.insight.id, record.insight.priority, record.insight.title, state
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(7)), "7");
        assert_eq!(format_value(&json!(7.0)), "7");
        assert_eq!(format_value(&json!(7.25)), "7.25");
        assert_eq!(format_value(&json!("run")), "run");
        assert_eq!(format_value(&json!([1, "a"])), "[1, a]");
        assert_eq!(format_value(&json!({"a": 1})), "{1 keys}");
        assert_eq!(format_value(&Value::Null), "null");
    }
}
