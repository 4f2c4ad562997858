//! healthlog - personal health log CLI
//!
//! Logs food, mood, exercise, sleep and water entries, reports streaks and
//! totals, and derives ranked insights from recent history.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/healthlog/data.db (~/.local/share/healthlog/data.db)
//! - Config: $XDG_CONFIG_HOME/healthlog/config.toml (~/.config/healthlog/config.toml)
//! - Logs: $XDG_STATE_HOME/healthlog/ (~/.local/state/healthlog/)

mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use healthlog_core::analytics::{GenerateOptions, InsightEngine};
use healthlog_core::{
    Config, Database, DateKey, LogCategory, LogPatch, LogStore, NewLogEntry, StatsAggregator,
};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::output::{
    entry_line, print_entries_text, print_insights_text, print_json, print_ledger_text,
    print_report_text, OutputFormat,
};

#[derive(Parser)]
#[command(name = "healthlog")]
#[command(about = "Personal health log with streaks and insights")]
#[command(version)]
struct Args {
    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Database file (default: from config, else the XDG data dir)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log an entry (water replaces the day's entry, others append)
    Log {
        category: LogCategory,
        /// YYYY-MM-DD or RFC 3339 timestamp (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Wall-clock time, e.g. 08:30
        #[arg(short, long)]
        time: Option<String>,
        /// Entry id (default: generated)
        #[arg(long)]
        id: Option<String>,
        /// Payload field as key=value; values parse as JSON when they can
        #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Show one day's entries for a category
    Day {
        category: LogCategory,
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show a category's entries over an inclusive date range
    Range {
        category: LogCategory,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Patch an existing entry (a null value removes a field)
    Update {
        category: LogCategory,
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        date: String,
        #[arg(short, long)]
        time: Option<String>,
        #[arg(short = 'f', long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },

    /// Delete an entry
    Delete {
        category: LogCategory,
        #[arg(long)]
        id: String,
        #[arg(short, long)]
        date: String,
    },

    /// Consecutive days with any entry, ending at the date
    Streak {
        #[arg(short, long)]
        date: Option<String>,
        /// Also report the longest streak over the last N days
        #[arg(long)]
        longest_over: Option<u32>,
    },

    /// Percentage of tracked categories logged on a day
    Completion {
        #[arg(short, long)]
        date: Option<String>,
        /// Categories to track (default: all)
        #[arg(short, long = "category")]
        categories: Vec<LogCategory>,
    },

    /// Sum of a numeric field over a date range
    Totals {
        category: LogCategory,
        #[arg(long)]
        field: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },

    /// Generate ranked insights from recent history
    Insights {
        /// As-of date (default: today)
        #[arg(short, long)]
        date: Option<String>,
        /// Days of history to analyze (default: from config)
        #[arg(long)]
        window_days: Option<u32>,
        /// Maximum insights to show (default: from config)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Only the single most salient insight
        #[arg(long, conflicts_with = "limit")]
        one: bool,
        /// Include per-analyzer run details
        #[arg(long)]
        report: bool,
        /// List remembered unread insights instead of generating
        #[arg(long, conflicts_with_all = ["one", "report"])]
        unread: bool,
    },

    /// Mark a generated insight as read
    MarkRead { id: String },

    /// List registered analyzers
    Analyzers,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard =
        healthlog_core::logging::init(&config.logging).context("failed to initialize logging")?;

    let engine = InsightEngine::from_config(&config.analytics);

    if let Command::Analyzers = args.command {
        return cmd_analyzers(&engine, args.format);
    }

    // Open database
    let db_path = args
        .database
        .clone()
        .unwrap_or_else(|| config.resolved_database_path());
    tracing::info!(path = %db_path.display(), "Opening database");
    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let keyer = config.keyer().context("invalid timezone.utc_offset")?;
    let store = LogStore::new(db, keyer);
    let format = args.format;

    match args.command {
        Command::Log {
            category,
            date,
            time,
            id,
            fields,
        } => cmd_log(&store, format, category, date, time, id, &fields),
        Command::Day { category, date } => cmd_day(&store, format, category, date),
        Command::Range {
            category,
            start,
            end,
        } => cmd_range(&store, format, category, &start, &end),
        Command::Update {
            category,
            id,
            date,
            time,
            fields,
        } => cmd_update(&store, format, category, &id, &date, time, &fields),
        Command::Delete { category, id, date } => cmd_delete(&store, format, category, &id, &date),
        Command::Streak { date, longest_over } => cmd_streak(&store, format, date, longest_over),
        Command::Completion { date, categories } => {
            cmd_completion(&store, format, date, &categories)
        }
        Command::Totals {
            category,
            field,
            start,
            end,
        } => cmd_totals(&store, format, category, &field, &start, &end),
        Command::Insights {
            date,
            window_days,
            limit,
            one,
            report,
            unread,
        } => {
            if unread {
                cmd_unread(&store, format)
            } else {
                let mut options = engine.default_options();
                if let Some(days) = window_days {
                    options = options.with_window_days(days);
                }
                if one {
                    options = options.with_max_results(Some(1));
                } else if limit.is_some() {
                    options = options.with_max_results(limit);
                }
                cmd_insights(&store, &engine, format, date, options, report)
            }
        }
        Command::MarkRead { id } => cmd_mark_read(&store, format, &id),
        Command::Analyzers => cmd_analyzers(&engine, format),
    }
}

/// Parse `key=value`; the value is JSON when it parses, a string otherwise
fn parse_field(raw: &str) -> Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("field '{}' must look like key=value", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("field '{}' has an empty key", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn resolve_date(store: &LogStore<Database>, raw: Option<&str>) -> Result<DateKey> {
    match raw {
        Some(raw) => store
            .date_key(raw)
            .with_context(|| format!("invalid date '{}'", raw)),
        None => Ok(store.today()),
    }
}

fn cmd_log(
    store: &LogStore<Database>,
    format: OutputFormat,
    category: LogCategory,
    date: Option<String>,
    time: Option<String>,
    id: Option<String>,
    fields: &[String],
) -> Result<()> {
    let mut entry = NewLogEntry::on(date.unwrap_or_else(|| store.today().to_string()));
    entry.id = id;
    entry.time = time;
    for raw in fields {
        let (key, value) = parse_field(raw)?;
        entry.fields.insert(key, value);
    }

    let stored = store
        .write(category, entry)
        .with_context(|| format!("failed to log {} entry", category))?;

    match format {
        OutputFormat::Json => print_json(&stored)?,
        OutputFormat::Text => {
            println!("Logged {} entry on {}", category, stored.date);
            println!("  {}", entry_line(&stored));
        }
    }
    Ok(())
}

fn cmd_day(
    store: &LogStore<Database>,
    format: OutputFormat,
    category: LogCategory,
    date: Option<String>,
) -> Result<()> {
    let date = resolve_date(store, date.as_deref())?;
    let entries = store.read_day(category, date)?;

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Text if entries.is_empty() => {
            println!("No {} entries on {}", category, date)
        }
        OutputFormat::Text => print_entries_text(&entries),
    }
    Ok(())
}

fn cmd_range(
    store: &LogStore<Database>,
    format: OutputFormat,
    category: LogCategory,
    start: &str,
    end: &str,
) -> Result<()> {
    let start = resolve_date(store, Some(start))?;
    let end = resolve_date(store, Some(end))?;
    let entries = store.read_range(category, start, end)?;

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Text if entries.is_empty() => {
            println!("No {} entries from {} to {}", category, start, end)
        }
        OutputFormat::Text => print_entries_text(&entries),
    }
    Ok(())
}

fn cmd_update(
    store: &LogStore<Database>,
    format: OutputFormat,
    category: LogCategory,
    id: &str,
    date: &str,
    time: Option<String>,
    fields: &[String],
) -> Result<()> {
    let date = resolve_date(store, Some(date))?;
    let mut patch = LogPatch::new();
    patch.time = time;
    for raw in fields {
        let (key, value) = parse_field(raw)?;
        patch.fields.insert(key, value);
    }

    let updated = store
        .update(category, id, date, &patch)
        .with_context(|| format!("failed to update {} entry {}", category, id))?;

    match format {
        OutputFormat::Json => print_json(&updated)?,
        OutputFormat::Text => {
            println!("Updated {} entry on {}", category, updated.date);
            println!("  {}", entry_line(&updated));
        }
    }
    Ok(())
}

fn cmd_delete(
    store: &LogStore<Database>,
    format: OutputFormat,
    category: LogCategory,
    id: &str,
    date: &str,
) -> Result<()> {
    let date = resolve_date(store, Some(date))?;
    let deleted = store.delete(category, id, date)?;

    match format {
        OutputFormat::Json => print_json(&json!({ "deleted": deleted }))?,
        OutputFormat::Text if deleted => println!("Deleted {} entry {} on {}", category, id, date),
        OutputFormat::Text => println!("No {} entry {} on {}", category, id, date),
    }
    Ok(())
}

fn cmd_streak(
    store: &LogStore<Database>,
    format: OutputFormat,
    date: Option<String>,
    longest_over: Option<u32>,
) -> Result<()> {
    let date = resolve_date(store, date.as_deref())?;
    let stats = StatsAggregator::new(store);
    let streak = stats.current_streak(date)?;

    let summary = match longest_over {
        Some(days) => {
            let start = date.add_days(-i64::from(days.max(1) - 1)).unwrap_or(date);
            Some(stats.longest_streak(start, date)?)
        }
        None => None,
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "date": date,
            "streak": streak,
            "longest": summary,
        }))?,
        OutputFormat::Text => {
            println!("Current streak: {} day(s) as of {}", streak, date);
            if let Some(summary) = summary {
                match (summary.longest_start, summary.longest_end) {
                    (Some(from), Some(to)) => println!(
                        "Longest streak: {} day(s) ({} .. {}), active {} of {} days",
                        summary.longest_days, from, to, summary.active_days, summary.total_days
                    ),
                    _ => println!("No activity in the last {} days", summary.total_days),
                }
            }
        }
    }
    Ok(())
}

fn cmd_completion(
    store: &LogStore<Database>,
    format: OutputFormat,
    date: Option<String>,
    categories: &[LogCategory],
) -> Result<()> {
    let date = resolve_date(store, date.as_deref())?;
    let stats = StatsAggregator::new(store);
    let rate = stats.completion_rate(date, categories)?;
    let tracked: Vec<LogCategory> = if categories.is_empty() {
        LogCategory::ALL.to_vec()
    } else {
        categories.to_vec()
    };

    match format {
        OutputFormat::Json => print_json(&json!({
            "date": date,
            "tracked": tracked,
            "completion": rate,
        }))?,
        OutputFormat::Text => {
            println!("Completion on {}: {}%", date, rate);
            for (category, count) in stats.daily_counts(date)? {
                if tracked.contains(&category) {
                    let mark = if count > 0 { "x" } else { " " };
                    println!("  [{}] {} ({})", mark, category, count);
                }
            }
        }
    }
    Ok(())
}

fn cmd_totals(
    store: &LogStore<Database>,
    format: OutputFormat,
    category: LogCategory,
    field: &str,
    start: &str,
    end: &str,
) -> Result<()> {
    let start = resolve_date(store, Some(start))?;
    let end = resolve_date(store, Some(end))?;
    let total = StatsAggregator::new(store)
        .totals(category, start, end, field)
        .with_context(|| format!("failed to total {}.{}", category, field))?;

    match format {
        OutputFormat::Json => print_json(&json!({
            "category": category,
            "field": field,
            "start": start,
            "end": end,
            "total": total,
        }))?,
        OutputFormat::Text => println!(
            "Total {}.{} from {} to {}: {}",
            category,
            field,
            start,
            end,
            output::format_value(&json!(total))
        ),
    }
    Ok(())
}

fn cmd_insights(
    store: &LogStore<Database>,
    engine: &InsightEngine,
    format: OutputFormat,
    date: Option<String>,
    options: GenerateOptions,
    with_report: bool,
) -> Result<()> {
    let as_of = resolve_date(store, date.as_deref())?;
    let report = engine
        .generate_report(store, as_of, options)
        .context("failed to generate insights")?;

    // Remember what was shown so it can be marked read later
    if let Err(e) = store.repository().record_insights(&report.insights) {
        tracing::warn!(error = %e, "Failed to record insights");
    }

    match (format, with_report) {
        (OutputFormat::Json, true) => print_json(&report)?,
        (OutputFormat::Json, false) => print_json(&report.insights)?,
        (OutputFormat::Text, true) => print_report_text(&report),
        (OutputFormat::Text, false) => print_insights_text(&report.insights),
    }
    Ok(())
}

fn cmd_unread(store: &LogStore<Database>, format: OutputFormat) -> Result<()> {
    let records = store.repository().list_insights(true)?;
    match format {
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Text if records.is_empty() => println!("No unread insights"),
        OutputFormat::Text => print_ledger_text(&records),
    }
    Ok(())
}

fn cmd_mark_read(store: &LogStore<Database>, format: OutputFormat, id: &str) -> Result<()> {
    let now = store.clock().now();
    if !store.repository().mark_insight_read(id, now)? {
        bail!("no insight with id '{}'; run `healthlog insights` first", id);
    }

    match format {
        OutputFormat::Json => print_json(&json!({ "id": id, "read": true }))?,
        OutputFormat::Text => println!("Marked {} as read", id),
    }
    Ok(())
}

fn cmd_analyzers(engine: &InsightEngine, format: OutputFormat) -> Result<()> {
    let names = engine.analyzer_names();
    match format {
        OutputFormat::Json => print_json(
            &names
                .iter()
                .map(|name| json!({ "name": name, "disabled": engine.is_disabled(name) }))
                .collect::<Vec<_>>(),
        )?,
        OutputFormat::Text => {
            println!("Available analyzers:");
            for name in names {
                let note = if engine.is_disabled(name) {
                    " (disabled)"
                } else {
                    ""
                };
                println!("  - {}{}", name, note);
            }
        }
    }
    Ok(())
}
