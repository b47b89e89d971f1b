//! Structured logging for the pattern tracker.
//!
//! Every record is one JSON object per line on stderr. When `LOG_DIR` is set
//! the same lines are appended to `$LOG_DIR/<run_id>/events.jsonl`
//! (info and above) or `trace.jsonl` (debug/trace).
//!
//! Filtering: `LOG_LEVEL` (default `info`), `LOG_DOMAINS` (comma list or `all`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::error::TrackerError;
use crate::stats::AccuracyStats;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Intake,     // Tracking decisions, dropped patterns
    Resolution, // Ticks, success/failure transitions
    Stats,      // Aggregate snapshots
    Feed,       // Price/pattern sources, replay input
    System,     // Startup, shutdown
    Audit,      // State hashes for replay
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Intake => "intake",
            Domain::Resolution => "resolution",
            Domain::Stats => "stats",
            Domain::Feed => "feed",
            Domain::System => "system",
            Domain::Audit => "audit",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    sinks: Option<FileSinks>,
}

#[derive(Debug)]
struct FileSinks {
    events: Mutex<BufWriter<File>>,
    trace: Mutex<BufWriter<File>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let sinks = std::env::var("LOG_DIR")
            .ok()
            .and_then(|base| open_sinks(PathBuf::from(base).join(&run_id), &run_id));
        RunContext { run_id, sinks }
    })
}

fn open_sinks(run_dir: PathBuf, run_id: &str) -> Option<FileSinks> {
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }
    let _ = std::fs::write(
        run_dir.join("manifest.json"),
        json!({
            "run_id": run_id,
            "ts": ts_now(),
            "pid": process::id(),
            "log_dir": run_dir.to_string_lossy(),
        })
        .to_string(),
    );
    let open = |name: &str| match File::create(run_dir.join(name)) {
        Ok(f) => Some(Mutex::new(BufWriter::new(f))),
        Err(err) => {
            eprintln!("[log] failed to create {}: {}", name, err);
            None
        }
    };
    Some(FileSinks {
        events: open("events.jsonl")?,
        trace: open("trace.jsonl")?,
    })
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["id", "pattern_id", "instrument", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let line = build_record(level, domain, event, fields).to_string();

    let ctx = ensure_run_context();
    if let Some(sinks) = &ctx.sinks {
        match level {
            Level::Trace | Level::Debug => write_line(&sinks.trace, &line),
            _ => write_line(&sinks.events, &line),
        }
    }
    eprintln!("{}", line);
}

fn build_record(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) -> Value {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_tracked(id: &str, pattern_id: &str, entry_price: f64, target_price: f64, stop_loss: f64) {
    log(
        Level::Info,
        Domain::Intake,
        "tracked",
        obj(&[
            ("id", v_str(id)),
            ("pattern_id", v_str(pattern_id)),
            ("entry_price", v_num(entry_price)),
            ("target_price", v_num(target_price)),
            ("stop_loss", v_num(stop_loss)),
        ]),
    );
}

pub fn log_resolved(id: &str, outcome: &str, price: f64, pnl_percent: f64, resolved_at: u64) {
    log(
        Level::Info,
        Domain::Resolution,
        "resolved",
        obj(&[
            ("id", v_str(id)),
            ("outcome", v_str(outcome)),
            ("price", v_num(price)),
            ("pnl_percent", v_num(pnl_percent)),
            ("resolved_at", json!(resolved_at)),
        ]),
    );
}

pub fn log_dropped(pattern_id: &str, reason: &str) {
    log(
        Level::Warn,
        Domain::Intake,
        "pattern_dropped",
        obj(&[("pattern_id", v_str(pattern_id)), ("reason", v_str(reason))]),
    );
}

pub fn log_rejected(op: &str, err: &TrackerError) {
    log(
        Level::Warn,
        Domain::Resolution,
        "rejected",
        obj(&[
            ("op", v_str(op)),
            ("code", v_str(err.code())),
            ("msg", v_str(&err.to_string())),
        ]),
    );
}

pub fn log_cleared(removed: usize) {
    log(
        Level::Info,
        Domain::Resolution,
        "cleared_resolved",
        obj(&[("removed", json!(removed))]),
    );
}

pub fn log_removed(id: &str) {
    log(Level::Info, Domain::Resolution, "removed", obj(&[("id", v_str(id))]));
}

pub fn log_audit(op: &str, seq: u64, state_hash: u64) {
    log(
        Level::Debug,
        Domain::Audit,
        op,
        obj(&[
            ("seq", json!(seq)),
            ("state_hash", v_str(&format!("{:016x}", state_hash))),
        ]),
    );
}

/// Session summary on shutdown
pub fn log_stats_summary(instrument: &str, stats: &AccuracyStats) {
    log(
        Level::Info,
        Domain::Stats,
        "summary",
        obj(&[
            ("instrument", v_str(instrument)),
            ("total", json!(stats.total)),
            ("pending", json!(stats.pending)),
            ("success", json!(stats.success)),
            ("failure", json!(stats.failure)),
            ("win_rate", v_num(stats.win_rate)),
            ("avg_pnl", v_num(stats.avg_pnl)),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
