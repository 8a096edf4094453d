use std::error::Error as StdError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::error_chain_contains_io;
use crate::normalize::RecordSkip;
use crate::pipeline::PipelineState;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    #[serde(alias = "warn")]
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl Severity {
    /// Classify a failure: anything with I/O in its source chain is critical.
    pub fn for_error(e: &(dyn StdError + 'static)) -> Self {
        if error_chain_contains_io(e) {
            Severity::Critical
        } else {
            Severity::Error
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

/// Which kind of step produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Normalize,
    Load,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Normalize => f.write_str("normalize"),
            StageKind::Load => f.write_str("load"),
        }
    }
}

/// Context attached to every observer callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    pub kind: StageKind,
    /// Source path (or `<memory>`) for normalization; table name for loads.
    pub resource: String,
}

impl StageContext {
    pub fn normalize(source: impl Into<String>) -> Self {
        Self {
            kind: StageKind::Normalize,
            resource: source.into(),
        }
    }

    pub fn load(table: impl Into<String>) -> Self {
        Self {
            kind: StageKind::Load,
            resource: table.into(),
        }
    }
}

/// Counts reported when a stage completes.
///
/// For loads, `input` and `accepted` are both the number of appended rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageStats {
    pub input: usize,
    pub accepted: usize,
    pub skipped: usize,
}

/// Observer interface for pipeline outcomes.
///
/// Components receive an observer instead of configuring a global logger; implementors can record
/// metrics, write logs, or trigger alerts.
pub trait PipelineObserver: Send + Sync {
    /// Called once per rejected record.
    fn on_record_skipped(&self, _ctx: &StageContext, _skip: &RecordSkip) {}

    /// Called when a normalization or load step succeeds.
    fn on_stage_completed(&self, _ctx: &StageContext, _stats: StageStats) {}

    /// Called when a step fails.
    fn on_failure(&self, _ctx: &StageContext, _severity: Severity, _error: &(dyn StdError + 'static)) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        self.on_failure(ctx, severity, error)
    }

    /// Called on every pipeline state change.
    fn on_transition(&self, _from: PipelineState, _to: PipelineState) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PipelineObserver for NullObserver {}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_record_skipped(&self, ctx: &StageContext, skip: &RecordSkip) {
        for o in &self.observers {
            o.on_record_skipped(ctx, skip);
        }
    }

    fn on_stage_completed(&self, ctx: &StageContext, stats: StageStats) {
        for o in &self.observers {
            o.on_stage_completed(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_transition(&self, from: PipelineState, to: PipelineState) {
        for o in &self.observers {
            o.on_transition(from, to);
        }
    }
}

/// Emits structured `tracing` events.
///
/// Parse/extraction skips are logged at `warn`, rule rejections at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_record_skipped(&self, ctx: &StageContext, skip: &RecordSkip) {
        let record_id = skip.record_id.as_deref().unwrap_or("-");
        if skip.reason.severity() >= Severity::Warning {
            tracing::warn!(
                stage = %ctx.kind,
                resource = %ctx.resource,
                position = skip.position,
                record_id,
                reason = skip.reason.code(),
                cause = %skip.reason,
                "skipping record"
            );
        } else {
            tracing::info!(
                stage = %ctx.kind,
                resource = %ctx.resource,
                position = skip.position,
                record_id,
                reason = skip.reason.code(),
                cause = %skip.reason,
                "skipping record"
            );
        }
    }

    fn on_stage_completed(&self, ctx: &StageContext, stats: StageStats) {
        match ctx.kind {
            StageKind::Normalize => tracing::info!(
                stage = %ctx.kind,
                resource = %ctx.resource,
                input = stats.input,
                skipped = stats.skipped,
                "cleaned {} rows",
                stats.accepted
            ),
            StageKind::Load => tracing::info!(
                stage = %ctx.kind,
                resource = %ctx.resource,
                "loaded {} rows into {}",
                stats.accepted,
                ctx.resource
            ),
        }
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        tracing::error!(
            stage = %ctx.kind,
            resource = %ctx.resource,
            severity = severity.as_str(),
            cause = %error,
            "stage failed"
        );
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        tracing::error!(
            stage = %ctx.kind,
            resource = %ctx.resource,
            severity = severity.as_str(),
            cause = %error,
            alert = true,
            "stage failure alert"
        );
    }

    fn on_transition(&self, from: PipelineState, to: PipelineState) {
        tracing::debug!(%from, %to, "pipeline state change");
    }
}

/// Appends events to a local file as JSON lines.
#[derive(Debug)]
pub struct JsonFileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, event: serde_json::Value) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{event}");
        }
    }
}

impl PipelineObserver for JsonFileObserver {
    fn on_record_skipped(&self, ctx: &StageContext, skip: &RecordSkip) {
        self.append(json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "skip",
            "stage": ctx.kind.to_string(),
            "resource": ctx.resource,
            "position": skip.position,
            "record_id": skip.record_id,
            "reason": skip.reason.code(),
            "cause": skip.reason.to_string(),
        }));
    }

    fn on_stage_completed(&self, ctx: &StageContext, stats: StageStats) {
        self.append(json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "completed",
            "stage": ctx.kind.to_string(),
            "resource": ctx.resource,
            "input": stats.input,
            "accepted": stats.accepted,
            "skipped": stats.skipped,
        }));
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        self.append(json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "failure",
            "stage": ctx.kind.to_string(),
            "resource": ctx.resource,
            "severity": severity.as_str(),
            "cause": error.to_string(),
        }));
    }

    fn on_alert(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        self.append(json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "alert",
            "stage": ctx.kind.to_string(),
            "resource": ctx.resource,
            "severity": severity.as_str(),
            "cause": error.to_string(),
        }));
    }

    fn on_transition(&self, from: PipelineState, to: PipelineState) {
        self.append(json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "transition",
            "from": from.to_string(),
            "to": to.to_string(),
        }));
    }
}
