#![allow(dead_code)]

use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Mutex;

use customer_order_etl::ingestion::{PipelineObserver, Severity, StageContext, StageStats};
use customer_order_etl::normalize::RecordSkip;
use customer_order_etl::pipeline::PipelineState;

pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[derive(Default)]
pub struct RecordingObserver {
    pub skips: Mutex<Vec<(StageContext, RecordSkip)>>,
    pub completed: Mutex<Vec<(StageContext, StageStats)>>,
    pub failures: Mutex<Vec<(StageContext, Severity, String)>>,
    pub alerts: Mutex<Vec<Severity>>,
    pub transitions: Mutex<Vec<PipelineState>>,
}

impl RecordingObserver {
    pub fn skip_codes(&self) -> Vec<&'static str> {
        self.skips.lock().unwrap().iter().map(|(_, s)| s.reason.code()).collect()
    }

    pub fn skip_positions(&self) -> Vec<usize> {
        self.skips.lock().unwrap().iter().map(|(_, s)| s.position).collect()
    }

    pub fn last_stats(&self) -> Option<StageStats> {
        self.completed.lock().unwrap().last().map(|(_, s)| *s)
    }

    pub fn transitions(&self) -> Vec<PipelineState> {
        self.transitions.lock().unwrap().clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_record_skipped(&self, ctx: &StageContext, skip: &RecordSkip) {
        self.skips.lock().unwrap().push((ctx.clone(), skip.clone()));
    }

    fn on_stage_completed(&self, ctx: &StageContext, stats: StageStats) {
        self.completed.lock().unwrap().push((ctx.clone(), stats));
    }

    fn on_failure(&self, ctx: &StageContext, severity: Severity, error: &(dyn StdError + 'static)) {
        self.failures
            .lock()
            .unwrap()
            .push((ctx.clone(), severity, error.to_string()));
    }

    fn on_alert(&self, _ctx: &StageContext, severity: Severity, _error: &(dyn StdError + 'static)) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_transition(&self, _from: PipelineState, to: PipelineState) {
        self.transitions.lock().unwrap().push(to);
    }
}
