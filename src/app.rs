use paylink_sync::{PaidSession, SyncReport, SyncStatus};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

/// Most recent exported sessions kept for display.
pub const MAX_RECENT_EXPORTS: usize = 500;

/// Progress messages from the background sync task.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started,
    Finished(SyncReport),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Idle,
    Syncing,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub at: chrono::DateTime<chrono::Local>,
    pub status: SyncStatus,
    pub records: usize,
}

pub struct App {
    pub provider: String,
    pub links: Vec<String>,
    pub interval_secs: u64,
    pub state: RunState,
    pub start_time: chrono::DateTime<chrono::Local>,
    pub runs: u32,
    pub failures: u32,
    pub last_run: Option<RunSummary>,
    pub checkpoint: Option<i64>,
    /// Latest exported sessions, oldest first, capped at `MAX_RECENT_EXPORTS`.
    pub exported: VecDeque<PaidSession>,
    pub exported_count: usize,
    pub totals: BTreeMap<String, Decimal>,
    pub snapshots_written: usize,
    pub error_message: Option<String>,
    pub tick: u32,
}

impl App {
    pub fn new(provider: String, links: Vec<String>, interval_secs: u64) -> Self {
        Self {
            provider,
            links,
            interval_secs,
            state: RunState::Idle,
            start_time: chrono::Local::now(),
            runs: 0,
            failures: 0,
            last_run: None,
            checkpoint: None,
            exported: VecDeque::new(),
            exported_count: 0,
            totals: BTreeMap::new(),
            snapshots_written: 0,
            error_message: None,
            tick: 0,
        }
    }

    pub fn apply(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Started => self.state = RunState::Syncing,
            SyncEvent::Finished(report) => self.record_run(report),
        }
    }

    fn record_run(&mut self, report: SyncReport) {
        self.state = RunState::Idle;
        self.runs += 1;
        self.last_run = Some(RunSummary {
            at: chrono::Local::now(),
            status: report.status,
            records: report.data.len(),
        });

        if report.is_error() {
            self.failures += 1;
            self.error_message = report.message;
            return;
        }

        self.error_message = None;
        if report.checkpoint.is_some() {
            self.checkpoint = report.checkpoint;
        }
        if report.snapshot.is_some() {
            self.snapshots_written += 1;
        }
        for record in report.data {
            *self.totals.entry(record.currency.clone()).or_insert(Decimal::ZERO) += record.amount;
            self.exported_count += 1;
            if self.exported.len() == MAX_RECENT_EXPORTS {
                self.exported.pop_front();
            }
            self.exported.push_back(record);
        }
    }

    pub fn session_duration(&self) -> chrono::Duration {
        chrono::Local::now() - self.start_time
    }
}
