//! Per-session context: the last delivered record list and the selected
//! period. Every change to either is broadcast so views can recompute.

use std::sync::Arc;

use shared::{
    aggregate::{aggregate, Aggregate},
    domain::{Period, Record},
};
use tokio::sync::watch;
use tracing::info;

/// Receives the record list produced by a successful intake.
pub trait RecordSink: Send + Sync {
    fn receive(&self, records: Vec<Record>);
}

pub struct Session {
    records: watch::Sender<Arc<Vec<Record>>>,
    period: watch::Sender<Period>,
}

impl Session {
    pub fn new(period: Period) -> Self {
        let (records, _) = watch::channel(Arc::new(Vec::new()));
        let (period, _) = watch::channel(period);
        Self { records, period }
    }

    pub fn records(&self) -> Arc<Vec<Record>> {
        self.records.borrow().clone()
    }

    pub fn period(&self) -> Period {
        *self.period.borrow()
    }

    pub fn set_period(&self, period: Period) {
        self.period.send_replace(period);
    }

    /// Replaces the record list wholesale.
    pub fn replace_records(&self, records: Vec<Record>) {
        info!(records = records.len(), "session records replaced");
        self.records.send_replace(Arc::new(records));
    }

    pub fn view(&self) -> Aggregate {
        aggregate(&self.records(), self.period())
    }

    pub fn subscribe(&self) -> SessionWatcher {
        SessionWatcher {
            records: self.records.subscribe(),
            period: self.period.subscribe(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Period::current())
    }
}

impl RecordSink for Session {
    fn receive(&self, records: Vec<Record>) {
        self.replace_records(records);
    }
}

pub struct SessionWatcher {
    records: watch::Receiver<Arc<Vec<Record>>>,
    period: watch::Receiver<Period>,
}

impl SessionWatcher {
    /// Waits for the next data or period change and returns the recomputed
    /// view. Returns `None` once the session is gone.
    pub async fn changed(&mut self) -> Option<Aggregate> {
        tokio::select! {
            res = self.records.changed() => res.ok()?,
            res = self.period.changed() => res.ok()?,
        }
        Some(self.current())
    }

    pub fn current(&mut self) -> Aggregate {
        let records = self.records.borrow_and_update().clone();
        let period = *self.period.borrow_and_update();
        aggregate(&records, period)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
