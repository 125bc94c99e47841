use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::Task;
use crate::services::board::TaskBoardModel;
use crate::services::reminder::ReminderScheduler;

/// Keeps the board fresh and the reminder timers in step with it.
pub struct BoardRefresher {
    board: TaskBoardModel,
    reminders: Arc<ReminderScheduler>,
    interval: Duration,
}

impl BoardRefresher {
    /// Nothing runs until [`BoardRefresher::start`] is awaited.
    pub fn new(board: TaskBoardModel, reminders: Arc<ReminderScheduler>, interval: Duration) -> Self {
        Self {
            board,
            reminders,
            interval,
        }
    }

    /// Load now, then every interval. Runs until the task is aborted.
    pub async fn start(self) {
        info!(
            "Starting board refresher (interval: {:?}, reminder horizon: {:?})",
            self.interval,
            self.reminders.policy().horizon
        );

        let mut snapshots = self.board.watch();
        self.run_refresh().await;
        let _ = snapshots.borrow_and_update();

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_refresh().await;
                    let _ = snapshots.borrow_and_update();
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.reconcile(&snapshot);
                }
            }
        }
    }

    async fn run_refresh(&self) {
        match self.board.load().await {
            Ok(snapshot) => {
                let stats = self.board.stats();
                debug!(
                    "Board refreshed - {} tasks | pending: {}, in progress: {}, completed: {}",
                    snapshot.len(),
                    stats.pending,
                    stats.in_progress,
                    stats.completed
                );
            }
            Err(e) => {
                // Keep going on the last good snapshot.
                warn!("Board refresh failed: {}", e);
            }
        }
        // Time moves even when the load fails, so reminders entering the horizon still get picked up.
        let snapshot = self.board.snapshot();
        self.reconcile(&snapshot);
    }

    fn reconcile(&self, tasks: &[Task]) {
        let report = self.reminders.reconcile(tasks);
        if report.scheduled > 0 || report.cancelled > 0 {
            info!(
                "Reminders reconciled - scheduled: {}, cancelled: {}, kept: {}",
                report.scheduled, report.cancelled, report.kept
            );
        }
    }
}
