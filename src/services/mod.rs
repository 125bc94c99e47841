pub mod board;
pub mod refresher;
pub mod reminder;

pub use board::{BoardNotice, Columns, MoveOutcome, Snapshot, TaskBoardModel, apply_filter, group_by_status};
pub use refresher::BoardRefresher;
pub use reminder::{Clock, ReconcileReport, Reminder, ReminderKey, ReminderPolicy, ReminderScheduler, SystemClock};
