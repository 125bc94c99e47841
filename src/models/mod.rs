pub mod filter;
pub mod stats;
pub mod task;

pub use filter::TaskFilter;
pub use stats::{BoardStats, CategoryScore, PriorityCounts};
pub use task::{Priority, Task, TaskId, TaskStatus, UNCATEGORIZED, parse_timestamp};
