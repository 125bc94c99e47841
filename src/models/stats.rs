use std::collections::HashMap;

use serde::Serialize;

use super::task::{Priority, Task, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub by_priority: PriorityCounts,
    pub score_by_category: Vec<CategoryScore>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub name: String,
    pub avg: f64,
}

impl BoardStats {
    /// Aggregate `tasks`; categories are sorted by descending average score.
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut stats = BoardStats {
            total: tasks.len(),
            ..Default::default()
        };
        let mut scores: HashMap<&str, (f64, usize)> = HashMap::new();

        for task in tasks {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            match task.priority {
                Priority::High => stats.by_priority.high += 1,
                Priority::Medium => stats.by_priority.medium += 1,
                Priority::Low => stats.by_priority.low += 1,
            }
            let entry = scores.entry(task.effective_category()).or_default();
            entry.0 += task.priority_score.unwrap_or(0.0);
            entry.1 += 1;
        }

        stats.score_by_category = scores
            .into_iter()
            .map(|(name, (sum, count))| CategoryScore {
                name: name.to_string(),
                avg: (sum / count as f64 * 10.0).round() / 10.0,
            })
            .collect();
        stats
            .score_by_category
            .sort_by(|a, b| b.avg.total_cmp(&a.avg).then_with(|| a.name.cmp(&b.name)));

        stats
    }
}
