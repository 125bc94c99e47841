use serde::{Deserialize, Serialize};

use super::task::Task;

/// Board filter. A field that is absent, empty, or `"all"` matches every task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TaskFilter {
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// True when `task` satisfies every field that is not a wildcard.
    pub fn matches(&self, task: &Task) -> bool {
        field_matches(&self.category, task.effective_category())
            && field_matches(&self.priority, task.priority.as_str())
            && field_matches(&self.status, task.status.as_str())
    }
}

fn field_matches(wanted: &Option<String>, actual: &str) -> bool {
    match wanted.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(w) if w.eq_ignore_ascii_case("all") => true,
        Some(w) => w == actual,
    }
}
