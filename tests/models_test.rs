use chrono::{Local, NaiveDate, TimeZone, Utc};

use taskgenius::models::{BoardStats, Priority, Task, TaskId, TaskStatus, parse_timestamp};

fn scored(id: i64, category: Option<&str>, score: Option<f64>, status: TaskStatus, priority: Priority) -> Task {
    let mut task = Task::new(id, format!("task {}", id));
    task.category = category.map(str::to_string);
    task.priority_score = score;
    task.status = status;
    task.priority = priority;
    task
}

#[test]
fn test_task_decoding_is_lenient() {
    let task: Task = serde_json::from_str(r#"{"id": "t-9", "title": "Sketch", "status": "archived"}"#).unwrap();
    assert_eq!(task.id, TaskId::Str("t-9".to_string()));
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.effective_category(), "Uncategorized");
    assert_eq!(task.reminder_instant(), None);

    let empty_category: Task = serde_json::from_str(r#"{"id": 3, "title": "x", "category": ""}"#).unwrap();
    assert_eq!(empty_category.effective_category(), "Uncategorized");
}

#[test]
fn test_status_round_trips_as_snake_case() {
    let json = serde_json::to_value(TaskStatus::InProgress).unwrap();
    assert_eq!(json, "in_progress");
    assert_eq!("completed".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
    assert!("done".parse::<TaskStatus>().is_err());
}

#[test]
fn test_parse_timestamp_formats() {
    let utc = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
    assert_eq!(parse_timestamp("2026-03-02T09:30:00Z"), Some(utc));
    assert_eq!(parse_timestamp("2026-03-02T10:30:00+01:00"), Some(utc));

    let naive = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(9, 30, 0).unwrap();
    let local = Local.from_local_datetime(&naive).earliest().unwrap().with_timezone(&Utc);
    assert_eq!(parse_timestamp("2026-03-02T09:30:00"), Some(local));
    assert_eq!(parse_timestamp("2026-03-02T09:30"), Some(local));
    assert_eq!(parse_timestamp("2026-03-02T09:30:00.000000"), Some(local));

    assert_eq!(parse_timestamp("tomorrow"), None);
    assert_eq!(parse_timestamp(""), None);
}

#[test]
fn test_board_stats() {
    let tasks = vec![
        scored(1, Some("Work"), Some(80.0), TaskStatus::Pending, Priority::High),
        scored(2, Some("Work"), Some(65.0), TaskStatus::InProgress, Priority::Medium),
        scored(3, None, Some(40.0), TaskStatus::Completed, Priority::Low),
        scored(4, Some("Home"), None, TaskStatus::Pending, Priority::Medium),
        scored(5, Some("Home"), Some(33.4), TaskStatus::Pending, Priority::High),
    ];

    let stats = BoardStats::from_tasks(&tasks);
    assert_eq!(stats.total, 5);
    assert_eq!((stats.pending, stats.in_progress, stats.completed), (3, 1, 1));
    assert_eq!((stats.by_priority.high, stats.by_priority.medium, stats.by_priority.low), (2, 2, 1));

    let names: Vec<&str> = stats.score_by_category.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Work", "Uncategorized", "Home"]);
    assert_eq!(stats.score_by_category[0].avg, 72.5);
    assert_eq!(stats.score_by_category[1].avg, 40.0);
    // missing score counts as zero
    assert_eq!(stats.score_by_category[2].avg, 16.7);
}

#[test]
fn test_board_stats_empty() {
    let stats = BoardStats::from_tasks(&[]);
    assert_eq!(stats.total, 0);
    assert!(stats.score_by_category.is_empty());
}
