#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::{mpsc, oneshot};

use taskgenius::client::TaskApi;
use taskgenius::error::AppError;
use taskgenius::models::{Task, TaskId, TaskStatus};
use taskgenius::services::Clock;

/// An update request held until the test decides how it resolves.
pub struct PendingUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
    reply: oneshot::Sender<Result<(), String>>,
}

impl PendingUpdate {
    pub fn succeed(self) {
        let _ = self.reply.send(Ok(()));
    }

    pub fn fail(self, message: &str) {
        let _ = self.reply.send(Err(message.to_string()));
    }
}

/// A fetch that captured the server state when it was issued and waits to be answered.
pub struct PendingFetch {
    reply: oneshot::Sender<bool>,
}

impl PendingFetch {
    pub fn release(self) {
        let _ = self.reply.send(true);
    }

    pub fn fail(self) {
        let _ = self.reply.send(false);
    }
}

/// In-memory stand-in for the task API.
pub struct FakeApi {
    server: Mutex<Vec<Task>>,
    fail_fetch: AtomicBool,
    fetches: AtomicUsize,
    updates: AtomicUsize,
    gate: Option<mpsc::UnboundedSender<PendingUpdate>>,
    fetch_gate: Option<mpsc::UnboundedSender<PendingFetch>>,
}

impl FakeApi {
    pub fn new(tasks: Vec<Task>) -> Arc<Self> {
        Arc::new(Self {
            server: Mutex::new(tasks),
            fail_fetch: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            gate: None,
            fetch_gate: None,
        })
    }

    /// Updates wait on the returned receiver to be resolved.
    pub fn gated(tasks: Vec<Task>) -> (Arc<Self>, mpsc::UnboundedReceiver<PendingUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = Arc::new(Self {
            server: Mutex::new(tasks),
            fail_fetch: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            gate: Some(tx),
            fetch_gate: None,
        });
        (api, rx)
    }

    /// Fetches wait on the returned receiver; updates apply at once.
    pub fn gated_fetches(tasks: Vec<Task>) -> (Arc<Self>, mpsc::UnboundedReceiver<PendingFetch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = Arc::new(Self {
            server: Mutex::new(tasks),
            fail_fetch: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            gate: None,
            fetch_gate: Some(tx),
        });
        (api, rx)
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        *self.server.lock().unwrap() = tasks;
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    fn apply(&self, id: &TaskId, status: TaskStatus) -> Option<Task> {
        let mut server = self.server.lock().unwrap();
        let task = server.iter_mut().find(|t| &t.id == id)?;
        task.status = status;
        task.priority_score = Some(task.priority_score.unwrap_or(0.0) + 1.0);
        Some(task.clone())
    }
}

#[async_trait]
impl TaskApi for FakeApi {
    async fn fetch_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::Fetch("connection refused".to_string()));
        }
        let tasks = self.server.lock().unwrap().clone();
        if let Some(gate) = &self.fetch_gate {
            let (reply, rx) = oneshot::channel();
            gate.send(PendingFetch { reply })
                .map_err(|_| AppError::Fetch("gate closed".to_string()))?;
            if !rx.await.unwrap_or(false) {
                return Err(AppError::Fetch("connection reset".to_string()));
            }
        }
        Ok(tasks)
    }

    async fn update_task_status(&self, id: &TaskId, status: TaskStatus) -> Result<Option<Task>, AppError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            let (reply, rx) = oneshot::channel();
            gate.send(PendingUpdate {
                task_id: id.clone(),
                status,
                reply,
            })
            .map_err(|_| AppError::Fetch("gate closed".to_string()))?;
            match rx.await {
                Ok(Ok(())) => {}
                Ok(Err(message)) => return Err(AppError::Fetch(message)),
                Err(_) => return Err(AppError::Fetch("request dropped".to_string())),
            }
        }
        Ok(self.apply(id, status))
    }
}

/// Wall clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self { now: Mutex::new(now) })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += TimeDelta::from_std(by).unwrap();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

pub fn task(id: i64, title: &str, status: TaskStatus) -> Task {
    let mut task = Task::new(id, title);
    task.status = status;
    task
}

pub fn reminder_task(id: i64, title: &str, at: DateTime<Utc>) -> Task {
    let mut task = Task::new(id, title);
    task.reminder_date = Some(at.to_rfc3339());
    task
}

/// Let spawned tasks run until they block again.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
