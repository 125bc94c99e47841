use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::client::TaskApi;
use crate::error::AppError;
use crate::models::{BoardStats, Task, TaskFilter, TaskId, TaskStatus};

/// An immutable, complete copy of the task list.
pub type Snapshot = Arc<Vec<Task>>;

const NOTICE_CAPACITY: usize = 32;

/// One kanban column per status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Columns {
    pub pending: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub completed: Vec<Task>,
}

impl Columns {
    /// The column holding tasks with `status`.
    pub fn get(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Pending => &self.pending,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Completed => &self.completed,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len() + self.in_progress.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tasks matching every set field of `filter`, in their original order.
pub fn apply_filter(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    tasks.iter().filter(|t| filter.matches(t)).cloned().collect()
}

/// Partition into one column per status. Every task lands in exactly one column.
pub fn group_by_status(tasks: &[Task]) -> Columns {
    let mut columns = Columns::default();
    for task in tasks {
        let column = match task.status {
            TaskStatus::Pending => &mut columns.pending,
            TaskStatus::InProgress => &mut columns.in_progress,
            TaskStatus::Completed => &mut columns.completed,
        };
        column.push(task.clone());
    }
    columns
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The server accepted the newest requested status.
    Confirmed,
    /// The server refused; the board was re-fetched.
    Rejected(String),
    /// A later move of the same task was issued before this one resolved.
    Superseded,
    /// The task is not on the board; nothing was sent.
    NotFound,
}

/// Non-blocking, user-facing failure notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardNotice {
    LoadFailed { message: String },
    MoveRejected { task_id: TaskId, message: String },
}

impl fmt::Display for BoardNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardNotice::LoadFailed { message } => write!(f, "Could not refresh tasks: {}", message),
            BoardNotice::MoveRejected { task_id, message } => {
                write!(f, "Could not move task {}: {}", task_id, message)
            }
        }
    }
}

struct InFlight {
    seq: u64,
    status: TaskStatus,
}

// Releases its in-flight slot when dropped unsettled, so an abandoned move
// cannot pin its optimistic status over later loads.
struct MoveTicket {
    task_id: TaskId,
    status: TaskStatus,
    seq: u64,
    settled: bool,
    state: Arc<Mutex<BoardState>>,
}

impl Drop for MoveTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.in_flight.get(&self.task_id).map(|f| f.seq) == Some(self.seq) {
            state.in_flight.remove(&self.task_id);
            debug!("Move of task {} (seq {}) abandoned before the server replied", self.task_id, self.seq);
        }
    }
}

struct BoardState {
    snapshot: Snapshot,
    loads_issued: u64,
    loads_applied: u64,
    next_move_seq: u64,
    // Newest unresolved move per task.
    in_flight: HashMap<TaskId, InFlight>,
}

/// Owns the authoritative task snapshot and the optimistic moves layered on it.
///
/// Cloning is cheap and every clone shares the same board.
#[derive(Clone)]
pub struct TaskBoardModel {
    api: Arc<dyn TaskApi>,
    state: Arc<Mutex<BoardState>>,
    snapshots: Arc<watch::Sender<Snapshot>>,
    notices: broadcast::Sender<BoardNotice>,
}

impl TaskBoardModel {
    /// Empty board backed by `api`. Call [`TaskBoardModel::load`] to fill it.
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        let snapshot: Snapshot = Arc::new(Vec::new());
        let (snapshots, _) = watch::channel(snapshot.clone());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            api,
            state: Arc::new(Mutex::new(BoardState {
                snapshot,
                loads_issued: 0,
                loads_applied: 0,
                next_move_seq: 0,
                in_flight: HashMap::new(),
            })),
            snapshots: Arc::new(snapshots),
            notices,
        }
    }

    /// Current snapshot, shared read-only.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot.clone()
    }

    /// Receives every snapshot the board applies, optimistic edits included.
    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    /// Failure notices for the user, one per failed load or rejected move.
    pub fn subscribe(&self) -> broadcast::Receiver<BoardNotice> {
        self.notices.subscribe()
    }

    /// Filtered status columns, recomputed from the current snapshot.
    pub fn columns(&self, filter: &TaskFilter) -> Columns {
        let snapshot = self.snapshot();
        group_by_status(&apply_filter(&snapshot, filter))
    }

    /// Chart aggregates over the current snapshot.
    pub fn stats(&self) -> BoardStats {
        BoardStats::from_tasks(&self.snapshot())
    }

    /// Fetch a fresh snapshot and swap it in whole.
    ///
    /// On failure the previous snapshot stays in place and a notice is published.
    /// A response that arrives after a newer load has already been applied is dropped.
    pub async fn load(&self) -> Result<Snapshot, AppError> {
        let generation = {
            let mut state = self.lock();
            state.loads_issued += 1;
            state.loads_issued
        };

        let mut tasks = match self.api.fetch_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!("Task load failed, keeping last snapshot: {}", e);
                self.notify(BoardNotice::LoadFailed { message: e.to_string() });
                return Err(if e.is_fetch() { e } else { AppError::Fetch(e.to_string()) });
            }
        };

        let mut state = self.lock();
        if generation <= state.loads_applied {
            debug!("Dropping load #{} (already applied #{})", generation, state.loads_applied);
            return Ok(state.snapshot.clone());
        }

        for task in tasks.iter_mut() {
            if let Some(pending) = state.in_flight.get(&task.id) {
                task.status = pending.status;
            }
        }
        state.loads_applied = generation;
        let snapshot = self.publish(&mut state, tasks);
        debug!("Applied snapshot #{} with {} tasks", generation, snapshot.len());
        Ok(snapshot)
    }

    /// Move a task to `status` immediately, then confirm with the server.
    ///
    /// The local edit happens before this returns; the returned future carries the
    /// server round trip and the resync that follows it. Only the newest move of a
    /// given task is reconciled, so an older response can never undo a newer move.
    pub fn move_task(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> impl Future<Output = MoveOutcome> + Send + 'static {
        let ticket = self.apply_optimistic(task_id, status);
        let board = self.clone();
        async move {
            match ticket {
                Some(ticket) => board.submit(ticket).await,
                None => MoveOutcome::NotFound,
            }
        }
    }

    fn apply_optimistic(&self, task_id: &TaskId, status: TaskStatus) -> Option<MoveTicket> {
        let mut state = self.lock();
        let Some(position) = state.snapshot.iter().position(|t| &t.id == task_id) else {
            debug!("Move ignored, task {} is not on the board", task_id);
            return None;
        };

        state.next_move_seq += 1;
        let seq = state.next_move_seq;
        let mut tasks = state.snapshot.as_ref().clone();
        tasks[position].status = status;
        state.in_flight.insert(task_id.clone(), InFlight { seq, status });
        self.publish(&mut state, tasks);

        debug!("Task {} moved to {} (seq {})", task_id, status, seq);
        Some(MoveTicket {
            task_id: task_id.clone(),
            status,
            seq,
            settled: false,
            state: Arc::clone(&self.state),
        })
    }

    async fn submit(&self, mut ticket: MoveTicket) -> MoveOutcome {
        let result = self.api.update_task_status(&ticket.task_id, ticket.status).await;

        if let Err(e) = self.settle(&mut ticket, result.is_ok()) {
            debug!("{}", e);
            return MoveOutcome::Superseded;
        }

        let outcome = match result {
            Ok(updated) => {
                info!("Task {} confirmed as {}", ticket.task_id, ticket.status);
                if let Some(task) = updated {
                    self.replace_task(task);
                }
                MoveOutcome::Confirmed
            }
            Err(e) => {
                warn!("Moving task {} to {} failed: {}", ticket.task_id, ticket.status, e);
                self.notify(BoardNotice::MoveRejected {
                    task_id: ticket.task_id.clone(),
                    message: e.to_string(),
                });
                MoveOutcome::Rejected(e.to_string())
            }
        };

        if let Err(e) = self.load().await {
            warn!("Resync after moving task {} failed: {}", ticket.task_id, e);
        }
        outcome
    }

    // Retire the ticket if it is still the newest move of its task. Once the server has
    // accepted it, loads issued earlier may predate the change and are dropped.
    fn settle(&self, ticket: &mut MoveTicket, accepted: bool) -> Result<(), AppError> {
        let mut state = self.lock();
        ticket.settled = true;
        let newest = state.in_flight.get(&ticket.task_id).map(|f| f.seq);
        if newest != Some(ticket.seq) {
            return Err(AppError::StaleResponseDiscarded {
                task_id: ticket.task_id.clone(),
                seq: ticket.seq,
            });
        }
        state.in_flight.remove(&ticket.task_id);
        if accepted {
            state.loads_applied = state.loads_issued;
        }
        Ok(())
    }

    fn replace_task(&self, mut task: Task) {
        let mut state = self.lock();
        let Some(position) = state.snapshot.iter().position(|t| t.id == task.id) else {
            return;
        };
        if let Some(pending) = state.in_flight.get(&task.id) {
            task.status = pending.status;
        }
        let mut tasks = state.snapshot.as_ref().clone();
        tasks[position] = task;
        self.publish(&mut state, tasks);
    }

    fn publish(&self, state: &mut BoardState, tasks: Vec<Task>) -> Snapshot {
        let snapshot: Snapshot = Arc::new(tasks);
        state.snapshot = snapshot.clone();
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    fn notify(&self, notice: BoardNotice) {
        // Nobody listening is fine.
        let _ = self.notices.send(notice);
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
