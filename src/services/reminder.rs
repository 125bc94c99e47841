use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::{Task, TaskId, TaskStatus};

/// Wall clock used to turn reminder timestamps into delays.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The machine's clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPolicy {
    /// Reminders further out than this are left for a later reconcile.
    pub horizon: Duration,
    pub snooze: Duration,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            horizon: Duration::from_secs(7 * 24 * 60 * 60),
            snooze: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderKey {
    pub task_id: TaskId,
    pub at: DateTime<Utc>,
}

/// What a fired timer hands to the notification callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub task_id: TaskId,
    pub title: String,
    pub at: DateTime<Utc>,
}

impl Reminder {
    /// Identity of the timer that produced this reminder.
    pub fn key(&self) -> ReminderKey {
        ReminderKey {
            task_id: self.task_id.clone(),
            at: self.at,
        }
    }

    /// Notification text: the title and the local time it was due.
    pub fn body(&self) -> String {
        format!("{} at {}", self.title, self.at.with_timezone(&Local).format("%H:%M"))
    }
}

/// Timer changes made by one `reconcile` call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scheduled: usize,
    pub cancelled: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Reminder,
    Snooze,
}

struct Timer {
    id: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    scheduled: HashMap<ReminderKey, Timer>,
    snoozed: HashMap<ReminderKey, Timer>,
    // Keys that already fired, remembered while the task still carries them.
    fired: HashSet<ReminderKey>,
    next_id: u64,
}

impl Timers {
    fn slot(&mut self, kind: TimerKind) -> &mut HashMap<ReminderKey, Timer> {
        match kind {
            TimerKind::Reminder => &mut self.scheduled,
            TimerKind::Snooze => &mut self.snoozed,
        }
    }
}

type FireFn = dyn Fn(Reminder) + Send + Sync;

/// One-shot local reminders for a changing task set.
///
/// Each timer is a tokio task keyed by `(task id, reminder instant)`. `reconcile` applies
/// the minimal diff between the tasks it is given and the timers already running, so an
/// unchanged reminder keeps its original timer. Timers must be created from inside a
/// tokio runtime. Dropping the scheduler cancels everything still pending.
pub struct ReminderScheduler {
    policy: ReminderPolicy,
    clock: Arc<dyn Clock>,
    on_fire: Arc<FireFn>,
    timers: Arc<Mutex<Timers>>,
}

impl ReminderScheduler {
    /// Scheduler on the system clock; `on_fire` runs on the timer task.
    pub fn new<F>(policy: ReminderPolicy, on_fire: F) -> Self
    where
        F: Fn(Reminder) + Send + Sync + 'static,
    {
        Self::with_clock(policy, Arc::new(SystemClock), on_fire)
    }

    /// Scheduler that measures delays against `clock`.
    pub fn with_clock<F>(policy: ReminderPolicy, clock: Arc<dyn Clock>, on_fire: F) -> Self
    where
        F: Fn(Reminder) + Send + Sync + 'static,
    {
        Self {
            policy,
            clock,
            on_fire: Arc::new(on_fire),
            timers: Arc::new(Mutex::new(Timers::default())),
        }
    }

    /// Horizon and snooze in effect for this scheduler.
    pub fn policy(&self) -> ReminderPolicy {
        self.policy
    }

    /// Bring the running timers in line with `tasks` and report what changed.
    pub fn reconcile(&self, tasks: &[Task]) -> ReconcileReport {
        let now = self.clock.now();
        let mut candidates: HashMap<ReminderKey, &Task> = HashMap::new();
        let mut live: HashSet<&TaskId> = HashSet::new();

        for task in tasks {
            if task.status == TaskStatus::Completed {
                continue;
            }
            live.insert(&task.id);
            let Some(raw) = task.reminder_date.as_deref() else {
                continue;
            };
            let Some(at) = task.reminder_instant() else {
                debug!("Ignoring unreadable reminder {:?} on task {}", raw, task.id);
                continue;
            };
            candidates.insert(
                ReminderKey {
                    task_id: task.id.clone(),
                    at,
                },
                task,
            );
        }

        let mut report = ReconcileReport::default();
        let mut timers = self.lock();

        let gone: Vec<ReminderKey> = timers
            .scheduled
            .keys()
            .filter(|key| !candidates.contains_key(*key))
            .cloned()
            .collect();
        for key in gone {
            if let Some(timer) = timers.scheduled.remove(&key) {
                timer.handle.abort();
                debug!("Cancelled reminder for task {} at {}", key.task_id, key.at);
                report.cancelled += 1;
            }
        }

        let orphaned: Vec<ReminderKey> = timers
            .snoozed
            .keys()
            .filter(|key| !live.contains(&key.task_id))
            .cloned()
            .collect();
        for key in orphaned {
            if let Some(timer) = timers.snoozed.remove(&key) {
                timer.handle.abort();
                debug!("Cancelled snoozed reminder for task {}", key.task_id);
                report.cancelled += 1;
            }
        }

        timers.fired.retain(|key| candidates.contains_key(key));

        for (key, task) in candidates {
            if timers.scheduled.contains_key(&key) {
                report.kept += 1;
                continue;
            }
            if timers.fired.contains(&key) {
                continue;
            }
            let Some(delay) = self.eligible_delay(key.at, now) else {
                continue;
            };
            let reminder = Reminder {
                task_id: key.task_id,
                title: task.title.clone(),
                at: key.at,
            };
            debug!("Scheduling reminder for task {} in {:?}", reminder.task_id, delay);
            self.spawn_timer(&mut timers, TimerKind::Reminder, reminder, delay);
            report.scheduled += 1;
        }

        report
    }

    /// Fire `reminder` again after the policy's snooze interval.
    pub fn snooze(&self, reminder: &Reminder) -> Reminder {
        let delay = self.policy.snooze;
        let now = self.clock.now();
        let at = TimeDelta::from_std(delay)
            .ok()
            .and_then(|offset| now.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let snoozed = Reminder {
            at,
            ..reminder.clone()
        };

        let mut timers = self.lock();
        if !timers.snoozed.contains_key(&snoozed.key()) {
            debug!("Snoozing reminder for task {} until {}", snoozed.task_id, snoozed.at);
            self.spawn_timer(&mut timers, TimerKind::Snooze, snoozed.clone(), delay);
        }
        snoozed
    }

    /// Cancel one pending timer. Unknown, fired or already cancelled keys are a no-op.
    pub fn cancel(&self, key: &ReminderKey) -> bool {
        let mut guard = self.lock();
        let timers = &mut *guard;
        let timer = timers.scheduled.remove(key).or_else(|| timers.snoozed.remove(key));
        match timer {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every outstanding timer. Safe to call more than once.
    pub fn dispose(&self) {
        let mut guard = self.lock();
        let timers = &mut *guard;
        let count = timers.scheduled.len() + timers.snoozed.len();
        for (_, timer) in timers.scheduled.drain().chain(timers.snoozed.drain()) {
            timer.handle.abort();
        }
        timers.fired.clear();
        if count > 0 {
            debug!("Disposed {} pending reminders", count);
        }
    }

    /// Timers still waiting to fire, snoozes included.
    pub fn outstanding(&self) -> usize {
        let timers = self.lock();
        timers.scheduled.len() + timers.snoozed.len()
    }

    /// Whether a reconcile timer for `key` is waiting. Snoozes are not counted.
    pub fn is_scheduled(&self, key: &ReminderKey) -> bool {
        self.lock().scheduled.contains_key(key)
    }

    /// Keys of the waiting reconcile timers, in no particular order.
    pub fn scheduled_keys(&self) -> Vec<ReminderKey> {
        self.lock().scheduled.keys().cloned().collect()
    }

    fn eligible_delay(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
        (at - now)
            .to_std()
            .ok()
            .filter(|delay| !delay.is_zero() && *delay < self.policy.horizon)
    }

    fn spawn_timer(&self, timers: &mut Timers, kind: TimerKind, reminder: Reminder, delay: Duration) {
        timers.next_id += 1;
        let id = timers.next_id;
        let key = reminder.key();
        let deadline = Instant::now() + delay;
        let shared = Arc::clone(&self.timers);
        let on_fire = Arc::clone(&self.on_fire);

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if claim(&shared, kind, &reminder.key(), id) {
                info!("Reminder fired for task {}: {}", reminder.task_id, reminder.title);
                on_fire(reminder);
            }
        });
        timers.slot(kind).insert(key, Timer { id, handle });
    }

    fn lock(&self) -> MutexGuard<'_, Timers> {
        lock(&self.timers)
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

// A timer only fires if it is still the registered timer for its key.
fn claim(timers: &Mutex<Timers>, kind: TimerKind, key: &ReminderKey, id: u64) -> bool {
    let mut timers = lock(timers);
    let slot = timers.slot(kind);
    if slot.get(key).map(|t| t.id) != Some(id) {
        return false;
    }
    slot.remove(key);
    if kind == TimerKind::Reminder {
        timers.fired.insert(key.clone());
    }
    true
}

fn lock(timers: &Mutex<Timers>) -> MutexGuard<'_, Timers> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}
