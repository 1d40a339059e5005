//! Deterministic timer queue for detector work.
//!
//! Tasks never run on their own: the host calls `run_due(now)` from its
//! event loop. A task decides after each run whether it is done or wants
//! to run again, so repeated work (snapshot re-emission, the exit-API
//! probe) is one task with its own counter instead of a free-running
//! interval.

use core_types::Millis;

const MIN_INTERVAL_MS: Millis = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Next {
    Done,
    After(Millis),
}

pub type Task = Box<dyn FnMut(Millis) -> Next>;

struct Scheduled {
    id: TaskId,
    due: Millis,
    label: &'static str,
    task: Task,
}

#[derive(Default)]
pub struct Scheduler {
    next_id: u64,
    tasks: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_at(&mut self, due: Millis, label: &'static str, task: Task) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(Scheduled {
            id,
            due,
            label,
            task,
        });
        id
    }

    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_pending(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.tasks.iter().map(|t| t.due).reduce(f64::min)
    }

    /// Pop the earliest task due at or before `now` (ties by creation
    /// order).
    fn take_next_due(&mut self, now: Millis) -> Option<Scheduled> {
        let idx = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)))
            .map(|(i, _)| i)?;
        Some(self.tasks.remove(idx))
    }

    fn put_back(&mut self, scheduled: Scheduled) {
        self.tasks.push(scheduled);
    }
}

/// Anything that owns a scheduler behind a shared borrow. The borrow is
/// released while a task runs, so tasks may schedule more work.
pub trait SchedulerCell {
    fn with_scheduler<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R;

    /// Run every task due at or before `now`, in due order. A task asking
    /// to run again is re-queued relative to its own due time, so a long
    /// gap between calls replays each missed tick. Returns how many runs
    /// happened.
    fn run_due(&self, now: Millis) -> usize {
        let mut runs = 0;
        while let Some(mut scheduled) = self.with_scheduler(|s| s.take_next_due(now)) {
            runs += 1;
            log::trace!(target: "monitor.scheduler", "run {} due={}", scheduled.label, scheduled.due);
            match (scheduled.task)(scheduled.due) {
                Next::Done => {}
                Next::After(delay) => {
                    scheduled.due += delay.max(MIN_INTERVAL_MS);
                    self.with_scheduler(|s| s.put_back(scheduled));
                }
            }
        }
        runs
    }
}

impl SchedulerCell for std::cell::RefCell<Scheduler> {
    fn with_scheduler<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        f(&mut self.borrow_mut())
    }
}
