//! Task Queue
//!
//! The host loop's microtask queue. Work posted here runs on the next turn,
//! which is what lets several render requests made in the same turn collapse
//! into one flush.
//!
//! A turn drains a snapshot of the queue: tasks pushed while the turn runs
//! wait for the following turn. That keeps a state change raised during a
//! flush out of the flush that raised it.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::Result;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() -> Result<()> + Send>;

/// FIFO queue of deferred tasks.
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
    notify: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, task: Task) {
        self.tasks.lock().push_back(task);
        self.notify.notify_one();
    }

    /// Run every task that was queued when the turn started.
    ///
    /// Returns how many tasks ran. If a task fails, the rest of the turn is
    /// put back at the front of the queue and the error is returned.
    pub fn run_turn(&self) -> Result<usize> {
        let mut turn = std::mem::take(&mut *self.tasks.lock());
        let mut ran = 0;

        while let Some(task) = turn.pop_front() {
            ran += 1;
            if let Err(err) = task() {
                if !turn.is_empty() {
                    let mut tasks = self.tasks.lock();
                    // Newer tasks stay behind the leftovers of this turn.
                    turn.append(&mut tasks);
                    *tasks = turn;
                    self.notify.notify_one();
                }
                return Err(err);
            }
        }

        Ok(ran)
    }

    /// Wait until at least one task is queued.
    pub async fn ready(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Drop every queued task without running it.
    pub fn clear(&self) {
        self.tasks.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn tasks_run_in_order() {
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let log = log.clone();
            queue.push(Box::new(move || {
                log.lock().push(n);
                Ok(())
            }));
        }

        assert_eq!(queue.run_turn().unwrap(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn tasks_queued_during_a_turn_wait_for_the_next() {
        let queue = Arc::new(TaskQueue::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let inner_queue = queue.clone();
        let inner_runs = runs.clone();
        queue.push(Box::new(move || {
            let runs = inner_runs.clone();
            inner_queue.push(Box::new(move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            Ok(())
        }));

        assert_eq!(queue.run_turn().unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.run_turn().unwrap(), 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_requeues_the_rest_of_the_turn() {
        let queue = TaskQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        queue.push(Box::new(|| Err(RuntimeError::render("boom"))));
        let tail = log.clone();
        queue.push(Box::new(move || {
            tail.lock().push("tail");
            Ok(())
        }));

        assert!(queue.run_turn().is_err());
        assert_eq!(queue.len(), 1);

        queue.run_turn().unwrap();
        assert_eq!(*log.lock(), vec!["tail"]);
    }

    #[tokio::test]
    async fn ready_resolves_once_work_arrives() {
        let queue = Arc::new(TaskQueue::new());

        let producer = queue.clone();
        tokio::spawn(async move {
            producer.push(Box::new(|| Ok(())));
        });

        queue.ready().await;
        assert_eq!(queue.run_turn().unwrap(), 1);
    }
}
