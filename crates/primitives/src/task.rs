use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::FutureExt;
use tokio::task::{JoinError, JoinHandle};

/// A set of named long-running tasks, each represented by a [`tokio::task::JoinHandle`].
///
/// Awaiting the set resolves as soon as any task exits. Since the tasks are supposed to run for
/// the whole lifetime of the process, any result means something went wrong. All remaining tasks
/// are aborted when the set is dropped.
#[derive(Debug, Default)]
pub struct CriticalTasks {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl CriticalTasks {
    /// Creates an empty set of tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the task and add it to the set.
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name, tokio::spawn(task)));
    }

    /// Returns the number of tasks in the set.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if the set holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Drop for CriticalTasks {
    fn drop(&mut self) {
        for (_, handle) in &self.tasks {
            handle.abort();
        }
    }
}

/// The outcome of a task of [`CriticalTasks`] that exited.
#[derive(Debug)]
pub struct TaskResult {
    name: &'static str,
    err: Option<JoinError>,
}

impl TaskResult {
    /// Returns the name of the task.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a human readable reason for the exit.
    pub fn reason(self) -> String {
        let Some(err) = self.err else {
            return "task returned".to_owned();
        };

        if err.is_cancelled() {
            return "task cancelled".to_owned();
        }

        let panic = err.into_panic();
        if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_owned()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked with unknown payload".to_owned()
        }
    }
}

impl Future for CriticalTasks {
    type Output = Option<TaskResult>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.tasks.is_empty() {
            return Poll::Ready(None);
        }

        for i in 0..this.tasks.len() {
            if let Poll::Ready(res) = this.tasks[i].1.poll_unpin(cx) {
                let (name, _) = this.tasks.swap_remove(i);
                return Poll::Ready(Some(TaskResult { name, err: res.err() }));
            }
        }

        Poll::Pending
    }
}
