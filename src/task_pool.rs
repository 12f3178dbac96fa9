// Copyright (c) 2024-present, the node-bloom authors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::task::Task;
use std::{
    path::{Path, PathBuf},
    sync::{Condvar, Mutex},
};

struct PoolState {
    tasks: Vec<Task>,
    busy: usize,
    first_error: Option<crate::Error>,
}

/// Fixed-size worker set draining a shared task list.
///
/// Tasks may enqueue further tasks while running; the pool only shuts
/// down once the list is empty and no worker is busy, so a briefly empty
/// list does not end the run. The list is popped from the back, making
/// expansion depth-first, which bounds the number of live scratch
/// partitions by the recursion depth times the fanout.
///
/// No ordering is guaranteed across tasks.
pub struct TaskPool {
    folder: PathBuf,
    workers: usize,
    state: Mutex<PoolState>,
    task_available: Condvar,
}

impl TaskPool {
    /// Creates a pool over the given working folder.
    ///
    /// `workers` is the number of threads [`TaskPool::run`] will use; at
    /// least one.
    #[must_use]
    pub fn new(folder: PathBuf, workers: usize) -> Self {
        Self {
            folder,
            workers: workers.max(1),
            state: Mutex::new(PoolState {
                tasks: Vec::new(),
                busy: 0,
                first_error: None,
            }),
            task_available: Condvar::new(),
        }
    }

    /// The folder scratch partitions and filters are created in.
    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Adds a task to the list.
    ///
    /// May be called from within a running task.
    pub fn enqueue(&self, task: Task) {
        {
            #[allow(clippy::expect_used)]
            let mut state = self.state.lock().expect("lock is poisoned");

            // A failed run stops accepting work; the list is draining.
            if state.first_error.is_some() {
                return;
            }

            state.tasks.push(task);
        }

        self.task_available.notify_one();
    }

    /// Runs workers until the task list drains and every worker is idle.
    ///
    /// # Errors
    ///
    /// The first task error aborts the run: the remaining list is
    /// discarded, in-flight tasks finish, and the error is returned.
    pub fn run(&self) -> crate::Result<()> {
        std::thread::scope(|scope| {
            for _ in 0..self.workers {
                scope.spawn(|| self.worker());
            }
        });

        #[allow(clippy::expect_used)]
        let mut state = self.state.lock().expect("lock is poisoned");

        debug_assert!(state.tasks.is_empty());
        debug_assert_eq!(0, state.busy);

        match state.first_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn worker(&self) {
        #[allow(clippy::expect_used)]
        let mut state = self.state.lock().expect("lock is poisoned");

        loop {
            while state.tasks.is_empty() && state.busy > 0 {
                #[allow(clippy::expect_used)]
                {
                    state = self.task_available.wait(state).expect("lock is poisoned");
                }
            }

            let Some(task) = state.tasks.pop() else {
                // Quiescent: nothing queued and nobody busy. Wake the
                // remaining idle workers so they exit too.
                self.task_available.notify_all();
                return;
            };

            state.busy += 1;
            drop(state);

            let result = task.run(self);

            #[allow(clippy::expect_used)]
            {
                state = self.state.lock().expect("lock is poisoned");
            }
            state.busy -= 1;

            if let Err(e) = result {
                log::error!("Task failed: {e}");

                if state.first_error.is_none() {
                    state.first_error = Some(e);
                }
                state.tasks.clear();
            }

            if state.tasks.is_empty() && state.busy == 0 {
                self.task_available.notify_all();
            }
        }
    }
}
