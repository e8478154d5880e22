//! Bounded-concurrency task runner.
//!
//! Downloads of version documents, jars and asset objects are independent
//! and I/O bound. [`BoundedRunner`] runs them on a dedicated `rayon` pool of
//! `max_in_flight` threads and collects results through an `mpsc` queue in
//! completion order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;

use crate::error::{Error, Result};

pub struct BoundedRunner {
    pool: rayon::ThreadPool,
    max_in_flight: usize,
}

impl BoundedRunner {
    pub fn new(max_in_flight: usize) -> Result<Self> {
        let max_in_flight = max_in_flight.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_in_flight)
            .thread_name(|index| format!("chronicle-fetch-{index}"))
            .build()
            .map_err(|e| Error::TaskPanicked {
                message: format!("failed to build thread pool: {e}"),
            })?;
        Ok(Self {
            pool,
            max_in_flight,
        })
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Runs every task and returns their results in completion order.
    ///
    /// All tasks are driven to completion even when some fail; the first
    /// error received is returned afterwards.
    pub fn run_all<'a, T, F>(&self, tasks: Vec<F>) -> Result<Vec<T>>
    where
        T: Send + 'a,
        F: FnOnce() -> Result<T> + Send + 'a,
    {
        let submitted = tasks.len();
        if submitted == 0 {
            return Ok(Vec::new());
        }

        let (tx, rx) = mpsc::channel::<Result<T>>();
        self.pool.scope(|scope| {
            for task in tasks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = panic::catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(
                        |payload| {
                            Err(Error::TaskPanicked {
                                message: panic_message(payload.as_ref()),
                            })
                        },
                    );
                    // The receiver outlives the scope, so sending cannot fail.
                    let _ = tx.send(result);
                });
            }
        });
        drop(tx);

        let mut completed = 0;
        let mut results = Vec::with_capacity(submitted);
        let mut first_error = None;
        for result in rx {
            completed += 1;
            match result {
                Ok(value) => results.push(value),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        log::debug!("Additional task failure: {}", e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if completed != submitted {
            return Err(Error::TaskPanicked {
                message: format!("{} of {} tasks never reported", submitted - completed, submitted),
            });
        }
        Ok(results)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}
