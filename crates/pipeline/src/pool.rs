//! The worker pool batch operations run on.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Worker pool settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Worker threads; one per CPU when unset.
    pub workers: Option<usize>,
}

/// A scoped pool of worker threads.
///
/// Created explicitly by whoever runs a batch and torn down when dropped.
/// Every task gets its position in the input, and results come back in
/// input order whatever order the tasks finish in.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(config: &PoolConfig) -> Result<Self> {
        if config.workers == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.unwrap_or(0))
            .thread_name(|i| format!("pretty-weather-{}", i))
            .build()
            .map_err(|e| PipelineError::Pool(e.to_string()))?;
        debug!(workers = pool.current_num_threads(), "Started worker pool");
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task` on every item in parallel and collect the results in order.
    ///
    /// The first failing task fails the whole batch; no partial results are
    /// returned.
    pub fn map<T, R, F>(&self, items: &[T], task: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> Result<R> + Sync + Send,
    {
        self.pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| task(index, item))
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_worker_count() {
        let pool = WorkerPool::new(&PoolConfig { workers: Some(3) }).unwrap();
        assert_eq!(pool.workers(), 3);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = WorkerPool::new(&PoolConfig { workers: Some(0) });
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_results_keep_input_order() {
        let pool = WorkerPool::new(&PoolConfig { workers: Some(4) }).unwrap();
        let items: Vec<u64> = (0..64).collect();
        let out = pool
            .map(&items, |index, &v| {
                // later items finish first
                std::thread::sleep(std::time::Duration::from_micros(64 - v));
                Ok((index, v * 2))
            })
            .unwrap();
        assert_eq!(out.len(), 64);
        assert!(out.iter().enumerate().all(|(i, &(index, v))| index == i && v == 2 * i as u64));
    }

    #[test]
    fn test_one_failure_fails_the_batch() {
        let pool = WorkerPool::new(&PoolConfig { workers: Some(2) }).unwrap();
        let items: Vec<usize> = (0..10).collect();
        let result: Result<Vec<usize>> = pool.map(&items, |_, &v| {
            if v == 7 {
                Err(PipelineError::InvalidConfig("seven".to_string()))
            } else {
                Ok(v)
            }
        });
        assert!(result.is_err());
    }
}
