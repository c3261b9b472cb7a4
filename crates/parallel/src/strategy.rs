//! Processing modes

use std::ops::Range;

use cloudless_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// How row or image loops are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel processing on a dedicated pool of this many threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Map `f` over `range`, collecting results in index order.
    pub fn map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(range.map(f).collect()),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => {
                use rayon::prelude::*;
                Ok(range.into_par_iter().map(f).collect())
            }
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                use rayon::prelude::*;
                if *threads == 0 {
                    return Err(Error::InvalidParameter {
                        name: "threads",
                        value: "0".into(),
                        reason: "need at least one thread".into(),
                    });
                }
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build thread pool: {e}")))?;
                Ok(pool.install(|| range.into_par_iter().map(f).collect()))
            }
            #[cfg(not(feature = "parallel"))]
            _ => Ok(range.map(f).collect()),
        }
    }

    /// Fallible variant of [`map`](Self::map); the first error in index
    /// order is returned.
    pub fn try_map<T, F>(&self, range: Range<usize>, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize) -> Result<T> + Sync + Send,
    {
        self.map(range, f)?.into_iter().collect()
    }

    pub fn is_parallel(&self) -> bool {
        cfg!(feature = "parallel") && !matches!(self, ProcessingMode::Sequential)
    }
}

/// Threads available to [`ProcessingMode::Parallel`]
pub fn num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
