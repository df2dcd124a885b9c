use std::{future::Future, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::error::Result;

/// Join set that admits at most `max_tasks` running tasks and tags each
/// task's output with the order it was spawned in.
pub struct BoundedJoinSet<T> {
    semaphore: Arc<Semaphore>,
    join_set: JoinSet<(usize, T)>,
    spawned: usize,
}

impl<T: Send + 'static> BoundedJoinSet<T> {
    pub fn new(max_tasks: usize) -> Self {
        let semaphore = Arc::new(Semaphore::new(max_tasks.max(1)));
        let join_set = JoinSet::new();
        BoundedJoinSet {
            semaphore,
            join_set,
            spawned: 0,
        }
    }

    /// Waits for a free slot, then spawns `task`, returning its index.
    pub async fn spawn<F>(&mut self, task: F) -> Result<usize>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self.semaphore.clone().acquire_owned().await?;
        let index = self.spawned;
        self.join_set.spawn(async move {
            let value = task.await;
            drop(permit);
            (index, value)
        });
        self.spawned += 1;
        Ok(index)
    }

    pub async fn join_next(&mut self) -> Option<Result<(usize, T)>> {
        let joined = self.join_set.join_next().await?;
        Some(joined.map_err(Into::into))
    }

    pub fn try_join_next(&mut self) -> Option<Result<(usize, T)>> {
        let joined = self.join_set.try_join_next()?;
        Some(joined.map_err(Into::into))
    }
}
