use std::{collections::HashMap, sync::Arc};

use floorbook_api::FloorKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Table = Arc<parking_lot::Mutex<HashMap<FloorKey, Arc<Mutex<()>>>>>;

/// One async mutex per floor sequence, so that computing the next floor
/// number and inserting the comment happen without interleaving
///
/// Entries only live while some task holds or waits for them.
#[derive(Clone, Debug, Default)]
pub struct FloorLocks(Table);

pub struct FloorGuard {
    key: FloorKey,
    table: Table,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FloorLocks {
    pub fn new() -> FloorLocks {
        FloorLocks::default()
    }

    pub async fn lock(&self, key: FloorKey) -> FloorGuard {
        let mutex = self.0.lock().entry(key).or_default().clone();
        let guard = mutex.lock_owned().await;
        tracing::trace!(?key, "acquired floor lock");
        FloorGuard {
            key,
            table: self.0.clone(),
            guard: Some(guard),
        }
    }

    /// Number of sequences currently locked or waited on
    pub fn num_keys(&self) -> usize {
        self.0.lock().len()
    }
}

impl Drop for FloorGuard {
    fn drop(&mut self) {
        // release first, so that the table holds the last reference when idle
        self.guard.take();
        let mut table = self.table.lock();
        if let Some(mutex) = table.get(&self.key) {
            if Arc::strong_count(mutex) == 1 {
                table.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use floorbook_api::SubjectId;

    use super::*;

    fn key(root: Option<u32>) -> FloorKey {
        FloorKey {
            subject: SubjectId::stub(),
            root,
        }
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = FloorLocks::new();
        let first = locks.lock(key(None)).await;
        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock(key(None)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());
        drop(first);
        waiting.await.expect("waiting task panicked");
        assert_eq!(locks.num_keys(), 0);
    }

    #[tokio::test]
    async fn other_keys_do_not_wait() {
        let locks = FloorLocks::new();
        let _top = locks.lock(key(None)).await;
        let _replies = tokio::time::timeout(Duration::from_secs(1), locks.lock(key(Some(1))))
            .await
            .expect("unrelated key was blocked");
        assert_eq!(locks.num_keys(), 2);
    }
}
