//! De-duplicates concurrent get-or-fetch calls for the same key.
//!
//! Without this, two streams racing to fetch the same cold node both miss
//! the cache and both hit the external API. The first caller for a key
//! becomes the "leader" and does the real work; every other concurrent
//! caller for that key waits on the leader's result instead of repeating
//! it.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::watch;

use crate::error::{NodeBridgeError, Result};

type Slot<V> = Option<std::result::Result<V, NodeBridgeError>>;

pub struct SingleFlight<K: Eq + Hash + Clone, V: Clone> {
    inflight: SyncMutex<HashMap<K, watch::Receiver<Slot<V>>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            inflight: SyncMutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> SingleFlight<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` for `key`, or waits for an already-running call to finish
    /// and returns its result if one is in flight.
    ///
    /// Built on a `watch` channel rather than `Notify`: a receiver cloned
    /// after the leader has already sent its result observes that value
    /// immediately on the next `borrow()`, with no window where a
    /// notification can be missed between the "is it done yet" check and
    /// the wait.
    pub async fn run<F, Fut>(&self, key: K, f: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V>>,
    {
        enum Role<V: Clone> {
            Leader(watch::Sender<Slot<V>>),
            Follower(watch::Receiver<Slot<V>>),
        }

        let role = {
            let mut map = self.inflight.lock();
            if let Some(rx) = map.get(&key) {
                Role::Follower(rx.clone())
            } else {
                let (tx, rx) = watch::channel(None);
                map.insert(key.clone(), rx);
                Role::Leader(tx)
            }
        };

        match role {
            Role::Leader(tx) => {
                let outcome = f().await;
                let _ = tx.send(Some(clone_result(&outcome)));
                self.inflight.lock().remove(&key);
                outcome
            }
            Role::Follower(mut rx) => loop {
                if let Some(result) = rx.borrow().clone() {
                    return result;
                }
                if rx.changed().await.is_err() {
                    return Err(NodeBridgeError::Unknown {
                        code: 0,
                        body: "singleflight leader dropped without a result".into(),
                    });
                }
            },
        }
    }
}

/// `NodeBridgeError` isn't `Clone` (it wraps `io::Error`), so followers get
/// a reconstructed error that preserves the kind and message rather than
/// the original value.
fn clone_result<V: Clone>(result: &Result<V>) -> std::result::Result<V, NodeBridgeError> {
    match result {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(NodeBridgeError::Unknown {
            code: 0,
            body: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn concurrent_callers_for_the_same_key_share_one_execution() {
        let sf: Arc<SingleFlight<String, u64>> = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let sf = sf.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                sf.run("k".to_string(), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                    Ok(42u64)
                })
                .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
