//! One-shot readiness signal for "the job is loaded".

use std::sync::Arc;

use tokio::sync::watch;

/// Resolves exactly once with a value; later resolutions are ignored.
#[derive(Debug)]
pub struct Readiness<T> {
    tx: watch::Sender<Option<Arc<T>>>,
}

impl<T> Default for Readiness<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Readiness<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Resolve with `value`. Returns false if already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take().map(Arc::new);
            true
        })
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }

    /// A handle that can be awaited from another task.
    pub fn subscribe(&self) -> ReadySignal<T> {
        ReadySignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Awaitable side of [`Readiness`].
#[derive(Debug, Clone)]
pub struct ReadySignal<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> ReadySignal<T> {
    /// Wait for the value. `None` if the owner was dropped unresolved.
    pub async fn wait(mut self) -> Option<Arc<T>> {
        let resolved = self.rx.wait_for(Option::is_some).await.ok()?;
        resolved.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }
}
