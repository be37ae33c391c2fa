use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Semaphore};

use crate::config::LoaderConfig;
use crate::error::LoadError;

use super::engine::Loader;
use super::lock;
use super::wait_set::WaitSet;

struct BatchState {
    names: Vec<String>,
    /// No further names may join once the fetch is issued.
    closed: bool,
    /// Names still awaiting registration.
    waiting: WaitSet<String>,
    failure: Option<String>,
}

/// Names fetched together by one `ResourceFetcher::fetch` call.
struct Batch {
    id: u64,
    state: Mutex<BatchState>,
    done: Arc<watch::Sender<bool>>,
}

impl Batch {
    fn new(id: u64) -> Self {
        let (tx, _rx) = watch::channel(false);
        let done = Arc::new(tx);
        let signal = done.clone();
        Self {
            id,
            state: Mutex::new(BatchState {
                names: Vec::new(),
                closed: false,
                waiting: WaitSet::new(move || {
                    signal.send_replace(true);
                }),
                failure: None,
            }),
            done,
        }
    }

    fn try_push(&self, name: &str, max_names: usize) -> bool {
        let mut state = lock(&self.state);
        if state.closed || state.waiting.is_fired() || state.names.len() >= max_names {
            return false;
        }
        if state.waiting.add(name.to_string()) {
            state.names.push(name.to_string());
        }
        true
    }

    fn close(&self) -> Vec<String> {
        let mut state = lock(&self.state);
        state.closed = true;
        state.names.clone()
    }

    /// Drop `name` from the pending set; the batch completes once every
    /// name is registered.
    fn registered(&self, name: &str) {
        lock(&self.state).waiting.remove(name);
    }

    /// Fetch returned: release every waiter exactly once.
    fn finish(&self, failure: Option<String>) {
        let mut state = lock(&self.state);
        state.failure = failure;
        let leftover: Vec<String> = state.names.clone();
        for name in &leftover {
            state.waiting.remove(name.as_str());
        }
    }

    fn failure(&self) -> Option<String> {
        lock(&self.state).failure.clone()
    }

    async fn wait(&self) {
        let mut rx = self.done.subscribe();
        let _ = rx.wait_for(|done| *done).await;
    }
}

/// Coordinates fetches of unregistered modules.
///
/// With `combine` enabled, names activated within the same scheduling turn
/// share one batch; otherwise every name is fetched on its own. Each batch
/// owns a `WaitSet` of names still awaiting registration.
pub(crate) struct FetchCoordinator {
    combine: bool,
    max_names: usize,
    open: Mutex<Option<Arc<Batch>>>,
    live: Mutex<Vec<Arc<Batch>>>,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
}

impl FetchCoordinator {
    pub(crate) fn new(config: &LoaderConfig) -> Self {
        Self {
            combine: config.combine,
            max_names: config.combo_max_names.max(1),
            open: Mutex::new(None),
            live: Mutex::new(Vec::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
            next_id: AtomicU64::new(1),
        }
    }

    /// Fetch `name` and wait until its batch completes.
    pub(crate) async fn fetch<V>(&self, loader: &Loader<V>, name: &str) -> Result<(), LoadError>
    where
        V: Clone + Send + 'static,
    {
        let batch = self.enlist(loader, name);
        batch.wait().await;

        if loader.is_registered(name) {
            return Ok(());
        }
        match batch.failure() {
            Some(reason) => Err(LoadError::TransportFailure {
                name: name.to_string(),
                reason,
            }),
            None => Err(LoadError::Unresolved {
                name: name.to_string(),
            }),
        }
    }

    /// A module got registered; release it from every pending batch.
    pub(crate) fn on_registered(&self, name: &str) {
        let live = lock(&self.live).clone();
        for batch in live {
            batch.registered(name);
        }
    }

    fn enlist<V>(&self, loader: &Loader<V>, name: &str) -> Arc<Batch>
    where
        V: Clone + Send + 'static,
    {
        let mut open = lock(&self.open);
        if self.combine {
            if let Some(batch) = open.as_ref() {
                if batch.try_push(name, self.max_names) {
                    return batch.clone();
                }
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let batch = Arc::new(Batch::new(id));
        batch.try_push(name, self.max_names);
        lock(&self.live).push(batch.clone());
        if self.combine {
            *open = Some(batch.clone());
        }
        drop(open);

        tokio::spawn(flush(loader.clone(), batch.clone(), self.combine));
        batch
    }

    fn close_if_open(&self, batch: &Arc<Batch>) {
        let mut open = lock(&self.open);
        if open.as_ref().is_some_and(|b| Arc::ptr_eq(b, batch)) {
            *open = None;
        }
    }

    fn retire(&self, batch: &Arc<Batch>) {
        lock(&self.live).retain(|b| !Arc::ptr_eq(b, batch));
    }
}

async fn flush<V>(loader: Loader<V>, batch: Arc<Batch>, combine: bool)
where
    V: Clone + Send + 'static,
{
    let coordinator = loader.fetches();

    if combine {
        // let siblings activated in this turn join the batch
        tokio::task::yield_now().await;
        coordinator.close_if_open(&batch);
    }
    let names = batch.close();

    let failure = match coordinator.permits.clone().acquire_owned().await {
        Ok(_permit) => match loader.fetcher() {
            Some(fetcher) => {
                tracing::debug!(
                    batch = batch.id,
                    fetcher = fetcher.name(),
                    names = ?names,
                    "fetching modules"
                );
                fetcher
                    .fetch(&names, &loader)
                    .await
                    .err()
                    .map(|e| e.to_string())
            }
            None => None,
        },
        Err(_) => Some("fetch semaphore closed unexpectedly".to_string()),
    };

    if let Some(reason) = &failure {
        tracing::warn!(batch = batch.id, names = ?names, error = %reason, "fetch failed");
    }

    batch.finish(failure);
    coordinator.retire(&batch);
}
