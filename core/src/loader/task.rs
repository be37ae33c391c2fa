use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;

use crate::error::LoadError;

use super::lock;

/// Outcome of a settled task.
pub type Resolution<V> = Result<V, LoadError>;

/// Deferred producer, consumed by the first start.
pub type Producer<V> = Box<dyn FnOnce() -> BoxFuture<'static, Resolution<V>> + Send>;

/// Continuation queued on a task.
pub type Subscriber<V> = Box<dyn FnOnce(Resolution<V>) + Send>;

/// How an invocation treats the producer and the caller's continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvokeMode {
    /// Start the producer if needed and deliver the value when it settles.
    #[default]
    StartAndWait,
    /// Start the producer if needed; the continuation is not queued.
    StartWithoutWaiting,
    /// Never start; deliver only if already settled.
    PeekOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    InFlight,
    Settled,
    Failed,
}

enum TaskState<V> {
    Idle(Producer<V>),
    InFlight,
    Done(Resolution<V>),
}

struct TaskInner<V> {
    label: String,
    state: TaskState<V>,
    subscribers: Vec<Subscriber<V>>,
}

/// Memoized single-flight wrapper around one asynchronous producer.
///
/// The producer runs at most once, on a spawned tokio task, no matter how
/// many times the task is invoked. Subscribers queued while it is in flight
/// receive the same resolution in the order they subscribed; invocations
/// after settlement are answered synchronously from the cache.
pub struct Task<V> {
    inner: Arc<Mutex<TaskInner<V>>>,
}

impl<V> Clone for Task<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V> std::fmt::Debug for Task<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Task")
            .field("label", &inner.label)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<V: Clone + Send + 'static> Task<V> {
    pub fn new<F, Fut>(label: impl Into<String>, producer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Resolution<V>> + Send + 'static,
    {
        Self::from_producer(label, Box::new(move || producer().boxed()))
    }

    pub fn from_producer(label: impl Into<String>, producer: Producer<V>) -> Self {
        Self::with_state(label.into(), TaskState::Idle(producer))
    }

    /// A task that is already settled.
    pub fn settled(label: impl Into<String>, resolution: Resolution<V>) -> Self {
        Self::with_state(label.into(), TaskState::Done(resolution))
    }

    fn with_state(label: String, state: TaskState<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TaskInner {
                label,
                state,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn label(&self) -> String {
        lock(&self.inner).label.clone()
    }

    pub fn status(&self) -> TaskStatus {
        match &lock(&self.inner).state {
            TaskState::Idle(_) => TaskStatus::Idle,
            TaskState::InFlight => TaskStatus::InFlight,
            TaskState::Done(Ok(_)) => TaskStatus::Settled,
            TaskState::Done(Err(_)) => TaskStatus::Failed,
        }
    }

    /// Invoke the task.
    ///
    /// Starting requires a running tokio runtime.
    pub fn invoke(&self, on_value: Option<Subscriber<V>>, mode: InvokeMode) {
        let mut inner = lock(&self.inner);

        if let TaskState::Done(res) = &inner.state {
            let res = res.clone();
            drop(inner);
            if let Some(cb) = on_value {
                cb(res);
            }
            return;
        }

        if mode == InvokeMode::PeekOnly {
            return;
        }

        if matches!(inner.state, TaskState::Idle(_)) {
            if let TaskState::Idle(producer) =
                std::mem::replace(&mut inner.state, TaskState::InFlight)
            {
                tracing::debug!(task = %inner.label, "task started");
                tokio::spawn(drive(self.inner.clone(), producer, inner.label.clone()));
            }
        }

        if mode == InvokeMode::StartAndWait {
            if let Some(cb) = on_value {
                inner.subscribers.push(cb);
            }
        }
    }

    /// Start the producer (if idle) and wait for the resolution.
    pub async fn get(&self) -> Resolution<V> {
        let (tx, rx) = oneshot::channel();
        self.invoke(
            Some(Box::new(move |res| {
                let _ = tx.send(res);
            })),
            InvokeMode::StartAndWait,
        );
        match rx.await {
            Ok(res) => res,
            // sender dropped without settling: the driver never ran to completion
            Err(_) => Err(LoadError::ProducerPanicked { name: self.label() }),
        }
    }

    /// Fire-and-forget start.
    pub fn start(&self) {
        self.invoke(None, InvokeMode::StartWithoutWaiting);
    }

    /// Cached resolution, if settled. Never starts the producer.
    pub fn peek(&self) -> Option<Resolution<V>> {
        match &lock(&self.inner).state {
            TaskState::Done(res) => Some(res.clone()),
            _ => None,
        }
    }
}

async fn drive<V: Clone + Send + 'static>(
    inner: Arc<Mutex<TaskInner<V>>>,
    producer: Producer<V>,
    label: String,
) {
    let res = AssertUnwindSafe(async move { producer().await })
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            tracing::error!(task = %label, "task producer panicked");
            Err(LoadError::ProducerPanicked {
                name: label.clone(),
            })
        });

    let subscribers = {
        let mut guard = lock(&inner);
        guard.state = TaskState::Done(res.clone());
        std::mem::take(&mut guard.subscribers)
    };

    tracing::debug!(
        task = %label,
        ok = res.is_ok(),
        subscribers = subscribers.len(),
        "task settled"
    );

    for cb in subscribers {
        cb(res.clone());
    }
}
