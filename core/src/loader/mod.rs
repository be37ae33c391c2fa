//! Asynchronous, dependency-aware module loader
//!
//! This module resolves named modules together with their transitive
//! requirements. It supports:
//! - Memoized single-flight tasks (each module is defined exactly once)
//! - Positional bulk aggregation of independently settling tasks
//! - Eager circular dependency detection before a requirement edge is committed
//! - Lazy module routers fed by explicit registration or pluggable strategies
//! - Batched ("combo") fetching of modules that are not registered yet
//!
//! # Architecture
//!
//! ```text
//! Loader::use_modules(names)
//!   ↓
//! Loader::task_for(name) → Task<V>          (routing table, one per name)
//!   ↓                         ↑
//! bulk::run_all(&tasks)       ModuleRouter::resolve()
//!   ↓                           ├─ FetchCoordinator (WaitSet per batch)
//! Vec<Resolution<V>>            ├─ DependencyGraph::add_dependency()
//!   ↓                           └─ Loader::resolve_all(requires) → definer
//! Ok(values) | Err(UseError { failures })
//! ```

mod bulk;
mod engine;
mod fetch;
mod graph;
mod router;
mod task;
pub mod traits;
pub mod types;
mod wait_set;

pub use bulk::run_all;
pub use engine::{parse_names, Loader, LoaderBuilder};
pub use graph::DependencyGraph;
pub use task::{InvokeMode, Producer, Resolution, Subscriber, Task, TaskStatus};
pub use traits::{
    CurrentModuleIdentifier, FnStrategy, IdentityResolver, LoadingStrategy, NameFilter,
    NameResolver, ResourceFetcher,
};
pub use types::{Definer, LoaderStats, ModuleDef, UseOptions};
pub use wait_set::WaitSet;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock ignoring poisoning; guarded state is only mutated in short,
/// non-panicking sections.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
