use std::sync::Mutex;

use tokio::sync::Notify;

use crate::error::{LoadError, RegisterError};

use super::engine::Loader;
use super::lock;
use super::task::Resolution;
use super::types::{Definer, ModuleDef};

enum Slot<V> {
    Empty,
    Registered(ModuleDef<V>),
    /// Definition consumed by the resolving task.
    Taken,
}

/// Per-module record pairing a deferred definition with its resolution
pub(crate) struct ModuleRouter<V> {
    name: String,
    slot: Mutex<Slot<V>>,
    registered: Notify,
}

impl<V: Clone + Send + 'static> ModuleRouter<V> {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: Mutex::new(Slot::Empty),
            registered: Notify::new(),
        }
    }

    pub(crate) fn register(&self, def: ModuleDef<V>) -> Result<(), RegisterError> {
        let mut slot = lock(&self.slot);
        if !matches!(*slot, Slot::Empty) {
            return Err(RegisterError::AlreadyRegistered {
                name: self.name.clone(),
            });
        }
        *slot = Slot::Registered(def);
        drop(slot);
        self.registered.notify_one();
        Ok(())
    }

    pub(crate) fn is_registered(&self) -> bool {
        !matches!(*lock(&self.slot), Slot::Empty)
    }

    fn take_definition(&self) -> Option<ModuleDef<V>> {
        let mut slot = lock(&self.slot);
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Registered(def) => Some(def),
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Wait for a registration that has not happened yet.
    async fn await_definition(&self) -> ModuleDef<V> {
        loop {
            if let Some(def) = self.take_definition() {
                return def;
            }
            tracing::debug!(module = %self.name, "waiting for registration");
            self.registered.notified().await;
        }
    }

    /// Activate the module: obtain its definition, resolve its requirements
    /// and run the definer.
    pub(crate) async fn resolve(&self, loader: Loader<V>) -> Resolution<V> {
        let def = match self.take_definition() {
            Some(def) => def,
            None if loader.has_fetcher() => {
                loader.fetch_module(&self.name).await?;
                self.take_definition().ok_or_else(|| LoadError::Unresolved {
                    name: self.name.clone(),
                })?
            }
            None => self.await_definition().await,
        };

        let (requires, definer) = def.into_parts();

        if requires.is_empty() {
            return self.define(definer, Vec::new());
        }

        let requires: Vec<String> = requires
            .iter()
            .map(|r| loader.canonicalize(r, &self.name))
            .collect();

        if let Err(path) = loader.add_dependency(&self.name, &requires) {
            tracing::warn!(
                module = %self.name,
                cycle = %path.join(" -> "),
                "cyclic dependency detected"
            );
            return Err(LoadError::Cyclic { path });
        }

        let results = loader.resolve_all(&requires).await;
        loader.remove_dependency(&self.name);

        let mut values = Vec::with_capacity(results.len());
        for (requirement, res) in requires.iter().zip(results) {
            match res {
                Ok(v) => values.push(v),
                Err(e) => {
                    tracing::warn!(
                        module = %self.name,
                        requirement = %requirement,
                        error = %e,
                        "requirement failed"
                    );
                    return Err(LoadError::Requirement {
                        module: self.name.clone(),
                        requirement: requirement.clone(),
                        source: Box::new(e),
                    });
                }
            }
        }

        self.define(definer, values)
    }

    fn define(&self, definer: Definer<V>, values: Vec<V>) -> Resolution<V> {
        tracing::debug!(module = %self.name, args = values.len(), "defining module");
        definer(values).map_err(|e| LoadError::DefinitionFailed {
            name: self.name.clone(),
            reason: format!("{e:#}"),
        })
    }
}
