#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use modlink_core::error::FetchError;
use modlink_core::loader::{Loader, ModuleDef, ResourceFetcher};

/// In-memory fetcher: `name -> (base, requires)`; a delivered module
/// resolves to `base + sum(requirements)`.
#[derive(Default)]
pub struct MapFetcher {
    modules: HashMap<String, (i64, Vec<String>)>,
    batches: Mutex<Vec<Vec<String>>>,
    fail_with: Option<String>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, name: &str, base: i64, requires: &[&str]) -> Self {
        self.modules.insert(
            name.to_string(),
            (base, requires.iter().map(|r| r.to_string()).collect()),
        );
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.fail_with = Some(reason.to_string());
        self
    }

    /// Batches seen so far, each sorted.
    pub fn batches(&self) -> Vec<Vec<String>> {
        let mut out = self.batches.lock().unwrap().clone();
        for batch in &mut out {
            batch.sort();
        }
        out
    }
}

#[async_trait]
impl ResourceFetcher<i64> for MapFetcher {
    fn name(&self) -> &str {
        "map"
    }

    async fn fetch(&self, names: &[String], loader: &Loader<i64>) -> Result<(), FetchError> {
        self.batches.lock().unwrap().push(names.to_vec());
        if let Some(reason) = &self.fail_with {
            return Err(FetchError::Other(reason.clone()));
        }
        for name in names {
            if let Some((base, requires)) = self.modules.get(name) {
                let base = *base;
                loader.add(
                    name.clone(),
                    ModuleDef::new(move |deps: Vec<i64>| Ok(base + deps.iter().sum::<i64>()))
                        .requires(requires.clone()),
                )?;
            }
        }
        Ok(())
    }
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
