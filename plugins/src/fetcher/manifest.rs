use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use modlink_core::error::{FetchError, RegisterError};
use modlink_core::loader::{Loader, ModuleDef, ResourceFetcher};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default, rename = "module")]
    modules: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    name: Option<String>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    value: Value,
}

/// Fetches module definitions from `<base>/<name>.toml` manifests.
///
/// ```toml
/// [[module]]            # anonymous: registered as the fetched name
/// requires = ["./util"]
/// value = { title = "app" }
///
/// [[module]]
/// name = "extra/helper"
/// value = 3
/// ```
///
/// A missing manifest is not a transport failure: the name stays
/// unregistered and resolves as unresolved.
pub struct ManifestFetcher {
    base: PathBuf,
}

impl ManifestFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn manifest_path(&self, name: &str) -> Result<PathBuf, FetchError> {
        let rel = Path::new(name);
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(FetchError::Invalid {
                name: name.to_string(),
                reason: "module name must stay inside the manifest directory".to_string(),
            });
        }
        Ok(self.base.join(format!("{name}.toml")))
    }

    async fn read_manifest(&self, name: &str) -> Result<Option<Manifest>, FetchError> {
        let path = self.manifest_path(name)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(module = %name, path = %path.display(), "manifest not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text)
            .map(Some)
            .map_err(|e| FetchError::Invalid {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Definer of a manifest entry: the bare value without requirements,
/// otherwise `{"value": .., "requires": {name: value}}`.
fn entry_definition(value: Value, requires: Vec<String>) -> ModuleDef<Value> {
    if requires.is_empty() {
        return ModuleDef::value(value);
    }
    let keys = requires.clone();
    ModuleDef::new(move |deps: Vec<Value>| {
        let resolved: Map<String, Value> = keys.into_iter().zip(deps).collect();
        Ok(json!({ "value": value, "requires": resolved }))
    })
    .requires(requires)
}

fn ignore_duplicate(res: Result<(), RegisterError>) -> Result<(), RegisterError> {
    match res {
        Err(RegisterError::AlreadyRegistered { name }) => {
            tracing::debug!(module = %name, "manifest entry already registered, skipped");
            Ok(())
        }
        other => other,
    }
}

#[async_trait]
impl ResourceFetcher<Value> for ManifestFetcher {
    fn name(&self) -> &str {
        "manifest"
    }

    async fn fetch(&self, names: &[String], loader: &Loader<Value>) -> Result<(), FetchError> {
        let manifests =
            futures::future::join_all(names.iter().map(|name| self.read_manifest(name))).await;

        // every parsed manifest registers; the first failure is reported
        // after the whole batch has been processed
        let mut first_err = None;
        for (name, manifest) in names.iter().zip(manifests) {
            let manifest = match manifest {
                Ok(Some(manifest)) => manifest,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(module = %name, error = %e, "manifest rejected");
                    first_err.get_or_insert(e);
                    continue;
                }
            };
            tracing::debug!(module = %name, entries = manifest.modules.len(), "manifest loaded");

            for entry in manifest.modules {
                let def = entry_definition(entry.value, entry.requires);
                let res = match entry.name {
                    Some(entry_name) => ignore_duplicate(loader.add(entry_name, def)),
                    None => ignore_duplicate(loader.add_anonymous(def, name.as_str()).map(|_| ())),
                };
                if let Err(e) = res {
                    first_err.get_or_insert(e.into());
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
