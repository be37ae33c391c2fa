use std::path::PathBuf;
use std::sync::Arc;

use modlink_core::config::LoaderConfig;
use modlink_core::loader::Loader;
use serde_json::Value;

use crate::fetcher::ManifestFetcher;
use crate::resolver::PathResolver;
use crate::strategy::EnvStrategy;

/// Loader over manifest directories with path-relative names and `env:`
/// modules.
pub fn build_loader(cfg: &LoaderConfig, base_dir: impl Into<PathBuf>) -> Loader<Value> {
    let base_dir = base_dir.into();
    tracing::debug!(base = %base_dir.display(), combine = cfg.combine, "building loader");

    Loader::builder()
        .config(cfg.clone())
        .resolver(Arc::new(PathResolver))
        .fetcher(Arc::new(ManifestFetcher::new(base_dir)))
        .strategy(Arc::new(EnvStrategy))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::loader::UseOptions;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn resolves_relative_requirements_across_manifests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("pkg")).unwrap();
        std::fs::write(
            dir.path().join("pkg/main.toml"),
            "[[module]]\nrequires = [\"./util\"]\nvalue = \"main\"\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("pkg/util.toml"), "[[module]]\nvalue = 7\n").unwrap();

        let cfg = LoaderConfig {
            combine: true,
            ..LoaderConfig::default()
        };
        let loader = build_loader(&cfg, dir.path());
        let values = loader
            .use_modules(["pkg/main"], UseOptions::default())
            .await
            .unwrap();
        assert_eq!(
            values,
            vec![json!({ "value": "main", "requires": { "./util": 7 } })]
        );
        assert_eq!(loader.require("pkg/util"), Some(json!(7)));
    }
}
