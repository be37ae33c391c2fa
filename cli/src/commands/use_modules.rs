use modlink_core::config::LoaderConfig;
use modlink_core::error::{CliError, FailureRecord};
use modlink_core::loader::{parse_names, UseOptions};
use serde_json::{json, Value};

use super::cli::UseArgs;

/// Run `modlink use`. Successful values go to stdout as JSON lines; on
/// failure every failed name is printed as a JSON line and the error is
/// returned for exit-code mapping.
pub async fn run_use(args: UseArgs, cfg: &LoaderConfig) -> Result<i32, CliError> {
    let names: Vec<String> = args.names.iter().flat_map(|n| parse_names(n)).collect();
    if names.is_empty() {
        return Err(CliError::Command("no module names given".to_string()));
    }

    let mut cfg = cfg.clone();
    cfg.combine |= args.combine;
    let loader = modlink_plugins::factory::build_loader(&cfg, &args.base);

    let opts = UseOptions {
        sync: args.sync.then_some(true),
    };
    tracing::debug!(names = ?names, base = %args.base.display(), "use");
    let res = loader.use_modules(names.clone(), opts).await;

    if args.stats {
        let stats = serde_json::to_string(&loader.stats())
            .map_err(|e| CliError::Command(e.to_string()))?;
        eprintln!("{stats}");
    }

    match res {
        Ok(values) => {
            for line in render_values(&names, values) {
                println!("{line}");
            }
            Ok(0)
        }
        Err(err) => {
            for line in render_failures(&err.failures) {
                println!("{line}");
            }
            Err(err.into())
        }
    }
}

pub fn render_values(names: &[String], values: Vec<Value>) -> Vec<String> {
    names
        .iter()
        .zip(values)
        .map(|(name, value)| json!({ "name": name, "value": value }).to_string())
        .collect()
}

pub fn render_failures(failures: &[FailureRecord]) -> Vec<String> {
    failures
        .iter()
        .map(|f| match serde_json::to_string(f) {
            Ok(s) => s,
            Err(_) => json!({ "name": f.name, "status": f.status.as_str() }).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modlink_core::error::{FailureStatus, LoadError};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn renders_values_as_json_lines() {
        let lines = render_values(&["a".into(), "b".into()], vec![json!(1), json!({"k": true})]);
        assert_eq!(
            lines,
            vec![
                r#"{"name":"a","value":1}"#.to_string(),
                r#"{"name":"b","value":{"k":true}}"#.to_string(),
            ]
        );
    }

    #[test]
    fn renders_failure_status() {
        let lines = render_failures(&[FailureRecord {
            name: "m3".into(),
            status: FailureStatus::Cyclic,
            error: LoadError::Cyclic {
                path: vec!["m3".into(), "m4".into(), "m3".into()],
            },
        }]);
        let parsed: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["name"], "m3");
        assert_eq!(parsed["status"], "cyclic");
    }

    #[tokio::test]
    async fn missing_manifest_maps_to_use_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = UseArgs {
            names: vec!["ghost".into()],
            base: PathBuf::from(dir.path()),
            sync: true,
            combine: false,
            stats: false,
        };
        let err = run_use(args, &LoaderConfig::default()).await.unwrap_err();
        assert!(matches!(err, CliError::Use(_)));
    }

    #[tokio::test]
    async fn resolves_manifest_modules() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.toml"), "[[module]]\nvalue = 1\n").unwrap();
        let args = UseArgs {
            names: vec!["app".into()],
            base: PathBuf::from(dir.path()),
            sync: false,
            combine: true,
            stats: true,
        };
        assert_eq!(run_use(args, &LoaderConfig::default()).await.unwrap(), 0);
    }
}
