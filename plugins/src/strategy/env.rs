use futures::future::{self, BoxFuture};
use futures::FutureExt;
use modlink_core::error::LoadError;
use modlink_core::loader::{LoadingStrategy, Resolution};
use serde_json::Value;

const PREFIX: &str = "env:";

/// Serves `env:NAME` modules from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvStrategy;

impl LoadingStrategy<Value> for EnvStrategy {
    fn name(&self) -> &str {
        "env"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn matches(&self, module: &str) -> bool {
        module.len() > PREFIX.len() && module.starts_with(PREFIX)
    }

    fn create_producer(&self, module: &str) -> BoxFuture<'static, Resolution<Value>> {
        let var = module.strip_prefix(PREFIX).unwrap_or(module);
        let res = match std::env::var(var) {
            Ok(v) => Ok(Value::String(v)),
            Err(_) => Err(LoadError::Unresolved {
                name: module.to_string(),
            }),
        };
        future::ready(res).boxed()
    }
}
