use async_trait::async_trait;

use crate::error::FetchError;
use crate::loader::Loader;

/// Transport plugin that delivers definitions of unregistered modules
///
/// A successful fetch registers every delivered module through
/// `loader.add` / `loader.add_anonymous`. A failed fetch leaves the names
/// unregistered, which fails dependent resolutions instead of hanging them.
#[async_trait]
pub trait ResourceFetcher<V: Send + 'static>: Send + Sync {
    /// Plugin name (for logs).
    fn name(&self) -> &str;

    /// Fetch one batch of canonical module names.
    async fn fetch(&self, names: &[String], loader: &Loader<V>) -> Result<(), FetchError>;
}
