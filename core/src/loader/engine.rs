use std::cmp::Reverse;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::config::LoaderConfig;
use crate::error::{FailureRecord, LoadError, RegisterError, UseError};

use super::bulk::run_all;
use super::fetch::FetchCoordinator;
use super::graph::DependencyGraph;
use super::lock;
use super::router::ModuleRouter;
use super::task::{Resolution, Task, TaskStatus};
use super::traits::{
    is_relative, CurrentModuleIdentifier, IdentityResolver, LoadingStrategy, NameResolver,
    ResourceFetcher,
};
use super::types::{LoaderStats, ModuleDef, UseOptions};

struct StrategyEntry<V> {
    seq: u64,
    strategy: Arc<dyn LoadingStrategy<V>>,
}

struct LoaderInner<V> {
    config: LoaderConfig,
    /// Routing table: module name -> memoized task
    tasks: Mutex<HashMap<String, Task<V>>>,
    routers: Mutex<HashMap<String, Arc<ModuleRouter<V>>>>,
    /// Sorted by priority, then most recently defined first
    strategies: Mutex<Vec<StrategyEntry<V>>>,
    next_strategy_seq: Mutex<u64>,
    graph: Mutex<DependencyGraph>,
    resolver: Arc<dyn NameResolver>,
    fetcher: Option<Arc<dyn ResourceFetcher<V>>>,
    fetches: FetchCoordinator,
}

/// Module loader: the public entry surface
///
/// Cheap to clone; clones share the same tables. Every module name maps to
/// exactly one task for the lifetime of the loader.
pub struct Loader<V> {
    inner: Arc<LoaderInner<V>>,
}

impl<V> Clone for Loader<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct LoaderBuilder<V> {
    config: LoaderConfig,
    resolver: Arc<dyn NameResolver>,
    fetcher: Option<Arc<dyn ResourceFetcher<V>>>,
    strategies: Vec<Arc<dyn LoadingStrategy<V>>>,
}

impl<V: Clone + Send + 'static> Default for Loader<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + 'static> Loader<V> {
    /// Loader without a fetcher: a name that is not registered yet is
    /// resolved once some later `add` registers it, and stays pending until
    /// then. Configure a `ResourceFetcher` through `builder()` to have such
    /// names fetched or failed as unresolved instead.
    pub fn new() -> Self {
        LoaderBuilder::new().build()
    }

    pub fn builder() -> LoaderBuilder<V> {
        LoaderBuilder::new()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    /// Register a module definition.
    ///
    /// The first registration of a name wins; later ones are rejected.
    pub fn add(&self, name: impl Into<String>, def: ModuleDef<V>) -> Result<(), RegisterError> {
        let name = name.into();
        self.router(&name).register(def)?;
        tracing::debug!(module = %name, "module registered");
        self.inner.fetches.on_registered(&name);
        Ok(())
    }

    /// Register a definition that does not carry its own name; `current`
    /// identifies the module being defined.
    pub fn add_anonymous<I>(&self, def: ModuleDef<V>, current: &I) -> Result<String, RegisterError>
    where
        I: CurrentModuleIdentifier + ?Sized,
    {
        let name = current
            .current_module()
            .ok_or(RegisterError::AnonymousUnidentified)?;
        self.add(name.clone(), def)?;
        Ok(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        lock(&self.inner.routers)
            .get(name)
            .is_some_and(|router| router.is_registered())
    }

    pub fn define_strategy<S>(&self, strategy: S)
    where
        S: LoadingStrategy<V> + 'static,
    {
        self.define_strategy_arc(Arc::new(strategy));
    }

    pub fn define_strategy_arc(&self, strategy: Arc<dyn LoadingStrategy<V>>) {
        let seq = {
            let mut next = lock(&self.inner.next_strategy_seq);
            *next += 1;
            *next
        };
        tracing::debug!(
            strategy = strategy.name(),
            priority = strategy.priority(),
            "loading strategy defined"
        );
        let mut strategies = lock(&self.inner.strategies);
        strategies.push(StrategyEntry { seq, strategy });
        strategies.sort_by_key(|e| (Reverse(e.strategy.priority()), Reverse(e.seq)));
    }

    /// Look up (or lazily create) the task backing `name`.
    pub fn task_for(&self, name: &str) -> Task<V> {
        let mut tasks = lock(&self.inner.tasks);
        if let Some(task) = tasks.get(name) {
            return task.clone();
        }
        let task = self.route(name);
        tasks.insert(name.to_string(), task.clone());
        task
    }

    /// Resolve `names` concurrently; one resolution per name, in order.
    pub async fn resolve_all(&self, names: &[String]) -> Vec<Resolution<V>> {
        let tasks: Vec<Task<V>> = names.iter().map(|name| self.task_for(name)).collect();
        run_all(&tasks).await
    }

    /// Resolve the named modules and return their values in request order.
    ///
    /// Fails with every name whose module did not resolve; there is no
    /// partial success. Without a fetcher, the future does not complete
    /// until every requested (and transitively required) name is added.
    pub fn use_modules<I, S>(
        &self,
        names: I,
        opts: UseOptions,
    ) -> impl Future<Output = Result<Vec<V>, UseError>> + Send + '_
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.use_names(names, opts)
    }

    /// Callback flavour of `use_modules`: exactly one of `on_success` /
    /// `on_error` runs, on a spawned task.
    pub fn use_then<S, E>(
        &self,
        names: Vec<String>,
        opts: UseOptions,
        on_success: S,
        on_error: E,
    ) -> tokio::task::JoinHandle<()>
    where
        S: FnOnce(Vec<V>) + Send + 'static,
        E: FnOnce(Vec<FailureRecord>) + Send + 'static,
    {
        let loader = self.clone();
        tokio::spawn(async move {
            match loader.use_names(names, opts).await {
                Ok(values) => on_success(values),
                Err(err) => on_error(err.failures),
            }
        })
    }

    async fn use_names(&self, names: Vec<String>, opts: UseOptions) -> Result<Vec<V>, UseError> {
        let results = self.resolve_all(&names).await;

        // consistent deferred completion for cached and fresh modules alike
        if !opts.sync.unwrap_or(self.inner.config.sync_by_default) {
            tokio::task::yield_now().await;
        }

        let mut values = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (name, res) in names.into_iter().zip(results) {
            match res {
                Ok(v) => values.push(v),
                Err(error) => failures.push(FailureRecord {
                    status: error.status(),
                    name,
                    error,
                }),
            }
        }

        if failures.is_empty() {
            Ok(values)
        } else {
            tracing::debug!(failed = failures.len(), "use request failed");
            Err(UseError { failures })
        }
    }

    /// Cached value of an already resolved module. Never starts resolution.
    pub fn require(&self, name: &str) -> Option<V> {
        let task = lock(&self.inner.tasks).get(name).cloned()?;
        task.peek()?.ok()
    }

    pub fn stats(&self) -> LoaderStats {
        let (tasks, settled, failed) = {
            let tasks = lock(&self.inner.tasks);
            let mut settled = 0;
            let mut failed = 0;
            for task in tasks.values() {
                match task.status() {
                    TaskStatus::Settled => settled += 1,
                    TaskStatus::Failed => failed += 1,
                    TaskStatus::Idle | TaskStatus::InFlight => {}
                }
            }
            (tasks.len(), settled, failed)
        };
        let registered = lock(&self.inner.routers)
            .values()
            .filter(|r| r.is_registered())
            .count();

        LoaderStats {
            tasks,
            registered,
            settled,
            failed,
            live_edges: lock(&self.inner.graph).len(),
            strategies: lock(&self.inner.strategies).len(),
        }
    }

    fn route(&self, name: &str) -> Task<V> {
        let registered = lock(&self.inner.routers)
            .get(name)
            .filter(|router| router.is_registered())
            .cloned();
        if let Some(router) = registered {
            return self.router_task(name, router);
        }

        if let Some(strategy) = self.find_strategy(name) {
            tracing::debug!(module = %name, strategy = strategy.name(), "routed to strategy");
            let module = name.to_string();
            return Task::from_producer(
                name,
                Box::new(move || strategy.create_producer(&module)),
            );
        }

        let router = self.router(name);
        self.router_task(name, router)
    }

    fn find_strategy(&self, name: &str) -> Option<Arc<dyn LoadingStrategy<V>>> {
        lock(&self.inner.strategies)
            .iter()
            .find(|e| e.strategy.matches(name))
            .map(|e| e.strategy.clone())
    }

    fn router(&self, name: &str) -> Arc<ModuleRouter<V>> {
        lock(&self.inner.routers)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(ModuleRouter::new(name)))
            .clone()
    }

    fn router_task(&self, name: &str, router: Arc<ModuleRouter<V>>) -> Task<V> {
        let weak = Arc::downgrade(&self.inner);
        let module = name.to_string();
        Task::new(name, move || async move {
            let Some(inner) = weak.upgrade() else {
                return Err(LoadError::LoaderDropped { name: module });
            };
            router.resolve(Loader { inner }).await
        })
    }

    pub(crate) fn canonicalize(&self, name: &str, referrer: &str) -> String {
        if is_relative(name) {
            self.inner.resolver.resolve(name, referrer)
        } else {
            name.to_string()
        }
    }

    pub(crate) fn add_dependency(&self, name: &str, requires: &[String]) -> Result<(), Vec<String>> {
        lock(&self.inner.graph).add_dependency(name, requires)
    }

    pub(crate) fn remove_dependency(&self, name: &str) {
        lock(&self.inner.graph).remove_dependency(name);
    }

    pub(crate) fn has_fetcher(&self) -> bool {
        self.inner.fetcher.is_some()
    }

    pub(crate) fn fetcher(&self) -> Option<Arc<dyn ResourceFetcher<V>>> {
        self.inner.fetcher.clone()
    }

    pub(crate) fn fetches(&self) -> &FetchCoordinator {
        &self.inner.fetches
    }

    pub(crate) async fn fetch_module(&self, name: &str) -> Result<(), LoadError> {
        self.inner.fetches.fetch(self, name).await
    }
}

impl<V: Clone + Send + 'static> Default for LoaderBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + 'static> LoaderBuilder<V> {
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
            resolver: Arc::new(IdentityResolver),
            fetcher: None,
            strategies: Vec::new(),
        }
    }

    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ResourceFetcher<V>>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn strategy(mut self, strategy: Arc<dyn LoadingStrategy<V>>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn build(self) -> Loader<V> {
        let loader = Loader {
            inner: Arc::new(LoaderInner {
                fetches: FetchCoordinator::new(&self.config),
                config: self.config,
                tasks: Mutex::new(HashMap::new()),
                routers: Mutex::new(HashMap::new()),
                strategies: Mutex::new(Vec::new()),
                next_strategy_seq: Mutex::new(0),
                graph: Mutex::new(DependencyGraph::new()),
                resolver: self.resolver,
                fetcher: self.fetcher,
            }),
        };
        for strategy in self.strategies {
            loader.define_strategy_arc(strategy);
        }
        loader
    }
}

/// Split a comma separated module list (`"a, b,c"`).
pub fn parse_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureStatus;
    use crate::loader::traits::{FnStrategy, NameFilter};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SiblingResolver;

    impl NameResolver for SiblingResolver {
        fn resolve(&self, name: &str, referrer: &str) -> String {
            let dir = referrer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
            let base = name.trim_start_matches("./");
            if dir.is_empty() {
                base.to_string()
            } else {
                format!("{dir}/{base}")
            }
        }
    }

    fn constant(name: &str, value: i64) -> FnStrategy<i64> {
        FnStrategy::new(name, NameFilter::Any, move |_| {
            async move { Ok::<i64, LoadError>(value) }.boxed()
        })
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_names(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_names("").is_empty());
    }

    #[tokio::test]
    async fn test_zero_requirement_module_is_defined_once() {
        let loader = Loader::<i64>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        loader
            .add(
                "m1",
                ModuleDef::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                }),
            )
            .unwrap();

        assert_eq!(loader.use_modules(["m1"], UseOptions::default()).await, Ok(vec![42]));
        assert_eq!(loader.use_modules(["m1"], UseOptions::sync()).await, Ok(vec![42]));
        assert_eq!(loader.require("m1"), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_requirements_are_passed_in_declaration_order() {
        let loader = Loader::<i64>::new();
        loader.add("a", ModuleDef::value(1)).unwrap();
        loader.add("b", ModuleDef::value(2)).unwrap();
        loader
            .add(
                "sum",
                ModuleDef::new(|deps: Vec<i64>| Ok(deps[0] * 10 + deps[1])).requires(["b", "a"]),
            )
            .unwrap();

        assert_eq!(loader.use_modules(["sum", "a"], UseOptions::sync()).await, Ok(vec![21, 1]));
        assert_eq!(loader.stats().live_edges, 0);
    }

    #[tokio::test]
    async fn test_relative_requirements_are_canonicalized() {
        let loader = Loader::<i64>::builder()
            .resolver(Arc::new(SiblingResolver))
            .build();
        loader.add("pkg/util", ModuleDef::value(5)).unwrap();
        loader
            .add(
                "pkg/main",
                ModuleDef::new(|deps: Vec<i64>| Ok(deps[0] + 1)).requires(["./util"]),
            )
            .unwrap();

        assert_eq!(loader.use_modules(["pkg/main"], UseOptions::sync()).await, Ok(vec![6]));
        assert_eq!(loader.require("pkg/util"), Some(5));
    }

    #[tokio::test]
    async fn test_require_never_starts_resolution() {
        let loader = Loader::<i64>::new();
        loader.add("lazy", ModuleDef::value(3)).unwrap();
        assert_eq!(loader.require("lazy"), None);
        assert_eq!(loader.stats().tasks, 0);
    }

    #[tokio::test]
    async fn test_duplicate_registration_keeps_first_definition() {
        let loader = Loader::<i64>::new();
        loader.add("dup", ModuleDef::value(1)).unwrap();
        assert_eq!(
            loader.add("dup", ModuleDef::value(2)),
            Err(RegisterError::AlreadyRegistered { name: "dup".into() })
        );
        assert_eq!(loader.use_modules(["dup"], UseOptions::sync()).await, Ok(vec![1]));
    }

    #[tokio::test]
    async fn test_anonymous_registration_uses_current_module() {
        let loader = Loader::<i64>::new();
        let name = loader
            .add_anonymous(ModuleDef::value(9), "widgets/slider")
            .unwrap();
        assert_eq!(name, "widgets/slider");
        assert!(loader.is_registered("widgets/slider"));

        let unknown: Option<String> = None;
        assert_eq!(
            loader.add_anonymous(ModuleDef::value(1), &unknown),
            Err(RegisterError::AnonymousUnidentified)
        );
    }

    #[tokio::test]
    async fn test_use_before_add_waits_for_registration() {
        let loader = Loader::<i64>::new();
        let pending = tokio::spawn({
            let loader = loader.clone();
            async move { loader.use_modules(["late"], UseOptions::default()).await }
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(!pending.is_finished());

        loader.add("late", ModuleDef::value(11)).unwrap();
        assert_eq!(pending.await.unwrap(), Ok(vec![11]));
    }

    #[tokio::test]
    async fn test_unregistered_name_without_fetcher_stays_pending() {
        let loader = Loader::<i64>::new();
        let res = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            loader.use_modules(["ghost"], UseOptions::sync()),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(loader.stats().failed, 0);

        // still served by a late registration
        loader.add("ghost", ModuleDef::value(1)).unwrap();
        assert_eq!(loader.use_modules(["ghost"], UseOptions::sync()).await, Ok(vec![1]));
    }

    #[tokio::test]
    async fn test_strategy_priority_and_registration_order() {
        let loader = Loader::<i64>::new();
        loader.define_strategy(constant("low", 1).with_priority(-1));
        loader.define_strategy(constant("first", 2));
        loader.define_strategy(constant("second", 3));
        assert_eq!(loader.use_modules(["x"], UseOptions::sync()).await, Ok(vec![3]));

        loader.define_strategy(constant("high", 4).with_priority(10));
        assert_eq!(loader.use_modules(["y"], UseOptions::sync()).await, Ok(vec![4]));
        // routing is memoized per name
        assert_eq!(loader.use_modules(["x"], UseOptions::sync()).await, Ok(vec![3]));
        assert_eq!(loader.stats().strategies, 4);
    }

    #[tokio::test]
    async fn test_explicit_registration_beats_strategies() {
        let loader = Loader::<i64>::new();
        loader.define_strategy(constant("catch-all", 0));
        loader.add("known", ModuleDef::value(7)).unwrap();
        assert_eq!(
            loader.use_modules(["known", "other"], UseOptions::sync()).await,
            Ok(vec![7, 0])
        );
    }

    #[tokio::test]
    async fn test_definer_error_is_reported() {
        let loader = Loader::<i64>::new();
        loader
            .add("broken", ModuleDef::new(|_| Err(anyhow::anyhow!("bad config"))))
            .unwrap();
        let err = loader
            .use_modules(["broken"], UseOptions::sync())
            .await
            .unwrap_err();
        assert_eq!(err.names(), vec!["broken"]);
        assert_eq!(err.failures[0].status, FailureStatus::DefinitionFailed);
        assert_eq!(loader.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_use_then_invokes_exactly_one_callback() {
        let loader = Loader::<i64>::new();
        loader.add("ok", ModuleDef::value(1)).unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        loader
            .use_then(
                vec!["ok".into()],
                UseOptions::default(),
                move |values| {
                    let _ = tx.send(values);
                },
                |_| panic!("error callback must not run"),
            )
            .await
            .unwrap();
        assert_eq!(rx.await.unwrap(), vec![1]);
    }
}
