use std::sync::Arc;

use futures::future::BoxFuture;
use regex::Regex;

use crate::loader::Resolution;

/// Loading strategy plugin: synthesizes a producer for modules that have no
/// explicit registration.
pub trait LoadingStrategy<V>: Send + Sync {
    /// Plugin name (unique identifier)
    fn name(&self) -> &str;

    /// Higher values are consulted first
    fn priority(&self) -> i32 {
        0
    }

    fn matches(&self, module: &str) -> bool;

    fn create_producer(&self, module: &str) -> BoxFuture<'static, Resolution<V>>;
}

/// Which module names a strategy applies to.
#[derive(Clone)]
pub enum NameFilter {
    Any,
    Exact(String),
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl NameFilter {
    pub fn pattern(re: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(re)?))
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    pub fn matches(&self, module: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(name) => name == module,
            Self::Pattern(re) => re.is_match(module),
            Self::Predicate(f) => f(module),
        }
    }
}

impl std::fmt::Debug for NameFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Exact(name) => f.debug_tuple("Exact").field(name).finish(),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

type CreateFn<V> = Arc<dyn Fn(&str) -> BoxFuture<'static, Resolution<V>> + Send + Sync>;

/// Closure-backed strategy.
pub struct FnStrategy<V> {
    name: String,
    filter: NameFilter,
    priority: i32,
    create: CreateFn<V>,
}

impl<V> FnStrategy<V> {
    pub fn new<F>(name: impl Into<String>, filter: NameFilter, create: F) -> Self
    where
        F: Fn(&str) -> BoxFuture<'static, Resolution<V>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            filter,
            priority: 0,
            create: Arc::new(create),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl<V> LoadingStrategy<V> for FnStrategy<V> {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn matches(&self, module: &str) -> bool {
        self.filter.matches(module)
    }

    fn create_producer(&self, module: &str) -> BoxFuture<'static, Resolution<V>> {
        (self.create)(module)
    }
}
