/// Canonicalizes path-relative requirement names
pub trait NameResolver: Send + Sync {
    /// Resolve `name` (e.g. `./util`) against the module that requires it.
    fn resolve(&self, name: &str, referrer: &str) -> String;
}

/// Leaves names untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityResolver;

impl NameResolver for IdentityResolver {
    fn resolve(&self, name: &str, _referrer: &str) -> String {
        name.to_string()
    }
}

/// True for names starting with one or more dots followed by a slash.
pub fn is_relative(name: &str) -> bool {
    let rest = name.trim_start_matches('.');
    rest.len() < name.len() && rest.starts_with('/')
}
