/// Names the module whose definition is currently being executed.
///
/// Passed explicitly to `Loader::add_anonymous`, so a definition that does
/// not carry its own name can still be registered under the right one.
pub trait CurrentModuleIdentifier {
    fn current_module(&self) -> Option<String>;
}

impl CurrentModuleIdentifier for str {
    fn current_module(&self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_string())
    }
}

impl CurrentModuleIdentifier for String {
    fn current_module(&self) -> Option<String> {
        self.as_str().current_module()
    }
}

impl<T: CurrentModuleIdentifier> CurrentModuleIdentifier for Option<T> {
    fn current_module(&self) -> Option<String> {
        self.as_ref().and_then(CurrentModuleIdentifier::current_module)
    }
}
