/// Produces a module's value from its requirements' values, supplied in
/// declaration order.
pub type Definer<V> = Box<dyn FnOnce(Vec<V>) -> anyhow::Result<V> + Send>;

/// A registered module definition: the definer plus its declared requirements.
pub struct ModuleDef<V> {
    pub(crate) requires: Vec<String>,
    pub(crate) definer: Definer<V>,
}

impl<V: 'static> ModuleDef<V> {
    pub fn new<F>(definer: F) -> Self
    where
        F: FnOnce(Vec<V>) -> anyhow::Result<V> + Send + 'static,
    {
        Self {
            requires: Vec::new(),
            definer: Box::new(definer),
        }
    }

    /// A module without a definer body, resolving to `value`.
    pub fn value(value: V) -> Self
    where
        V: Send,
    {
        Self::new(move |_| Ok(value))
    }

    pub fn requires<I, S>(mut self, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires = requires.into_iter().map(Into::into).collect();
        self
    }
}

impl<V> ModuleDef<V> {
    pub fn requirements(&self) -> &[String] {
        &self.requires
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Definer<V>) {
        (self.requires, self.definer)
    }
}

impl<V> std::fmt::Debug for ModuleDef<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDef")
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}
