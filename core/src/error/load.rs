use serde::Serialize;
use thiserror::Error;

/// Coarse failure category reported to `use` callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    /// A module never got a usable definition.
    Unresolved,
    /// The module sits on a requirement cycle.
    Cyclic,
    /// The fetcher reported an error while loading the module.
    TransportFailure,
    /// The definer itself returned an error.
    DefinitionFailed,
}

impl FailureStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Cyclic => "cyclic",
            Self::TransportFailure => "transport_failure",
            Self::DefinitionFailed => "definition_failed",
        }
    }
}

impl std::fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a module task settled without a value.
///
/// Cloned into every subscriber of the failed task, so it carries owned
/// strings only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("module '{name}' is not defined")]
    Unresolved { name: String },

    #[error("cyclic dependency between modules: {}", path.join(" -> "))]
    Cyclic { path: Vec<String> },

    #[error("fetching module '{name}' failed: {reason}")]
    TransportFailure { name: String, reason: String },

    #[error("module '{module}' requires '{requirement}', which failed")]
    Requirement {
        module: String,
        requirement: String,
        source: Box<LoadError>,
    },

    #[error("definer of module '{name}' failed: {reason}")]
    DefinitionFailed { name: String, reason: String },

    #[error("producer of module '{name}' panicked")]
    ProducerPanicked { name: String },

    #[error("loader was dropped while module '{name}' was resolving")]
    LoaderDropped { name: String },
}

impl LoadError {
    /// Status of the root cause, following requirement chains.
    pub fn status(&self) -> FailureStatus {
        match self {
            Self::Unresolved { .. } | Self::LoaderDropped { .. } => FailureStatus::Unresolved,
            Self::Cyclic { .. } => FailureStatus::Cyclic,
            Self::TransportFailure { .. } => FailureStatus::TransportFailure,
            Self::Requirement { source, .. } => source.status(),
            Self::DefinitionFailed { .. } | Self::ProducerPanicked { .. } => {
                FailureStatus::DefinitionFailed
            }
        }
    }

    /// Innermost error of a requirement chain.
    pub fn root_cause(&self) -> &LoadError {
        let mut cur = self;
        while let Self::Requirement { source, .. } = cur {
            cur = source;
        }
        cur
    }
}

/// One failed top-level name of a `use` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub name: String,
    pub status: FailureStatus,
    #[serde(serialize_with = "serialize_display")]
    pub error: LoadError,
}

fn serialize_display<S: serde::Serializer>(err: &LoadError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

/// Returned by `use` when at least one requested module failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} module(s) failed to load: {}", failures.len(), summarize(failures))]
pub struct UseError {
    pub failures: Vec<FailureRecord>,
}

impl UseError {
    pub fn names(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.name.as_str()).collect()
    }
}

fn summarize(failures: &[FailureRecord]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.name, f.status))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_requirement_chain() {
        let err = LoadError::Requirement {
            module: "a".into(),
            requirement: "b".into(),
            source: Box::new(LoadError::Requirement {
                module: "b".into(),
                requirement: "c".into(),
                source: Box::new(LoadError::Cyclic {
                    path: vec!["c".into(), "d".into(), "c".into()],
                }),
            }),
        };
        assert_eq!(err.status(), FailureStatus::Cyclic);
        assert!(matches!(err.root_cause(), LoadError::Cyclic { .. }));
    }

    #[test]
    fn cyclic_message_shows_path() {
        let err = LoadError::Cyclic {
            path: vec!["m3".into(), "m4".into(), "m3".into()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic dependency between modules: m3 -> m4 -> m3"
        );
    }
}
