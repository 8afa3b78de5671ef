use thiserror::Error;

#[derive(Debug, Error)]
pub enum PmuError {
    #[error("not initialized: no .gh-pmu.yml found in {0}")]
    NotInitialized(String),

    #[error("no active branch found")]
    NoActiveBranch,

    #[error("multiple active branches found: {}; specify one explicitly", .0.join(", "))]
    MultipleActiveBranches(Vec<String>),

    #[error("an active branch already exists: {title} (#{number})")]
    ActiveBranchExists { title: String, number: u64 },

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("invalid branch name '{0}'")]
    InvalidBranchName(String),

    #[error("field not found in project: {0}")]
    FieldNotFound(String),

    #[error("issue #{0} is not in the project")]
    ItemNotInProject(u64),

    #[error("no repository configured: add one under 'repositories' in .gh-pmu.yml")]
    NoRepository,

    #[error("invalid repository '{0}': expected owner/name")]
    InvalidRepository(String),

    #[error("failed to {op}: {message}")]
    Gateway { op: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PmuError {
    pub fn gateway(op: impl Into<String>, message: impl ToString) -> Self {
        PmuError::Gateway {
            op: op.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PmuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_names_the_operation() {
        let err = PmuError::gateway("close issue", "HTTP 502");
        assert_eq!(err.to_string(), "failed to close issue: HTTP 502");
    }

    #[test]
    fn multiple_active_lists_every_version() {
        let err = PmuError::MultipleActiveBranches(vec!["1.2.0".into(), "1.3.0".into()]);
        let msg = err.to_string();
        assert!(msg.contains("1.2.0"));
        assert!(msg.contains("1.3.0"));
    }
}
