use crate::graph::model::NodeId;

/// Convenience result type used across Rigweave.
pub type RigResult<T> = Result<T, RigError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum RigError {
    /// The authored graph is structurally invalid; compilation was aborted
    /// with no partial program produced.
    #[error("validation failed: {0}")]
    Validation(ValidationReport),

    /// The host bound an unknown or ill-typed external value.
    #[error("binding error: {0}")]
    Binding(String),

    /// Bytecode/layout inconsistency. Indicates a compiler defect and hard
    /// stops the run; never recovered from.
    #[error("integrity fault: {0}")]
    Integrity(String),

    /// Errors when serializing or deserializing the authored graph.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RigError {
    /// Build a [`RigError::Binding`] value.
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// Build a [`RigError::Integrity`] value.
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Build a [`RigError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// A single structural problem found by graph validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Offending node, when the problem is attributable to one.
    pub node: Option<NodeId>,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationIssue {
    /// Issue attached to a specific node.
    pub fn node(node: NodeId, reason: impl Into<String>) -> Self {
        Self {
            node: Some(node),
            reason: reason.into(),
        }
    }

    /// Graph-level issue not attributable to a single node.
    pub fn graph(reason: impl Into<String>) -> Self {
        Self {
            node: None,
            reason: reason.into(),
        }
    }
}

/// Aggregated validation issues, reported all at once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Issues in discovery order.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// True when no issues were recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Record one issue.
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Convert into a result: `Ok(())` when empty, `Err(Validation)` otherwise.
    pub fn into_result(self) -> RigResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(RigError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            match issue.node {
                Some(node) => write!(f, "; node {}: {}", node.0, issue.reason)?,
                None => write!(f, "; {}", issue.reason)?,
            }
        }
        Ok(())
    }
}
