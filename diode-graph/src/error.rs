/// Errors returned while building descriptors, keys and bindings.
///
/// Structural problems of the resolved graph (missing or duplicate bindings,
/// incompatible scopes, cycles) are never reported through this type. They
/// stay in the graph for a later validation pass to inspect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A referenced type is not declared yet. The caller should defer the
    /// enclosing element to a later processing round.
    #[error("type {0} is not present, defer to a later round")]
    TypeNotPresent(String),
    /// The declarative model has a shape that front-end validation should
    /// have rejected.
    #[error("invalid declaration {element}: {reason}")]
    InvalidDeclaration { element: String, reason: String },
    /// A type expression could not be parsed.
    #[error("cannot parse type name {input:?}: {reason}")]
    InvalidTypeName { input: String, reason: String },
}

impl GraphError {
    pub(crate) fn invalid(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDeclaration {
            element: element.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error only asks the caller to retry later.
    pub fn is_deferral(&self) -> bool {
        matches!(self, Self::TypeNotPresent(_))
    }
}
