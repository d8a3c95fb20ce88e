use thiserror::Error;

pub type QuarryResult<T> = Result<T, QuarryError>;

#[derive(Error, Debug)]
pub enum QuarryError {
    #[error("Syntax error in query \"{0}\"")]
    Syntax(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Unbound parameters: {0}")]
    UnboundParameters(String),

    #[error("Non-unique result for '{0}'")]
    NonUniqueResult(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl QuarryError {
    /// Joins still-unbound parameter names into one stable, sorted message.
    pub fn unbound(mut names: Vec<String>) -> Self {
        names.sort();
        Self::UnboundParameters(names.join(", "))
    }
}
