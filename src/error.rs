use thiserror::Error;

/// Result type alias for heuristic operations
pub type HeuristicResult<T> = std::result::Result<T, HeuristicError>;

/// Errors raised by heuristics.
///
/// Only contract violations and configuration mistakes end up here.
/// A heuristic that simply finds nothing reports that through its outcome.
#[derive(Debug, Error)]
pub enum HeuristicError {
    /// Heuristic was invoked before a model was attached
    #[error("heuristic '{0}' is not attached to a model")]
    NoModel(String),

    /// Output buffer does not match the number of model columns
    #[error("solution buffer has length {got}, model has {expected} columns")]
    SolutionLength { expected: usize, got: usize },

    /// Node snapshot does not match the number of model columns
    #[error("relaxation {what} has length {got}, model has {expected} columns")]
    RelaxationLength {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Cached per column tables were built for a different model
    #[error("cached tables cover {cached} columns but the model has {current}, reset_model was not called")]
    StaleModel { cached: usize, current: usize },

    /// Rejected configuration value
    #[error("invalid value for '{field}': {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Matrix entry outside of the declared dimensions
    #[error("matrix entry ({row}, {col}) out of range")]
    MatrixIndex { row: usize, col: usize },

    /// The node relaxation cannot deal with a free continuous column
    #[error("sub-problem column {0} is continuous and free, the relaxation backend only handles integer columns")]
    ContinuousInSubProblem(usize),

    /// Settings could not be parsed
    #[error("settings: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure inside an external relaxation backend
    #[error("relaxation backend: {0}")]
    Backend(String),
}
