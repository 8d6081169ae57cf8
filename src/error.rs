use thiserror::Error;

/// Closed set of failure modes the optimizer can report.
///
/// Recoverable kinds (`StatisticsUnavailable`, `HintParseError`,
/// `RuleConvergenceExceeded`, `Cancelled`) are also emitted as [`Diagnostic`]s
/// so an `Optimize` call can surface them without failing outright.
#[derive(Error, Debug, Clone)]
pub enum OptimizerError {
    #[error("catalog error: {0}")]
    CatalogError(String),

    #[error("statistics unavailable for {0}")]
    StatisticsUnavailable(String),

    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    #[error("rule '{rule_name}' failed: {cause}")]
    RuleFailure { rule_name: String, cause: String },

    #[error("rule engine did not converge within the iteration bound")]
    RuleConvergenceExceeded,

    #[error("failed to parse hint: {0}")]
    HintParseError(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl OptimizerError {
    pub fn catalog(msg: impl Into<String>) -> Self {
        OptimizerError::CatalogError(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        OptimizerError::UnsupportedConstruct(msg.into())
    }

    pub fn rule_failure(rule_name: impl Into<String>, cause: impl Into<String>) -> Self {
        OptimizerError::RuleFailure {
            rule_name: rule_name.into(),
            cause: cause.into(),
        }
    }

    /// Whether this kind is safe to recover from with a degraded result.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OptimizerError::StatisticsUnavailable(_)
                | OptimizerError::HintParseError(_)
                | OptimizerError::RuleConvergenceExceeded
                | OptimizerError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

impl From<serde_json::Error> for OptimizerError {
    fn from(e: serde_json::Error) -> Self {
        OptimizerError::Internal(e.to_string())
    }
}

/// A non-fatal note accumulated during planning, surfaced via explain output
/// instead of failing the call. Populated for every recoverable [`OptimizerError`].
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: String,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(err: &OptimizerError) -> Self {
        Diagnostic {
            kind: match err {
                OptimizerError::StatisticsUnavailable(_) => "StatisticsUnavailable",
                OptimizerError::HintParseError(_) => "HintParseError",
                OptimizerError::RuleConvergenceExceeded => "RuleConvergenceExceeded",
                OptimizerError::Cancelled => "Cancelled",
                _ => "Other",
            }
            .to_string(),
            message: err.to_string(),
        }
    }
}
