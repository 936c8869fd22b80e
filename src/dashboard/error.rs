/// Errors raised by card settings mutations and registry construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DashboardError {
    #[error("unknown card '{0}'")]
    NotFound(String),
    #[error("card '{card_id}' has no setting named '{field}'")]
    InvalidField { card_id: String, field: String },
    #[error("invalid value for '{field}' on card '{card_id}': {reason}")]
    InvalidValue {
        card_id: String,
        field: String,
        reason: String,
    },
    #[error("position {index} is out of range for {len} cards")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("card '{0}' is already on the dashboard")]
    AlreadyExists(String),
    #[error("card registry misconfigured: {0}")]
    RegistryConfig(String),
}

impl DashboardError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_CARD_NOT_FOUND",
            Self::InvalidField { .. } => "E_INVALID_FIELD",
            Self::InvalidValue { .. } => "E_INVALID_VALUE",
            Self::IndexOutOfRange { .. } => "E_INDEX_OUT_OF_RANGE",
            Self::AlreadyExists(_) => "E_CARD_EXISTS",
            Self::RegistryConfig(_) => "E_REGISTRY_CONFIG",
        }
    }

    pub(crate) fn invalid_value(card_id: &str, field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            card_id: card_id.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
