/// Failures reported to clients as `{ success: false, message }`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("SDK is disabled in configuration")]
    Disabled,

    #[error("SDK initialization is already in progress")]
    AlreadyInitializing,

    #[error("SDK initialization failed: {0}")]
    ProviderInitFailed(String),

    #[error("SDK shutdown failed: {0}")]
    ProviderShutdownFailed(String),

    #[error("{operation} failed: {message}")]
    ProviderCallFailed {
        operation: &'static str,
        message: String,
    },

    #[error("SDK is not initialized")]
    NotReady,
}

impl SdkError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::AlreadyInitializing => "already_initializing",
            Self::ProviderInitFailed(_) => "provider_init_failed",
            Self::ProviderShutdownFailed(_) => "provider_shutdown_failed",
            Self::ProviderCallFailed { .. } => "provider_call_failed",
            Self::NotReady => "not_ready",
        }
    }

    pub(crate) fn call_failed(operation: &'static str, err: anyhow::Error) -> Self {
        Self::ProviderCallFailed {
            operation,
            message: format!("{err:#}"),
        }
    }
}
