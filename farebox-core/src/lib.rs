pub mod bus;
pub mod gateway;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Boxed error used on async trait boundaries (repositories, bus, gateway).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
