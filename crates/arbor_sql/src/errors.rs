use arbor_types::DataType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CastError {
    #[error("Value '{value}' is out of range for {target}")]
    OutOfRange { value: String, target: DataType },

    #[error("Cannot cast {from} to {to}")]
    Unsupported { from: DataType, to: DataType },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SqlError {
    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("Unknown function {0}")]
    UnknownFunction(String),

    #[error("Invalid arguments to {function}: {reason}")]
    InvalidArguments { function: String, reason: String },

    #[error("Expression cannot be evaluated without a row: {0}")]
    NotConstant(String),

    #[error("internal: {0}")]
    Internal(String),
}

pub type Result<T, E = SqlError> = std::result::Result<T, E>;

macro_rules! internal {
    ($($arg:tt)*) => {
        crate::errors::SqlError::Internal(std::format!($($arg)*))
    };
}
pub(crate) use internal;
