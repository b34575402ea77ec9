pub type VeilResult<T> = Result<T, VeilError>;

#[derive(thiserror::Error, Debug)]
pub enum VeilError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VeilError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
