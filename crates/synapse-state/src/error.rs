#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend error: {0}")]
    Backend(String),

    #[error("connection error: {0}")]
    Connection(String),
}

impl From<redis::RedisError> for StateError {
    fn from(e: redis::RedisError) -> Self {
        StateError::Backend(e.to_string())
    }
}
