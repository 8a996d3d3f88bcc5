use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebgenError {
    #[error("authentication error: {0}")] Authentication(String),
    #[error("upstream error: {0}")] Upstream(String),
    #[error("empty result: {0}")] EmptyResult(String),
    #[error("unsafe output path: {0}")] UnsafePath(String),
    #[error("config error: {0}")] Config(String),
    #[error(transparent)] Io(#[from] std::io::Error),
}

impl WebgenError {
    pub fn upstream(e: impl std::fmt::Display) -> Self {
        WebgenError::Upstream(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WebgenError>;
