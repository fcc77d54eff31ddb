use std::io;
use thiserror::Error;

// Unified error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Compilation error: {0}")]
    Compile(#[from] CompileError),

    #[error("Rule-set synchronization error: {0}")]
    Sync(#[from] SyncError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(String),

    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(#[from] InvalidProxyConfig),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] HttpClientError),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Invalid command line argument: {0}")]
    InvalidArgument(String),
}

impl From<reqwest_middleware::Error> for AppError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => Self::Http(e),
            _ => Self::HttpMiddleware(err.to_string()),
        }
    }
}

// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadError(#[from] io::Error),

    #[error("YAML parsing error: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

// Compilation error type
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("No nodes available for compilation")]
    NoNodes,

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to serialize {format} configuration: {message}")]
    Serialization {
        format: &'static str,
        message: String,
    },
}

// Rule-set synchronization error type
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to download {failed}/{attempted} rule-sets, still missing: {missing:?}")]
    PartialFailure {
        failed: usize,
        attempted: usize,
        missing: Vec<String>,
    },

    #[error("Rule-set directory error: {0}")]
    Io(#[from] io::Error),
}

// 代理配置错误
#[derive(Debug, Error)]
#[error("Invalid proxy configuration: {0}")]
pub struct InvalidProxyConfig(pub String);

// HTTP客户端错误
#[derive(Debug, Error)]
#[error("HTTP client error: {0}")]
pub struct HttpClientError(pub String);
