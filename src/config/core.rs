use crate::r#const::{http_client_limits, retry_limits, rule_set};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

// 自定义验证函数 - 验证空闲超时
fn validate_idle_timeout(config: &HttpClientConfig) -> Result<(), ValidationError> {
    if let Some(timeout) = config.idle_timeout {
        if !(http_client_limits::MIN_IDLE_TIMEOUT..=http_client_limits::MAX_IDLE_TIMEOUT)
            .contains(&timeout)
        {
            return Err(ValidationError::new("invalid_idle_timeout"));
        }
    }
    Ok(())
}

// 自定义验证函数 - 验证Keepalive
fn validate_keepalive(config: &HttpClientConfig) -> Result<(), ValidationError> {
    if let Some(value) = config.keepalive {
        if !(http_client_limits::MIN_KEEPALIVE..=http_client_limits::MAX_KEEPALIVE).contains(&value)
        {
            return Err(ValidationError::new("invalid_keepalive"));
        }
    }
    Ok(())
}

// HTTP客户端配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
#[validate(schema(
    function = "validate_idle_timeout",
    message = "Idle timeout is out of range"
))]
#[validate(schema(function = "validate_keepalive", message = "Keepalive is out of range"))]
pub struct HttpClientConfig {
    // 连接超时（秒）
    #[validate(range(
        min = http_client_limits::MIN_CONNECT_TIMEOUT,
        max = http_client_limits::MAX_CONNECT_TIMEOUT,
        message = "Connect timeout must be between {} and {} seconds"
    ))]
    pub connect_timeout: u64,
    // 请求超时（秒）
    #[validate(range(
        min = http_client_limits::MIN_REQUEST_TIMEOUT,
        max = http_client_limits::MAX_REQUEST_TIMEOUT,
        message = "Request timeout must be between {} and {} seconds"
    ))]
    pub request_timeout: u64,
    // 空闲连接超时（秒）（可选）
    pub idle_timeout: Option<u64>,
    // TCP Keepalive（秒）（可选）
    pub keepalive: Option<u32>,
    // HTTP用户代理（可选）
    pub agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: http_client_limits::DEFAULT_CONNECT_TIMEOUT,
            request_timeout: http_client_limits::DEFAULT_REQUEST_TIMEOUT,
            idle_timeout: Some(http_client_limits::DEFAULT_IDLE_TIMEOUT),
            keepalive: Some(http_client_limits::DEFAULT_KEEPALIVE),
            agent: None,
        }
    }
}

// 重试配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
#[serde(rename_all = "lowercase")]
pub struct RetryConfig {
    // 重试次数
    #[validate(range(
        min = retry_limits::MIN_ATTEMPTS,
        max = retry_limits::MAX_ATTEMPTS,
        message = "Retry attempts must be between {} and {}"
    ))]
    pub attempts: u32,
    // 重试初始延迟（秒）
    #[validate(range(
        min = retry_limits::MIN_DELAY,
        max = retry_limits::MAX_DELAY,
        message = "Retry delay must be between {} and {} seconds"
    ))]
    pub delay: u32,
}

// 默认最大规则集文件大小
fn default_max_size() -> usize {
    rule_set::DEFAULT_MAX_SIZE
}

// 规则集下载配置
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct DownloadConfig {
    // HTTP客户端配置
    #[serde(default)]
    #[validate(nested)]
    pub http_client: HttpClientConfig,
    // 重试配置（可选，默认不重试）
    #[serde(default)]
    #[validate(nested)]
    pub retry: Option<RetryConfig>,
    // 下载代理（可选）
    #[serde(default)]
    pub proxy: Option<String>,
    // 最大规则集文件大小（字节）
    #[serde(default = "default_max_size")]
    #[validate(range(min = 1, message = "Max size must be greater than 0"))]
    pub max_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            http_client: HttpClientConfig::default(),
            retry: None,
            proxy: None,
            max_size: default_max_size(),
        }
    }
}
