use crate::config::{HttpClientConfig, RetryConfig};
use crate::error::{AppError, HttpClientError, InvalidProxyConfig};
use crate::r#const::retry_limits;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use retry_policies::Jitter;
use std::time::Duration;
use tracing::debug;

/// 规则集下载使用的 HTTP 客户端工厂
pub struct HttpClient;

impl HttpClient {
    // 创建HTTP客户端
    pub fn create(
        config: &HttpClientConfig,
        proxy: Option<&str>,
        retry_config: Option<&RetryConfig>,
    ) -> Result<ClientWithMiddleware, AppError> {
        debug!(
            "Creating HTTP client for rule-set downloads, config: {:?}, proxy: {:?}, retry_config: {:?}",
            config, proxy, retry_config
        );

        let mut client_builder = reqwest::ClientBuilder::new()
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.request_timeout));

        if let Some(keepalive) = config.keepalive {
            client_builder = client_builder.tcp_keepalive(Duration::from_secs(keepalive as u64));
        }

        if let Some(idle_timeout) = config.idle_timeout {
            client_builder = client_builder.pool_idle_timeout(Duration::from_secs(idle_timeout));
        }

        if let Some(ref agent) = config.agent {
            client_builder = client_builder.user_agent(agent);
        }

        // 配置下载代理
        if let Some(proxy_url) = proxy.filter(|p| !p.is_empty()) {
            client_builder = client_builder.proxy(reqwest::Proxy::all(proxy_url).map_err(|e| {
                AppError::InvalidProxy(InvalidProxyConfig(format!(
                    "Proxy configuration error: {}",
                    e
                )))
            })?);
        }

        let client = client_builder.build().map_err(|e| {
            AppError::HttpError(HttpClientError(format!(
                "Failed to create HTTP client: {}",
                e
            )))
        })?;

        // 默认不重试，失败的规则集留到下一次同步
        let middleware_client = match retry_config {
            Some(retry) => {
                let retry_policy = ExponentialBackoff::builder()
                    .retry_bounds(
                        Duration::from_secs(retry.delay as u64),
                        Duration::from_secs(retry_limits::MAX_DELAY as u64),
                    )
                    // 基数必须大于 1，否则退避时间不会增长
                    .base(2)
                    .jitter(Jitter::Bounded)
                    .build_with_max_retries(retry.attempts);

                ClientBuilder::new(client)
                    .with(RetryTransientMiddleware::new_with_policy(retry_policy))
                    .build()
            }
            None => ClientBuilder::new(client).build(),
        };

        Ok(middleware_client)
    }
}
