use crate::config::DownloadConfig;
use crate::error::AppError;
use crate::http_client::HttpClient;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::debug;

/// 规则集获取特征
#[async_trait]
pub trait RuleSetFetcher: Send + Sync {
    /// 下载规则集内容
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

/// 基于 HTTP 的规则集获取器
pub struct HttpRuleSetFetcher {
    client: ClientWithMiddleware,
    max_size: usize,
}

impl HttpRuleSetFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self, AppError> {
        let client = HttpClient::create(
            &config.http_client,
            config.proxy.as_deref(),
            config.retry.as_ref(),
        )?;

        Ok(Self {
            client,
            max_size: config.max_size,
        })
    }

    fn check_size(&self, url: &str, size: usize) -> Result<(), AppError> {
        if size > self.max_size {
            return Err(AppError::Download(format!(
                "Rule-set {} size ({} bytes) exceeds configured limit ({} bytes)",
                url, size, self.max_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleSetFetcher for HttpRuleSetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        debug!("Downloading rule-set from URL: {}", url);

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Download(format!(
                "Failed to fetch rule-set {}, status: {}",
                url,
                response.status()
            )));
        }

        // 先根据声明的长度拒绝过大的文件
        if let Some(length) = response.content_length() {
            self.check_size(url, usize::try_from(length).unwrap_or(usize::MAX))?;
        }

        let content = response.bytes().await?;
        self.check_size(url, content.len())?;

        if content.is_empty() {
            return Err(AppError::Download(format!(
                "Rule-set {} returned an empty body",
                url
            )));
        }

        Ok(content.to_vec())
    }
}
