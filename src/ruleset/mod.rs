mod artifact;
mod fetcher;
mod pool;

pub use self::artifact::{is_fresh, list_available, temp_path, write_atomically};
pub use self::fetcher::{HttpRuleSetFetcher, RuleSetFetcher};
pub use self::pool::WorkerPool;

use crate::config::DownloadConfig;
use crate::error::{AppError, SyncError};
use crate::r#const::rule_set;
use crate::rule::{RuleSetSource, RuleSetTag};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// 一次同步的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    // 检查过的规则集数量
    pub checked: usize,
    // 本次下载成功的规则集
    pub downloaded: Vec<RuleSetTag>,
    // 同步后仍缺失的规则集
    pub missing: Vec<RuleSetTag>,
    // 下载失败的规则集及原因
    pub failures: Vec<(RuleSetTag, String)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// 存在失败时转换为汇总错误
    pub fn into_result(self) -> Result<Self, SyncError> {
        if self.failures.is_empty() {
            return Ok(self);
        }

        Err(SyncError::PartialFailure {
            failed: self.failures.len(),
            attempted: self.failures.len() + self.downloaded.len(),
            missing: self.missing.iter().map(ToString::to_string).collect(),
        })
    }
}

/// 规则集同步器
///
/// 同一时刻只运行一次同步；编译不受影响。
pub struct RuleSetSynchronizer {
    dir: PathBuf,
    fetcher: Arc<dyn RuleSetFetcher>,
    pool: WorkerPool,
    // 同步运行的单飞保护
    run_lock: Mutex<()>,
}

// 单个下载任务
struct DownloadJob {
    tag: RuleSetTag,
    url: String,
    path: PathBuf,
}

impl RuleSetSynchronizer {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn RuleSetFetcher>) -> Self {
        Self {
            dir: dir.into(),
            fetcher,
            pool: WorkerPool::new(rule_set::MAX_CONCURRENT_DOWNLOADS),
            run_lock: Mutex::new(()),
        }
    }

    /// 使用 HTTP 获取器创建同步器
    pub fn from_config(dir: impl Into<PathBuf>, config: &DownloadConfig) -> Result<Self, AppError> {
        let fetcher = HttpRuleSetFetcher::new(config)?;
        Ok(Self::new(dir, Arc::new(fetcher)))
    }

    pub fn local_path(&self, tag: &RuleSetTag) -> PathBuf {
        tag.local_path(&self.dir)
    }

    /// 下载缺失或过期的规则集
    pub async fn ensure(
        &self,
        tags: &BTreeSet<RuleSetTag>,
        source: &RuleSetSource,
    ) -> Result<SyncReport, SyncError> {
        self.run(tags, source, false).await
    }

    /// 重新下载全部规则集
    pub async fn refresh_all(
        &self,
        tags: &BTreeSet<RuleSetTag>,
        source: &RuleSetSource,
    ) -> Result<SyncReport, SyncError> {
        self.run(tags, source, true).await
    }

    /// 目录中可用的规则集标签
    pub async fn available(&self) -> BTreeSet<String> {
        list_available(&self.dir).await
    }

    async fn run(
        &self,
        tags: &BTreeSet<RuleSetTag>,
        source: &RuleSetSource,
        force: bool,
    ) -> Result<SyncReport, SyncError> {
        let _guard = self.run_lock.lock().await;

        let mut report = SyncReport {
            checked: tags.len(),
            ..SyncReport::default()
        };

        if tags.is_empty() {
            return Ok(report);
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let mut jobs = Vec::new();
        for tag in tags {
            let path = self.local_path(tag);
            if !force && is_fresh(&path).await {
                debug!("Rule-set {} is fresh at {:?}", tag, path);
                continue;
            }
            jobs.push(DownloadJob {
                tag: tag.clone(),
                url: source.url_for(tag),
                path,
            });
        }

        if jobs.is_empty() {
            info!("Rule-set check: all {} rule-sets are present", tags.len());
            return Ok(report);
        }

        info!(
            "Rule-set check: downloading {}/{} rule-sets into {:?}",
            jobs.len(),
            tags.len(),
            self.dir
        );

        let fetcher = Arc::clone(&self.fetcher);
        let results = self
            .pool
            .run(jobs, move |job| {
                let fetcher = Arc::clone(&fetcher);
                async move {
                    let result = download(fetcher.as_ref(), &job).await;
                    (job.tag, result)
                }
            })
            .await;

        for (tag, result) in results {
            match result {
                Ok(()) => report.downloaded.push(tag),
                Err(e) => {
                    error!("Failed to download rule-set {}: {}", tag, e);
                    report.missing.push(tag.clone());
                    report.failures.push((tag, e.to_string()));
                }
            }
        }

        report.downloaded.sort();
        report.missing.sort();
        report.failures.sort();

        if !report.downloaded.is_empty() {
            info!("Downloaded {} rule-sets", report.downloaded.len());
        }
        if !report.failures.is_empty() {
            error!(
                "Failed to download {}/{} rule-sets",
                report.failures.len(),
                report.failures.len() + report.downloaded.len()
            );
        }

        Ok(report)
    }
}

async fn download(fetcher: &dyn RuleSetFetcher, job: &DownloadJob) -> Result<(), AppError> {
    let content = fetcher.fetch(&job.url).await?;
    if content.is_empty() {
        return Err(AppError::Download(format!(
            "Rule-set {} is empty",
            job.tag
        )));
    }
    write_atomically(&job.path, &content).await?;
    debug!("Saved rule-set {} to {:?}", job.tag, job.path);
    Ok(())
}
