use assert_matches::assert_matches;
use async_trait::async_trait;
use boxsmith::config::{DownloadConfig, HttpClientConfig};
use boxsmith::error::{AppError, SyncError};
use boxsmith::rule::{RuleSetSource, RuleSetTag};
use boxsmith::ruleset::{
    is_fresh, temp_path, HttpRuleSetFetcher, RuleSetFetcher, RuleSetSynchronizer, WorkerPool,
};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

// 计数获取器：记录调用次数与并发峰值
#[derive(Default)]
struct CountingFetcher {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl RuleSetFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if url.contains("broken") {
            return Err(AppError::Download("HTTP 404".to_string()));
        }
        Ok(format!("content of {}", url).into_bytes())
    }
}

fn source(base_url: &str) -> RuleSetSource {
    RuleSetSource {
        base_url: base_url.to_string(),
        github_proxy: None,
    }
}

fn tags(names: &[&str]) -> BTreeSet<RuleSetTag> {
    names.iter().map(|name| RuleSetTag::geosite(*name)).collect()
}

fn make_stale(path: &Path) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60))
        .unwrap();
}

fn download_config() -> DownloadConfig {
    DownloadConfig {
        http_client: HttpClientConfig {
            connect_timeout: 2,
            request_timeout: 5,
            ..HttpClientConfig::default()
        },
        ..DownloadConfig::default()
    }
}

#[tokio::test]
async fn test_http_download_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rules/geosite-google.srs"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"SRS\x01binary".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let synchronizer = RuleSetSynchronizer::from_config(dir.path(), &download_config()).unwrap();
    let wanted = tags(&["google"]);

    let report = synchronizer
        .ensure(&wanted, &source(&format!("{}/rules", mock_server.uri())))
        .await
        .unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.downloaded, vec![RuleSetTag::geosite("google")]);
    assert!(report.missing.is_empty());
    assert!(report.is_complete());

    let artifact = dir.path().join("geosite-google.srs");
    assert_eq!(fs::read(&artifact).unwrap(), b"SRS\x01binary");
    assert!(!temp_path(&artifact).exists());
    assert!(synchronizer.available().await.contains("geosite-google"));
}

#[tokio::test]
async fn test_http_failure_keeps_prior_artifact() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rules/geosite-google.srs"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rules/geosite-empty.srs"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let prior = dir.path().join("geosite-google.srs");
    fs::write(&prior, b"old artifact").unwrap();
    make_stale(&prior);

    let synchronizer = RuleSetSynchronizer::from_config(dir.path(), &download_config()).unwrap();
    let report = synchronizer
        .ensure(
            &tags(&["google", "empty"]),
            &source(&format!("{}/rules", mock_server.uri())),
        )
        .await
        .unwrap();

    assert_eq!(report.failures.len(), 2);
    assert_eq!(
        report.missing,
        vec![RuleSetTag::geosite("empty"), RuleSetTag::geosite("google")]
    );

    // 原有文件不变，没有临时文件和零字节文件
    assert_eq!(fs::read(&prior).unwrap(), b"old artifact");
    assert!(!temp_path(&prior).exists());
    let empty = dir.path().join("geosite-empty.srs");
    assert!(!empty.exists());
    assert!(!temp_path(&empty).exists());

    assert_matches!(
        report.into_result(),
        Err(SyncError::PartialFailure { failed: 2, attempted: 2, missing }) if missing.len() == 2
    );
}

#[tokio::test]
async fn test_http_body_size_limit() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geosite-large.srs"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
        .mount(&mock_server)
        .await;

    let config = DownloadConfig {
        max_size: 16,
        ..download_config()
    };
    let fetcher = HttpRuleSetFetcher::new(&config).unwrap();
    let result = fetcher
        .fetch(&format!("{}/geosite-large.srs", mock_server.uri()))
        .await;

    assert_matches!(result, Err(AppError::Download(message)) if message.contains("exceeds"));
}

#[tokio::test]
async fn test_fresh_artifacts_make_no_calls() {
    let dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(format!("geosite-{}.srs", name)), b"data").unwrap();
    }

    let fetcher = Arc::new(CountingFetcher::default());
    let synchronizer = RuleSetSynchronizer::new(dir.path(), fetcher.clone());

    let report = synchronizer
        .ensure(&tags(&["a", "b", "c"]), &source("https://rules.example.com"))
        .await
        .unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.checked, 3);
    assert!(report.downloaded.is_empty());
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn test_stale_and_empty_artifacts_are_refetched() {
    let dir = TempDir::new().unwrap();
    let fresh = dir.path().join("geosite-fresh.srs");
    let stale = dir.path().join("geosite-stale.srs");
    let zero = dir.path().join("geosite-zero.srs");
    fs::write(&fresh, b"data").unwrap();
    fs::write(&stale, b"data").unwrap();
    fs::write(&zero, b"").unwrap();
    make_stale(&stale);

    assert!(is_fresh(&fresh).await);
    assert!(!is_fresh(&stale).await);
    assert!(!is_fresh(&zero).await);

    let fetcher = Arc::new(CountingFetcher::default());
    let synchronizer = RuleSetSynchronizer::new(dir.path(), fetcher.clone());
    let report = synchronizer
        .ensure(
            &tags(&["fresh", "stale", "zero", "missing"]),
            &source("https://rules.example.com"),
        )
        .await
        .unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        report.downloaded,
        vec![
            RuleSetTag::geosite("missing"),
            RuleSetTag::geosite("stale"),
            RuleSetTag::geosite("zero"),
        ]
    );
    assert!(is_fresh(&stale).await);
    assert!(is_fresh(&zero).await);
}

#[tokio::test]
async fn test_refresh_all_downloads_everything() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("geosite-a.srs"), b"data").unwrap();

    let fetcher = Arc::new(CountingFetcher::default());
    let synchronizer = RuleSetSynchronizer::new(dir.path(), fetcher.clone());
    let report = synchronizer
        .refresh_all(&tags(&["a", "b"]), &source("https://rules.example.com"))
        .await
        .unwrap();

    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.downloaded.len(), 2);
}

#[tokio::test]
async fn test_partial_failure_preserves_successes() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(CountingFetcher::default());
    let synchronizer = RuleSetSynchronizer::new(dir.path(), fetcher.clone());

    let report = synchronizer
        .ensure(&tags(&["ok", "broken"]), &source("https://rules.example.com"))
        .await
        .unwrap();

    assert_eq!(report.downloaded, vec![RuleSetTag::geosite("ok")]);
    assert_eq!(report.missing, vec![RuleSetTag::geosite("broken")]);
    assert!(dir.path().join("geosite-ok.srs").exists());
    assert!(!dir.path().join("geosite-broken.srs").exists());

    // 下一次 ensure 重新尝试失败的规则集
    let report = synchronizer
        .ensure(&tags(&["ok", "broken"]), &source("https://rules.example.com"))
        .await
        .unwrap();
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.missing, vec![RuleSetTag::geosite("broken")]);
}

#[tokio::test]
async fn test_pool_width_is_bounded() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(CountingFetcher {
        delay: Duration::from_millis(50),
        ..CountingFetcher::default()
    });
    let synchronizer = RuleSetSynchronizer::new(dir.path(), fetcher.clone());

    let names: Vec<String> = (0..12).map(|i| format!("set{}", i)).collect();
    let wanted: BTreeSet<RuleSetTag> = names.iter().map(RuleSetTag::geosite).collect();

    let report = synchronizer
        .ensure(&wanted, &source("https://rules.example.com"))
        .await
        .unwrap();

    assert_eq!(report.downloaded.len(), 12);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 12);
    let peak = fetcher.peak.load(Ordering::SeqCst);
    assert!(peak <= 5, "peak concurrency was {}", peak);
    assert!(peak > 1, "downloads did not overlap");
}

#[tokio::test]
async fn test_runs_are_serialized() {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(CountingFetcher {
        delay: Duration::from_millis(30),
        ..CountingFetcher::default()
    });
    let synchronizer = Arc::new(RuleSetSynchronizer::new(dir.path(), fetcher.clone()));
    let wanted = tags(&["shared"]);
    let rule_source = source("https://rules.example.com");

    // 第二次运行在第一次完成后看到新鲜的文件
    let (first, second) = tokio::join!(
        synchronizer.ensure(&wanted, &rule_source),
        synchronizer.ensure(&wanted, &rule_source)
    );

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_worker_pool_runs_every_job() {
    let pool = WorkerPool::new(3);
    assert_eq!(pool.width(), 3);

    let mut results = pool.run((0..10).collect(), |n: u32| async move { n * 2 }).await;
    results.sort();
    assert_eq!(results, (0..10).map(|n| n * 2).collect::<Vec<_>>());

    let empty: Vec<u32> = pool.run(Vec::<u32>::new(), |n: u32| async move { n }).await;
    assert!(empty.is_empty());
    assert_eq!(WorkerPool::new(0).width(), 1);
}
