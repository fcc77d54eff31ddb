use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::error;

/// 固定宽度的工作池
///
/// 任务放入容量等于任务数的通道，由至多 `width` 个 worker 共同消费。
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    width: usize,
}

impl WorkerPool {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// 执行全部任务并等待完成，结果顺序不保证
    pub async fn run<J, T, F, Fut>(&self, jobs: Vec<J>, handler: F) -> Vec<T>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        if jobs.is_empty() {
            return Vec::new();
        }

        let total = jobs.len();
        let (tx, rx) = mpsc::channel(total);
        for job in jobs {
            // 容量足够，不会阻塞
            if tx.send(job).await.is_err() {
                break;
            }
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);
        let mut workers = JoinSet::new();

        for _ in 0..self.width.min(total) {
            let rx = Arc::clone(&rx);
            let handler = Arc::clone(&handler);
            workers.spawn(async move {
                let mut results = Vec::new();
                loop {
                    let job = rx.lock().await.recv().await;
                    match job {
                        Some(job) => results.push(handler(job).await),
                        None => break,
                    }
                }
                results
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(batch) => results.extend(batch),
                Err(e) => error!("Rule-set worker terminated abnormally: {}", e),
            }
        }

        results
    }
}
