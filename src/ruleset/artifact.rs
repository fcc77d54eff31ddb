use crate::r#const::rule_set;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, warn};

// <path>.tmp
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(rule_set::TEMP_SUFFIX);
    PathBuf::from(name)
}

/// 本地规则集是否可用：存在、非空且未过期
pub async fn is_fresh(path: &Path) -> bool {
    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(_) => return false,
    };

    if !metadata.is_file() || metadata.len() == 0 {
        return false;
    }

    let max_age = Duration::from_secs(rule_set::STALE_AFTER_SECS);
    match metadata.modified() {
        // 修改时间在未来时 elapsed 返回错误，视为新鲜
        Ok(modified) => SystemTime::now()
            .duration_since(modified)
            .map(|age| age <= max_age)
            .unwrap_or(true),
        Err(e) => {
            warn!("Cannot read modification time of {:?}: {}", path, e);
            false
        }
    }
}

/// 先写临时文件再重命名，失败时清理临时文件，原文件保持不变
pub async fn write_atomically(path: &Path, content: &[u8]) -> io::Result<()> {
    let tmp = temp_path(path);

    let result = async {
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove temporary file {:?}: {}", tmp, e);
            }
        }
    }

    result
}

/// 列出目录中非空的规则集标签
pub async fn list_available(dir: &Path) -> BTreeSet<String> {
    let mut available = BTreeSet::new();

    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Rule-set directory {:?} is not readable: {}", dir, e);
            return available;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(rule_set::EXTENSION) {
            continue;
        }

        let non_empty = matches!(fs::metadata(&path).await, Ok(m) if m.is_file() && m.len() > 0);
        if let (true, Some(tag)) = (non_empty, path.file_stem().and_then(|s| s.to_str())) {
            available.insert(tag.to_string());
        }
    }

    available
}
