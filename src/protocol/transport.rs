use crate::r#const::early_data;
use url::form_urlencoded;

/// 规范化后的 WebSocket 路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsPath {
    // 去掉查询串后的路径
    pub path: String,
    // 早期数据字节上限，仅在原路径携带 `ed=<N>` 时存在
    pub max_early_data: Option<u32>,
}

impl WsPath {
    // 早期数据头名，与 max_early_data 同时出现
    pub fn early_data_header_name(&self) -> Option<&'static str> {
        self.max_early_data.map(|_| early_data::HEADER_NAME)
    }
}

/// 拆分路径中的 `ed=<N>` 参数
///
/// `/ws?ed=4096` 变为 `/ws` + 4096，`?ed=2048` 变为 `/` + 2048；
/// 不含有效 `ed` 参数的路径原样返回。
pub fn normalize_ws_path(raw: &str) -> WsPath {
    let passthrough = || WsPath {
        path: raw.to_string(),
        max_early_data: None,
    };

    let Some((path, query)) = raw.split_once('?') else {
        return passthrough();
    };

    let max_early_data = form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == early_data::QUERY_KEY)
        .and_then(|(_, value)| value.parse::<u32>().ok())
        .filter(|limit| *limit > 0);

    match max_early_data {
        Some(limit) => WsPath {
            path: if path.is_empty() {
                early_data::DEFAULT_PATH.to_string()
            } else {
                path.to_string()
            },
            max_early_data: Some(limit),
        },
        None => passthrough(),
    }
}
