use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use validator::Validate;

/// 节点的存储形态：协议相关字段全部放在 `extra` 字段包中
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeRecord {
    // 节点标签
    pub tag: String,
    // 协议类型
    #[serde(rename = "type")]
    pub kind: String,
    // 服务器地址
    pub server: String,
    // 服务器端口
    pub server_port: u16,
    // 国家代码（可选）
    #[serde(default)]
    pub country: Option<String>,
    // 协议相关字段
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// 编译使用的节点
///
/// 反序列化时由 [`NodeRecord`] 转换而来，字段包只在加载阶段解析一次。
/// `protocol` 为 `None` 表示协议类型未知，编码时会被跳过。
#[derive(Debug, Deserialize, Clone, PartialEq, Validate)]
#[serde(from = "NodeRecord")]
pub struct Node {
    #[validate(length(min = 1, message = "Node tag must not be empty"))]
    pub tag: String,
    // 原始协议类型名
    pub kind: String,
    #[validate(length(min = 1, message = "Node server must not be empty"))]
    pub server: String,
    #[validate(range(min = 1, message = "Node port must be greater than 0"))]
    pub server_port: u16,
    // 大写、去空白后的国家代码
    pub country: Option<String>,
    pub protocol: Option<ProtocolOptions>,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let protocol = ProtocolOptions::from_field_bag(&record.kind, &record.extra);
        let country = record
            .country
            .map(|code| code.trim().to_ascii_uppercase())
            .filter(|code| !code.is_empty());

        Self {
            tag: record.tag,
            kind: record.kind,
            server: record.server,
            server_port: record.server_port,
            country,
            protocol,
        }
    }
}

/// 协议相关配置（封闭集合）
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolOptions {
    Shadowsocks(ShadowsocksOptions),
    VMess(VMessOptions),
    VLess(VLessOptions),
    Trojan(TrojanOptions),
    Hysteria2(Hysteria2Options),
    Tuic(TuicOptions),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShadowsocksOptions {
    pub method: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VMessOptions {
    pub uuid: Option<String>,
    // 缺省为 0
    pub alter_id: u32,
    pub tls: Option<TlsOptions>,
    pub transport: Option<TransportOptions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VLessOptions {
    pub uuid: Option<String>,
    // 流控（如 xtls-rprx-vision），空字符串视为未设置
    pub flow: Option<String>,
    pub tls: Option<TlsOptions>,
    pub transport: Option<TransportOptions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrojanOptions {
    pub password: Option<String>,
    pub tls: Option<TlsOptions>,
    pub transport: Option<TransportOptions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Hysteria2Options {
    pub password: Option<String>,
    pub tls: Option<TlsOptions>,
    pub obfs: Option<ObfsOptions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TuicOptions {
    pub uuid: Option<String>,
    pub password: Option<String>,
    pub congestion_control: Option<String>,
    pub tls: Option<TlsOptions>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TlsOptions {
    pub enabled: bool,
    pub server_name: Option<String>,
    // 跳过证书校验
    pub insecure: Option<bool>,
    pub alpn: Vec<String>,
    pub utls: Option<UtlsOptions>,
    // 仅在 reality.enabled 为 true 时存在
    pub reality: Option<RealityOptions>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtlsOptions {
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RealityOptions {
    pub public_key: Option<String>,
    pub short_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportOptions {
    WebSocket {
        path: Option<String>,
        headers: BTreeMap<String, String>,
    },
    Grpc {
        service_name: Option<String>,
    },
    // 其他传输类型只透传类型名
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObfsOptions {
    pub kind: Option<String>,
    pub password: Option<String>,
}

impl ProtocolOptions {
    /// 从字段包解析协议配置，未知协议返回 `None`
    ///
    /// 缺失或类型不符的字段直接忽略，不会导致解析失败。
    pub fn from_field_bag(kind: &str, extra: &Map<String, Value>) -> Option<Self> {
        let bag = FieldBag(extra);
        let options = match kind {
            "shadowsocks" => Self::Shadowsocks(ShadowsocksOptions {
                method: bag.string("method"),
                password: bag.string("password"),
            }),
            "vmess" => Self::VMess(VMessOptions {
                uuid: bag.string("uuid"),
                alter_id: bag.u32("alter_id").unwrap_or(0),
                tls: bag.bag("tls").map(TlsOptions::from_bag),
                transport: bag.bag("transport").and_then(TransportOptions::from_bag),
            }),
            "vless" => Self::VLess(VLessOptions {
                uuid: bag.string("uuid"),
                flow: bag.string("flow").filter(|flow| !flow.is_empty()),
                tls: bag.bag("tls").map(TlsOptions::from_bag),
                transport: bag.bag("transport").and_then(TransportOptions::from_bag),
            }),
            "trojan" => Self::Trojan(TrojanOptions {
                password: bag.string("password"),
                tls: bag.bag("tls").map(TlsOptions::from_bag),
                transport: bag.bag("transport").and_then(TransportOptions::from_bag),
            }),
            "hysteria2" => Self::Hysteria2(Hysteria2Options {
                password: bag.string("password"),
                tls: bag.bag("tls").map(TlsOptions::from_bag),
                obfs: bag.bag("obfs").map(|obfs| ObfsOptions {
                    kind: obfs.string("type"),
                    password: obfs.string("password"),
                }),
            }),
            "tuic" => Self::Tuic(TuicOptions {
                uuid: bag.string("uuid"),
                password: bag.string("password"),
                congestion_control: bag.string("congestion_control"),
                tls: bag.bag("tls").map(TlsOptions::from_bag),
            }),
            _ => return None,
        };
        Some(options)
    }
}

impl TlsOptions {
    fn from_bag(tls: FieldBag<'_>) -> Self {
        let reality = tls
            .bag("reality")
            .filter(|reality| reality.boolean("enabled") == Some(true))
            .map(|reality| RealityOptions {
                public_key: reality.string("public_key"),
                short_id: reality.string("short_id"),
            });
        let utls = tls
            .bag("utls")
            .and_then(|utls| utls.string("fingerprint"))
            .map(|fingerprint| UtlsOptions { fingerprint });

        Self {
            enabled: tls.boolean("enabled").unwrap_or(false),
            server_name: tls.string("server_name"),
            insecure: tls.boolean("insecure"),
            alpn: tls.string_list("alpn"),
            utls,
            reality,
        }
    }
}

impl TransportOptions {
    fn from_bag(transport: FieldBag<'_>) -> Option<Self> {
        let kind = transport.string("type")?;
        let options = match kind.as_str() {
            "ws" => Self::WebSocket {
                path: transport.string("path"),
                headers: transport
                    .bag("headers")
                    .map(|headers| headers.string_entries())
                    .unwrap_or_default(),
            },
            "grpc" => Self::Grpc {
                service_name: transport.string("service_name"),
            },
            _ => Self::Other(kind),
        };
        Some(options)
    }

    // 传输类型名
    pub fn network(&self) -> &str {
        match self {
            Self::WebSocket { .. } => "ws",
            Self::Grpc { .. } => "grpc",
            Self::Other(kind) => kind,
        }
    }
}

// 字段包的只读视图，所有访问都返回 Option
#[derive(Clone, Copy)]
struct FieldBag<'a>(&'a Map<String, Value>);

impl<'a> FieldBag<'a> {
    fn string(&self, key: &str) -> Option<String> {
        self.0.get(key)?.as_str().map(str::to_string)
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    // 同时接受整数和浮点形式（JSON 数字）
    fn u32(&self, key: &str) -> Option<u32> {
        let value = self.0.get(key)?;
        let number = value.as_u64().or_else(|| {
            value
                .as_f64()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0)
                .map(|n| n as u64)
        })?;
        u32::try_from(number).ok()
    }

    fn bag(&self, key: &str) -> Option<FieldBag<'a>> {
        self.0.get(key)?.as_object().map(FieldBag)
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn string_entries(&self) -> BTreeMap<String, String> {
        self.0
            .iter()
            .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
            .collect()
    }
}
