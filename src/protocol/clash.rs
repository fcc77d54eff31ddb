use crate::config::{Node, ProtocolOptions, TlsOptions, TransportOptions};
use crate::r#const::vmess_defaults;
use serde::Serialize;
use std::collections::BTreeMap;

use super::transport::normalize_ws_path;
use super::ProxyEncoder;

// 所有 Clash 代理共有的字段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClashEndpoint {
    pub name: String,
    pub server: String,
    pub port: u16,
}

// Clash 代理条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClashProxy {
    #[serde(rename = "ss")]
    Shadowsocks(ClashShadowsocks),
    #[serde(rename = "vmess")]
    Vmess(ClashVmess),
    #[serde(rename = "vless")]
    Vless(ClashVless),
    #[serde(rename = "trojan")]
    Trojan(ClashTrojan),
    #[serde(rename = "hysteria2")]
    Hysteria2(ClashHysteria2),
    #[serde(rename = "tuic")]
    Tuic(ClashTuic),
}

impl ClashProxy {
    pub fn name(&self) -> &str {
        match self {
            Self::Shadowsocks(p) => &p.endpoint.name,
            Self::Vmess(p) => &p.endpoint.name,
            Self::Vless(p) => &p.endpoint.name,
            Self::Trojan(p) => &p.endpoint.name,
            Self::Hysteria2(p) => &p.endpoint.name,
            Self::Tuic(p) => &p.endpoint.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClashShadowsocks {
    #[serde(flatten)]
    pub endpoint: ClashEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub udp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashVmess {
    #[serde(flatten)]
    pub endpoint: ClashEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(rename = "alterId")]
    pub alter_id: u32,
    pub cipher: &'static str,
    #[serde(flatten)]
    pub tls: ClashTls,
    #[serde(flatten)]
    pub transport: ClashTransport,
    pub udp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashVless {
    #[serde(flatten)]
    pub endpoint: ClashEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(flatten)]
    pub tls: ClashTls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<ClashRealityOpts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    #[serde(flatten)]
    pub transport: ClashTransport,
    pub udp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashTrojan {
    #[serde(flatten)]
    pub endpoint: ClashEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub sni: ClashSni,
    #[serde(flatten)]
    pub transport: ClashTransport,
    pub udp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashHysteria2 {
    #[serde(flatten)]
    pub endpoint: ClashEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub sni: ClashSni,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashTuic {
    #[serde(flatten)]
    pub endpoint: ClashEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congestion_controller: Option<String>,
    #[serde(flatten)]
    pub sni: ClashSni,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
}

// vmess / vless 使用的 TLS 字段
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ClashTls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
}

impl ClashTls {
    // 仅在 TLS 启用时输出
    fn from_enabled(tls: Option<&TlsOptions>) -> Self {
        match tls.filter(|tls| tls.enabled) {
            Some(tls) => Self {
                tls: Some(true),
                servername: tls.server_name.clone(),
                skip_cert_verify: tls.insecure,
            },
            None => Self::default(),
        }
    }
}

// trojan / hysteria2 / tuic 使用的 SNI 字段
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ClashSni {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
}

impl ClashSni {
    fn from_tls(tls: Option<&TlsOptions>) -> Self {
        Self {
            sni: tls.and_then(|t| t.server_name.clone()),
            skip_cert_verify: tls.and_then(|t| t.insecure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClashRealityOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

// 传输层字段
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ClashTransport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<ClashWsOpts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<ClashGrpcOpts>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ClashWsOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_early_data: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_data_header_name: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ClashGrpcOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_service_name: Option<String>,
}

impl From<Option<&TransportOptions>> for ClashTransport {
    fn from(transport: Option<&TransportOptions>) -> Self {
        let Some(transport) = transport else {
            return Self::default();
        };

        let mut rendered = Self {
            network: Some(transport.network().to_string()),
            ..Self::default()
        };

        match transport {
            TransportOptions::WebSocket { path, headers } => {
                let mut ws_opts = ClashWsOpts {
                    headers: headers.clone(),
                    ..ClashWsOpts::default()
                };
                if let Some(ws_path) = path.as_deref().map(normalize_ws_path) {
                    ws_opts.early_data_header_name = ws_path.early_data_header_name();
                    ws_opts.max_early_data = ws_path.max_early_data;
                    ws_opts.path = Some(ws_path.path);
                }
                rendered.ws_opts = Some(ws_opts);
            }
            TransportOptions::Grpc { service_name } => {
                rendered.grpc_opts = Some(ClashGrpcOpts {
                    grpc_service_name: service_name.clone(),
                });
            }
            TransportOptions::Other(_) => {}
        }

        rendered
    }
}

/// Clash 格式的协议编码器
#[derive(Debug, Clone, Copy, Default)]
pub struct ClashEncoder;

impl ProxyEncoder for ClashEncoder {
    type Stanza = ClashProxy;

    fn encode(&self, node: &Node) -> Option<ClashProxy> {
        let endpoint = ClashEndpoint {
            name: node.tag.clone(),
            server: node.server.clone(),
            port: node.server_port,
        };

        let proxy = match node.protocol.as_ref()? {
            ProtocolOptions::Shadowsocks(ss) => ClashProxy::Shadowsocks(ClashShadowsocks {
                endpoint,
                cipher: ss.method.clone(),
                password: ss.password.clone(),
                udp: true,
            }),
            ProtocolOptions::VMess(vmess) => ClashProxy::Vmess(ClashVmess {
                endpoint,
                uuid: vmess.uuid.clone(),
                alter_id: vmess.alter_id,
                cipher: vmess_defaults::SECURITY,
                tls: ClashTls::from_enabled(vmess.tls.as_ref()),
                transport: ClashTransport::from(vmess.transport.as_ref()),
                udp: true,
            }),
            ProtocolOptions::VLess(vless) => {
                // reality 与指纹只在 TLS 启用时输出
                let enabled_tls = vless.tls.as_ref().filter(|tls| tls.enabled);
                ClashProxy::Vless(ClashVless {
                    endpoint,
                    uuid: vless.uuid.clone(),
                    flow: vless.flow.clone(),
                    tls: ClashTls::from_enabled(enabled_tls),
                    reality_opts: enabled_tls
                        .and_then(|tls| tls.reality.as_ref())
                        .map(|reality| ClashRealityOpts {
                            public_key: reality.public_key.clone(),
                            short_id: reality.short_id.clone(),
                        }),
                    client_fingerprint: enabled_tls
                        .and_then(|tls| tls.utls.as_ref())
                        .map(|utls| utls.fingerprint.clone()),
                    transport: ClashTransport::from(vless.transport.as_ref()),
                    udp: true,
                })
            }
            ProtocolOptions::Trojan(trojan) => ClashProxy::Trojan(ClashTrojan {
                endpoint,
                password: trojan.password.clone(),
                sni: ClashSni::from_tls(trojan.tls.as_ref()),
                transport: ClashTransport::from(trojan.transport.as_ref()),
                udp: true,
            }),
            ProtocolOptions::Hysteria2(hy2) => ClashProxy::Hysteria2(ClashHysteria2 {
                endpoint,
                password: hy2.password.clone(),
                sni: ClashSni::from_tls(hy2.tls.as_ref()),
                obfs: hy2.obfs.as_ref().and_then(|obfs| obfs.kind.clone()),
                obfs_password: hy2.obfs.as_ref().and_then(|obfs| obfs.password.clone()),
            }),
            ProtocolOptions::Tuic(tuic) => ClashProxy::Tuic(ClashTuic {
                endpoint,
                uuid: tuic.uuid.clone(),
                password: tuic.password.clone(),
                congestion_controller: tuic.congestion_control.clone(),
                sni: ClashSni::from_tls(tuic.tls.as_ref()),
                alpn: tuic
                    .tls
                    .as_ref()
                    .map(|tls| tls.alpn.clone())
                    .unwrap_or_default(),
            }),
        };

        Some(proxy)
    }
}
