use crate::config::{Node, ProtocolOptions, TlsOptions, TransportOptions};
use crate::r#const::vmess_defaults;
use serde::Serialize;
use std::collections::BTreeMap;

use super::transport::normalize_ws_path;
use super::ProxyEncoder;

// 所有节点出站共有的字段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Endpoint {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
}

// sing-box 节点出站
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProxyOutbound {
    Shadowsocks(ShadowsocksOutbound),
    Vmess(VmessOutbound),
    Vless(VlessOutbound),
    Trojan(TrojanOutbound),
    Hysteria2(Hysteria2Outbound),
    Tuic(TuicOutbound),
}

impl ProxyOutbound {
    pub fn tag(&self) -> &str {
        match self {
            Self::Shadowsocks(o) => &o.endpoint.tag,
            Self::Vmess(o) => &o.endpoint.tag,
            Self::Vless(o) => &o.endpoint.tag,
            Self::Trojan(o) => &o.endpoint.tag,
            Self::Hysteria2(o) => &o.endpoint.tag,
            Self::Tuic(o) => &o.endpoint.tag,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadowsocksOutbound {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VmessOutbound {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub security: &'static str,
    pub alter_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutboundTls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<V2RayTransport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlessOutbound {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutboundTls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<V2RayTransport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrojanOutbound {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub tls: OutboundTls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<V2RayTransport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hysteria2Outbound {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<Obfs>,
    pub tls: OutboundTls,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuicOutbound {
    #[serde(flatten)]
    pub endpoint: Endpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congestion_control: Option<String>,
    pub tls: OutboundTls,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obfs {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundTls {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utls: Option<Utls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality: Option<Reality>,
}

impl OutboundTls {
    // 只包含 SNI 与证书校验开关的 TLS 块
    fn basic(tls: Option<&TlsOptions>) -> Self {
        Self {
            enabled: true,
            server_name: tls.and_then(|t| t.server_name.clone()),
            insecure: tls.and_then(|t| t.insecure),
            alpn: Vec::new(),
            utls: None,
            reality: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utls {
    pub enabled: bool,
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reality {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct V2RayTransport {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_early_data: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub early_data_header_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

impl From<&TransportOptions> for V2RayTransport {
    fn from(transport: &TransportOptions) -> Self {
        let mut rendered = Self {
            kind: transport.network().to_string(),
            path: None,
            headers: BTreeMap::new(),
            max_early_data: None,
            early_data_header_name: None,
            service_name: None,
        };

        match transport {
            TransportOptions::WebSocket { path, headers } => {
                if let Some(ws_path) = path.as_deref().map(normalize_ws_path) {
                    rendered.early_data_header_name = ws_path.early_data_header_name();
                    rendered.max_early_data = ws_path.max_early_data;
                    rendered.path = Some(ws_path.path);
                }
                rendered.headers = headers.clone();
            }
            TransportOptions::Grpc { service_name } => {
                rendered.service_name = service_name.clone();
            }
            TransportOptions::Other(_) => {}
        }

        rendered
    }
}

/// sing-box 格式的协议编码器
#[derive(Debug, Clone, Copy, Default)]
pub struct SingBoxEncoder;

impl ProxyEncoder for SingBoxEncoder {
    type Stanza = ProxyOutbound;

    fn encode(&self, node: &Node) -> Option<ProxyOutbound> {
        let endpoint = Endpoint {
            tag: node.tag.clone(),
            server: node.server.clone(),
            server_port: node.server_port,
        };

        let outbound = match node.protocol.as_ref()? {
            ProtocolOptions::Shadowsocks(ss) => ProxyOutbound::Shadowsocks(ShadowsocksOutbound {
                endpoint,
                method: ss.method.clone(),
                password: ss.password.clone(),
            }),
            ProtocolOptions::VMess(vmess) => ProxyOutbound::Vmess(VmessOutbound {
                endpoint,
                uuid: vmess.uuid.clone(),
                security: vmess_defaults::SECURITY,
                alter_id: vmess.alter_id,
                tls: vmess
                    .tls
                    .as_ref()
                    .filter(|tls| tls.enabled)
                    .map(|tls| OutboundTls::basic(Some(tls))),
                transport: vmess.transport.as_ref().map(V2RayTransport::from),
            }),
            ProtocolOptions::VLess(vless) => ProxyOutbound::Vless(VlessOutbound {
                endpoint,
                uuid: vless.uuid.clone(),
                flow: vless.flow.clone(),
                tls: vless.tls.as_ref().filter(|tls| tls.enabled).map(|tls| {
                    let mut rendered = OutboundTls::basic(Some(tls));
                    rendered.utls = tls.utls.as_ref().map(|utls| Utls {
                        enabled: true,
                        fingerprint: utls.fingerprint.clone(),
                    });
                    rendered.reality = tls.reality.as_ref().map(|reality| Reality {
                        enabled: true,
                        public_key: reality.public_key.clone(),
                        short_id: reality.short_id.clone(),
                    });
                    rendered
                }),
                transport: vless.transport.as_ref().map(V2RayTransport::from),
            }),
            ProtocolOptions::Trojan(trojan) => ProxyOutbound::Trojan(TrojanOutbound {
                endpoint,
                password: trojan.password.clone(),
                tls: OutboundTls::basic(trojan.tls.as_ref()),
                transport: trojan.transport.as_ref().map(V2RayTransport::from),
            }),
            ProtocolOptions::Hysteria2(hy2) => ProxyOutbound::Hysteria2(Hysteria2Outbound {
                endpoint,
                password: hy2.password.clone(),
                obfs: hy2.obfs.as_ref().map(|obfs| Obfs {
                    kind: obfs.kind.clone(),
                    password: obfs.password.clone(),
                }),
                tls: OutboundTls::basic(hy2.tls.as_ref()),
            }),
            ProtocolOptions::Tuic(tuic) => ProxyOutbound::Tuic(TuicOutbound {
                endpoint,
                uuid: tuic.uuid.clone(),
                password: tuic.password.clone(),
                congestion_control: tuic.congestion_control.clone(),
                tls: OutboundTls {
                    alpn: tuic
                        .tls
                        .as_ref()
                        .map(|tls| tls.alpn.clone())
                        .unwrap_or_default(),
                    ..OutboundTls::basic(tuic.tls.as_ref())
                },
            }),
        };

        Some(outbound)
    }
}
