use crate::error::CompileError;
use crate::group::{GroupKind, SelectorGroup};
use crate::protocol::{ProxyEncoder, ProxyOutbound, SingBoxEncoder};
use crate::r#const::{outbound_names, rule_set, singbox_defaults};
use crate::rule::{Criterion, RuleRecord, RuleSetSource, RuleSetTag};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

use super::{serialization_error, Assembler, CompilePlan, ExportFormat};

#[derive(Debug, Serialize)]
struct SingBoxDocument {
    log: LogSection,
    dns: DnsSection,
    inbounds: Vec<Inbound>,
    outbounds: Vec<Outbound>,
    route: RouteSection,
    experimental: Experimental,
}

#[derive(Debug, Serialize)]
struct LogSection {
    level: &'static str,
    timestamp: bool,
}

#[derive(Debug, Serialize)]
struct DnsSection {
    servers: Vec<DnsServer>,
    rules: Vec<DnsRule>,
    #[serde(rename = "final")]
    final_server: &'static str,
}

#[derive(Debug, Serialize)]
struct DnsServer {
    tag: &'static str,
    address: String,
    detour: &'static str,
}

#[derive(Debug, Serialize)]
struct DnsRule {
    outbound: &'static str,
    server: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Inbound {
    Mixed {
        tag: &'static str,
        listen: &'static str,
        listen_port: u16,
    },
    Tun {
        tag: &'static str,
        address: Vec<&'static str>,
        auto_route: bool,
        strict_route: bool,
        stack: &'static str,
    },
}

// 出站列表中的三类条目
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outbound {
    Group(GroupOutbound),
    Proxy(ProxyOutbound),
    Builtin(BuiltinOutbound),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum GroupOutbound {
    Selector {
        tag: String,
        outbounds: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Urltest {
        tag: String,
        outbounds: Vec<String>,
        url: String,
        interval: String,
        tolerance: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        idle_timeout: Option<&'static str>,
    },
}

impl GroupOutbound {
    fn render(group: &SelectorGroup, mobile_mode: bool) -> Self {
        match &group.kind {
            GroupKind::Select => Self::Selector {
                tag: group.name.clone(),
                outbounds: group.outbounds.clone(),
                default: group.default.clone(),
            },
            GroupKind::UrlTest {
                url,
                interval,
                tolerance,
            } => Self::Urltest {
                tag: group.name.clone(),
                outbounds: group.outbounds.clone(),
                url: url.clone(),
                interval: format!("{}s", interval),
                tolerance: *tolerance,
                idle_timeout: mobile_mode.then_some(singbox_defaults::MOBILE_URL_TEST_IDLE_TIMEOUT),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum BuiltinOutbound {
    Direct { tag: &'static str },
    Block { tag: &'static str },
}

#[derive(Debug, Serialize)]
struct RouteSection {
    rules: Vec<RouteRule>,
    rule_set: Vec<RuleSetEntry>,
    #[serde(rename = "final")]
    final_outbound: String,
    auto_detect_interface: bool,
}

#[derive(Debug, Default, Serialize)]
struct RouteRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    protocol: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    domain: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    domain_suffix: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    domain_keyword: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ip_cidr: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rule_set: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    port: Vec<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    port_range: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outbound: Option<String>,
}

impl RouteRule {
    fn action(action: &'static str) -> Self {
        Self {
            action: Some(action),
            ..Self::default()
        }
    }

    // 兜底记录与无法识别的端口返回 None
    fn from_record(record: &RuleRecord) -> Option<Self> {
        let mut rule = Self {
            outbound: Some(record.outbound.clone()),
            ..Self::default()
        };

        match &record.criterion {
            Criterion::Domain(value) => rule.domain.push(value.clone()),
            Criterion::DomainSuffix(value) => rule.domain_suffix.push(value.clone()),
            Criterion::DomainKeyword(value) => rule.domain_keyword.push(value.clone()),
            Criterion::IpCidr(value) => rule.ip_cidr.push(value.clone()),
            Criterion::RuleSet(tag) => rule.rule_set.push(tag.to_string()),
            Criterion::Port(value) => {
                if let Ok(port) = value.trim().parse::<u16>() {
                    rule.port.push(port);
                } else if is_port_range(value) {
                    rule.port_range.push(value.trim().to_string());
                } else {
                    warn!("Skipping invalid port rule value '{}'", value);
                    return None;
                }
            }
            Criterion::Match => return None,
        }

        Some(rule)
    }
}

// a:b 形式的端口范围
fn is_port_range(value: &str) -> bool {
    match value.trim().split_once(':') {
        Some((start, end)) => start.parse::<u16>().is_ok() && end.parse::<u16>().is_ok(),
        None => false,
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RuleSetEntry {
    Local {
        tag: String,
        format: &'static str,
        path: String,
    },
    Remote {
        tag: String,
        format: &'static str,
        url: String,
        download_detour: &'static str,
    },
}

#[derive(Debug, Serialize)]
struct Experimental {
    clash_api: ClashApi,
    cache_file: CacheFile,
}

#[derive(Debug, Serialize)]
struct ClashApi {
    external_controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
}

#[derive(Debug, Serialize)]
struct CacheFile {
    enabled: bool,
}

/// sing-box JSON 组装器
#[derive(Debug, Clone, Copy, Default)]
pub struct SingBoxAssembler;

impl SingBoxAssembler {
    fn dns(plan: &CompilePlan<'_>) -> DnsSection {
        let settings = &plan.snapshot.settings;
        DnsSection {
            servers: vec![
                DnsServer {
                    tag: singbox_defaults::DNS_PROXY_TAG,
                    address: settings.proxy_dns.clone(),
                    detour: outbound_names::PROXY,
                },
                DnsServer {
                    tag: singbox_defaults::DNS_DIRECT_TAG,
                    address: settings.direct_dns.clone(),
                    detour: outbound_names::DIRECT,
                },
            ],
            rules: vec![DnsRule {
                outbound: "any",
                server: singbox_defaults::DNS_DIRECT_TAG,
            }],
            final_server: singbox_defaults::DNS_PROXY_TAG,
        }
    }

    fn inbounds(plan: &CompilePlan<'_>) -> Vec<Inbound> {
        let settings = &plan.snapshot.settings;
        let mut inbounds = vec![Inbound::Mixed {
            tag: singbox_defaults::MIXED_INBOUND_TAG,
            listen: if settings.allow_lan {
                singbox_defaults::LISTEN_ANY
            } else {
                singbox_defaults::LISTEN_LOOPBACK
            },
            listen_port: settings.mixed_port,
        }];

        if settings.tun_enabled {
            inbounds.push(Inbound::Tun {
                tag: singbox_defaults::TUN_INBOUND_TAG,
                address: vec![singbox_defaults::TUN_ADDRESS],
                auto_route: true,
                strict_route: true,
                stack: singbox_defaults::TUN_STACK,
            });
        }

        inbounds
    }

    // 分组树在前，节点其次，最后是内置出站
    fn outbounds(plan: &CompilePlan<'_>) -> Vec<Outbound> {
        let groups = plan
            .groups
            .iter()
            .map(|group| Outbound::Group(GroupOutbound::render(group, plan.mobile_mode)));
        let proxies = SingBoxEncoder
            .encode_all(&plan.nodes)
            .into_iter()
            .map(Outbound::Proxy);
        let builtins = [
            BuiltinOutbound::Direct {
                tag: outbound_names::DIRECT,
            },
            BuiltinOutbound::Block {
                tag: outbound_names::REJECT,
            },
        ]
        .into_iter()
        .map(Outbound::Builtin);

        groups.chain(proxies).chain(builtins).collect()
    }

    fn route(plan: &CompilePlan<'_>) -> RouteSection {
        let mut rules = vec![
            RouteRule::action("sniff"),
            RouteRule {
                protocol: Some("dns"),
                ..RouteRule::action("hijack-dns")
            },
        ];
        rules.extend(plan.records.iter().filter_map(RouteRule::from_record));

        let final_outbound = plan
            .records
            .iter()
            .find(|record| record.criterion == Criterion::Match)
            .map(|record| record.outbound.clone())
            .unwrap_or_else(|| outbound_names::FINAL.to_string());

        let tags: BTreeSet<&RuleSetTag> = plan
            .records
            .iter()
            .filter_map(|record| match &record.criterion {
                Criterion::RuleSet(tag) => Some(tag),
                _ => None,
            })
            .collect();

        RouteSection {
            rules,
            rule_set: tags.into_iter().map(|tag| Self::rule_set_entry(plan, tag)).collect(),
            final_outbound,
            auto_detect_interface: true,
        }
    }

    // 移动端始终使用远程规则集
    fn rule_set_entry(plan: &CompilePlan<'_>, tag: &RuleSetTag) -> RuleSetEntry {
        match plan.local_rule_set_dir.filter(|_| !plan.mobile_mode) {
            Some(dir) => RuleSetEntry::Local {
                tag: tag.to_string(),
                format: rule_set::FORMAT,
                path: tag.local_path(dir).to_string_lossy().into_owned(),
            },
            None => RuleSetEntry::Remote {
                tag: tag.to_string(),
                format: rule_set::FORMAT,
                url: RuleSetSource::from_settings(&plan.snapshot.settings).url_for(tag),
                download_detour: outbound_names::DIRECT,
            },
        }
    }

    fn experimental(plan: &CompilePlan<'_>) -> Experimental {
        let settings = &plan.snapshot.settings;
        let host = if plan.mobile_mode {
            singbox_defaults::LISTEN_LOOPBACK
        } else {
            singbox_defaults::LISTEN_ANY
        };

        Experimental {
            clash_api: ClashApi {
                external_controller: format!("{}:{}", host, settings.clash_api_port),
                secret: settings.clash_api_secret().map(str::to_string),
            },
            cache_file: CacheFile { enabled: true },
        }
    }
}

impl Assembler for SingBoxAssembler {
    fn format(&self) -> ExportFormat {
        ExportFormat::SingBox
    }

    fn assemble(&self, plan: &CompilePlan<'_>) -> Result<String, CompileError> {
        let document = SingBoxDocument {
            log: LogSection {
                level: singbox_defaults::LOG_LEVEL,
                timestamp: true,
            },
            dns: Self::dns(plan),
            inbounds: Self::inbounds(plan),
            outbounds: Self::outbounds(plan),
            route: Self::route(plan),
            experimental: Self::experimental(plan),
        };

        serde_json::to_string_pretty(&document)
            .map_err(|e| serialization_error(self.format(), e))
    }
}
