use crate::error::CompileError;
use crate::group::{GroupKind, SelectorGroup};
use crate::protocol::{ClashEncoder, ClashProxy, ProxyEncoder};
use crate::r#const::clash_defaults;
use crate::rule::{Criterion, RuleRecord, RuleSetKind};
use serde::Serialize;

use super::{serialization_error, Assembler, CompilePlan, ExportFormat};

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClashDocument {
    mixed_port: u16,
    allow_lan: bool,
    mode: &'static str,
    log_level: &'static str,
    external_controller: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    dns: ClashDns,
    #[serde(skip_serializing_if = "Option::is_none")]
    tun: Option<ClashTun>,
    proxies: Vec<ClashProxy>,
    proxy_groups: Vec<ClashProxyGroup>,
    rules: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClashDns {
    enable: bool,
    enhanced_mode: &'static str,
    fake_ip_range: &'static str,
    fake_ip_filter: Vec<&'static str>,
    default_nameserver: Vec<&'static str>,
    nameserver: Vec<&'static str>,
    fallback: Vec<&'static str>,
    fallback_filter: FallbackFilter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct FallbackFilter {
    geoip: bool,
    geoip_code: &'static str,
    ipcidr: Vec<&'static str>,
}

impl Default for ClashDns {
    fn default() -> Self {
        use clash_defaults::dns;

        Self {
            enable: true,
            enhanced_mode: dns::ENHANCED_MODE,
            fake_ip_range: dns::FAKE_IP_RANGE,
            fake_ip_filter: dns::FAKE_IP_FILTER.to_vec(),
            default_nameserver: dns::DEFAULT_NAMESERVER.to_vec(),
            nameserver: dns::NAMESERVER.to_vec(),
            fallback: dns::FALLBACK.to_vec(),
            fallback_filter: FallbackFilter {
                geoip: true,
                geoip_code: dns::FALLBACK_GEOIP_CODE,
                ipcidr: dns::FALLBACK_IPCIDR.to_vec(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClashTun {
    enable: bool,
    stack: &'static str,
    dns_hijack: Vec<&'static str>,
    auto_route: bool,
    auto_detect_interface: bool,
}

#[derive(Debug, Serialize)]
struct ClashProxyGroup {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    proxies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tolerance: Option<u32>,
}

impl From<&SelectorGroup> for ClashProxyGroup {
    fn from(group: &SelectorGroup) -> Self {
        let mut rendered = Self {
            name: group.name.clone(),
            kind: "select",
            proxies: group.outbounds.clone(),
            url: None,
            interval: None,
            tolerance: None,
        };

        if let GroupKind::UrlTest {
            url,
            interval,
            tolerance,
        } = &group.kind
        {
            rendered.kind = "url-test";
            rendered.url = Some(url.clone());
            rendered.interval = Some(*interval);
            rendered.tolerance = Some(*tolerance);
        }

        rendered
    }
}

/// 渲染单条规则为 `<DIRECTIVE>,<value>[,no-resolve],<outbound>`
pub fn render_rule(record: &RuleRecord) -> String {
    let outbound = &record.outbound;
    match &record.criterion {
        Criterion::Domain(value) => format!("DOMAIN,{},{}", value, outbound),
        Criterion::DomainSuffix(value) => format!("DOMAIN-SUFFIX,{},{}", value, outbound),
        Criterion::DomainKeyword(value) => format!("DOMAIN-KEYWORD,{},{}", value, outbound),
        Criterion::IpCidr(value) => format!("IP-CIDR,{},{},no-resolve", value, outbound),
        Criterion::RuleSet(tag) => match tag.kind {
            RuleSetKind::GeoSite => format!("GEOSITE,{},{}", tag.name, outbound),
            RuleSetKind::GeoIp => format!("GEOIP,{},{}", tag.name, outbound),
        },
        Criterion::Port(value) => format!("DST-PORT,{},{}", value, outbound),
        Criterion::Match => format!("MATCH,{}", outbound),
    }
}

/// Clash YAML 组装器
#[derive(Debug, Clone, Copy, Default)]
pub struct ClashAssembler;

impl Assembler for ClashAssembler {
    fn format(&self) -> ExportFormat {
        ExportFormat::Clash
    }

    fn assemble(&self, plan: &CompilePlan<'_>) -> Result<String, CompileError> {
        let settings = &plan.snapshot.settings;

        // 仅在允许局域网时输出密钥
        let secret = settings
            .clash_api_secret()
            .filter(|_| settings.allow_lan)
            .map(str::to_string);

        let tun = settings.tun_enabled.then(|| ClashTun {
            enable: true,
            stack: clash_defaults::tun::STACK,
            dns_hijack: clash_defaults::tun::DNS_HIJACK.to_vec(),
            auto_route: true,
            auto_detect_interface: true,
        });

        let document = ClashDocument {
            mixed_port: settings.mixed_port,
            allow_lan: settings.allow_lan,
            mode: clash_defaults::MODE,
            log_level: clash_defaults::LOG_LEVEL,
            external_controller: format!(
                "{}:{}",
                clash_defaults::CONTROLLER_HOST,
                settings.clash_api_port
            ),
            secret,
            dns: ClashDns::default(),
            tun,
            proxies: ClashEncoder.encode_all(&plan.nodes),
            proxy_groups: plan.groups.iter().map(ClashProxyGroup::from).collect(),
            rules: plan.records.iter().map(render_rule).collect(),
        };

        serde_yaml::to_string(&document).map_err(|e| serialization_error(self.format(), e))
    }
}
