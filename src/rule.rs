use crate::config::{Rule, RuleGroup, RuleType, Settings};
use crate::r#const::{outbound_names, rule_set};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// 规则集数据库类型
///
/// 变体顺序保证 `RuleSetTag` 的排序与标签字符串的排序一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleSetKind {
    GeoIp,
    GeoSite,
}

impl RuleSetKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::GeoSite => rule_set::GEOSITE_PREFIX,
            Self::GeoIp => rule_set::GEOIP_PREFIX,
        }
    }
}

/// 规则集标签，类型在创建时确定
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleSetTag {
    pub kind: RuleSetKind,
    pub name: String,
}

impl RuleSetTag {
    pub fn geosite(name: impl Into<String>) -> Self {
        Self {
            kind: RuleSetKind::GeoSite,
            name: name.into(),
        }
    }

    pub fn geoip(name: impl Into<String>) -> Self {
        Self {
            kind: RuleSetKind::GeoIp,
            name: name.into(),
        }
    }

    // <tag>.srs
    pub fn file_name(&self) -> String {
        format!("{}.{}", self, rule_set::EXTENSION)
    }

    // 本地缓存路径
    pub fn local_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl fmt::Display for RuleSetTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.name)
    }
}

/// 规则集下载来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetSource {
    pub base_url: String,
    pub github_proxy: Option<String>,
}

impl RuleSetSource {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.ruleset_base_url.clone(),
            github_proxy: settings.github_proxy().map(str::to_string),
        }
    }

    /// 构建规则集下载地址
    ///
    /// geoip 规则集位于 base url 的兄弟目录；代理前缀原样拼接在最前。
    pub fn url_for(&self, tag: &RuleSetTag) -> String {
        let base = self.base_url.trim_end_matches('/');
        let url = match tag.kind {
            RuleSetKind::GeoSite => format!("{}/{}", base, tag.file_name()),
            RuleSetKind::GeoIp => format!(
                "{}/{}/{}",
                base,
                rule_set::GEOIP_RELATIVE_DIR,
                tag.file_name()
            ),
        };

        match self.github_proxy.as_deref() {
            Some(proxy) => format!("{}{}", proxy, url),
            None => url,
        }
    }
}

/// 路由匹配条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Domain(String),
    DomainSuffix(String),
    DomainKeyword(String),
    // 匹配前不做 DNS 解析
    IpCidr(String),
    RuleSet(RuleSetTag),
    Port(String),
    // 兜底规则
    Match,
}

impl Criterion {
    fn from_rule_value(rule_type: RuleType, value: &str) -> Self {
        let value = value.to_string();
        match rule_type {
            RuleType::Domain => Self::Domain(value),
            RuleType::DomainSuffix => Self::DomainSuffix(value),
            RuleType::DomainKeyword => Self::DomainKeyword(value),
            RuleType::IpCidr => Self::IpCidr(value),
            RuleType::Geosite => Self::RuleSet(RuleSetTag::geosite(value)),
            RuleType::Geoip => Self::RuleSet(RuleSetTag::geoip(value)),
            RuleType::Port => Self::Port(value),
        }
    }
}

/// 与目标语法无关的路由记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    pub criterion: Criterion,
    pub outbound: String,
}

/// 编译路由记录
///
/// 顺序：启用的规则（按声明与取值顺序），启用规则组的 geosite / geoip，
/// 最后是唯一一条指向 Final 的兜底记录。
pub fn compile_rules(rules: &[Rule], rule_groups: &[RuleGroup]) -> Vec<RuleRecord> {
    let mut records: Vec<RuleRecord> = rules
        .iter()
        .filter(|rule| rule.enabled)
        .flat_map(|rule| {
            rule.values.iter().map(move |value| RuleRecord {
                criterion: Criterion::from_rule_value(rule.rule_type, value),
                outbound: rule.outbound.clone(),
            })
        })
        .collect();

    for group in rule_groups.iter().filter(|group| group.enabled) {
        let site = group.site_rules.iter().map(RuleSetTag::geosite);
        let ip = group.ip_rules.iter().map(RuleSetTag::geoip);
        records.extend(site.chain(ip).map(|tag| RuleRecord {
            criterion: Criterion::RuleSet(tag),
            outbound: group.name.clone(),
        }));
    }

    records.push(RuleRecord {
        criterion: Criterion::Match,
        outbound: outbound_names::FINAL.to_string(),
    });

    records
}

/// 收集启用的规则与规则组引用的规则集
pub fn collect_needed_rule_sets(rules: &[Rule], rule_groups: &[RuleGroup]) -> BTreeSet<RuleSetTag> {
    compile_rules(rules, rule_groups)
        .into_iter()
        .filter_map(|record| match record.criterion {
            Criterion::RuleSet(tag) => Some(tag),
            _ => None,
        })
        .collect()
}

