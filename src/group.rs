use crate::config::{Filter, FilterMode, Node, RuleGroup, Settings};
use crate::country;
use crate::filter;
use crate::r#const::{outbound_names, url_test_defaults};
use std::collections::HashSet;
use tracing::debug;

/// 分组类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    // 手动选择
    Select,
    // 自动测速
    UrlTest {
        url: String,
        interval: u32,
        tolerance: u32,
    },
}

impl GroupKind {
    // 使用默认参数的自动测速
    fn default_url_test() -> Self {
        Self::UrlTest {
            url: url_test_defaults::URL.to_string(),
            interval: url_test_defaults::INTERVAL,
            tolerance: url_test_defaults::TOLERANCE,
        }
    }

    fn for_filter(filter: &Filter) -> Self {
        match filter.mode {
            FilterMode::UrlTest => match &filter.url_test_config {
                Some(config) => Self::UrlTest {
                    url: config.url.clone(),
                    interval: url_test_defaults::INTERVAL,
                    tolerance: config.tolerance,
                },
                None => Self::default_url_test(),
            },
            FilterMode::Select => Self::Select,
        }
    }
}

/// 与目标格式无关的选择器分组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorGroup {
    pub name: String,
    pub kind: GroupKind,
    // 按名称引用的成员，可以前向引用
    pub outbounds: Vec<String>,
    // 默认选项（仅 sing-box 渲染）
    pub default: Option<String>,
}

impl SelectorGroup {
    fn select(name: impl Into<String>, outbounds: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::Select,
            outbounds,
            default: None,
        }
    }

    fn url_test(name: impl Into<String>, outbounds: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::default_url_test(),
            outbounds,
            default: None,
        }
    }

    pub fn is_url_test(&self) -> bool {
        matches!(self.kind, GroupKind::UrlTest { .. })
    }
}

// 是否为内置的直连 / 拦截出站
fn is_builtin_sink(outbound: &str) -> bool {
    outbound == outbound_names::DIRECT || outbound == outbound_names::REJECT
}

/// 构建分组层级
///
/// 输出顺序：Proxy、国家组、过滤器组、Auto、规则组选择器、Final。
/// `nodes` 应只包含可编码的节点。
pub fn build_groups(
    nodes: &[Node],
    filters: &[Filter],
    rule_groups: &[RuleGroup],
    settings: &Settings,
) -> Vec<SelectorGroup> {
    let mut leaves = Vec::new();

    // 国家组，按首次出现的顺序
    let mut countries: Vec<(String, Vec<String>)> = Vec::new();
    for node in nodes {
        let code = node
            .country
            .clone()
            .unwrap_or_else(|| outbound_names::OTHER.to_string());
        match countries.iter_mut().find(|(c, _)| *c == code) {
            Some((_, tags)) => tags.push(node.tag.clone()),
            None => countries.push((code, vec![node.tag.clone()])),
        }
    }

    let mut country_names = Vec::with_capacity(countries.len());
    for (code, tags) in countries {
        let name = country::group_name(&code);
        country_names.push(name.clone());
        leaves.push(SelectorGroup::url_test(name, tags));
    }

    // 过滤器组
    let mut filter_names = Vec::new();
    for filter_item in filters.iter().filter(|f| f.enabled) {
        let tags: Vec<String> = nodes
            .iter()
            .filter(|node| filter::matches(node, filter_item))
            .map(|node| node.tag.clone())
            .collect();

        if tags.is_empty() {
            debug!("Filter '{}' matched no nodes, skipping", filter_item.name);
            continue;
        }

        filter_names.push(filter_item.name.clone());
        leaves.push(SelectorGroup {
            name: filter_item.name.clone(),
            kind: GroupKind::for_filter(filter_item),
            outbounds: tags,
            default: None,
        });
    }

    // Auto 组，覆盖所有去重后的节点
    if !nodes.is_empty() {
        let mut seen = HashSet::new();
        let all_tags = nodes
            .iter()
            .filter(|node| seen.insert(node.tag.as_str()))
            .map(|node| node.tag.clone())
            .collect();
        leaves.push(SelectorGroup::url_test(outbound_names::AUTO, all_tags));
    }

    // Proxy 主选择器放在最前
    let mut proxy_options = vec![outbound_names::AUTO.to_string()];
    proxy_options.extend(country_names.iter().cloned());
    proxy_options.extend(filter_names);

    let mut groups = Vec::with_capacity(leaves.len() + rule_groups.len() + 2);
    groups.push(SelectorGroup::select(outbound_names::PROXY, proxy_options));
    groups.extend(leaves);

    // 规则组选择器
    for rule_group in rule_groups.iter().filter(|g| g.enabled) {
        let options: Vec<String> = if is_builtin_sink(&rule_group.outbound) {
            vec![
                outbound_names::DIRECT.to_string(),
                outbound_names::REJECT.to_string(),
                outbound_names::PROXY.to_string(),
            ]
        } else {
            [outbound_names::PROXY, outbound_names::AUTO, outbound_names::DIRECT]
                .iter()
                .map(|s| s.to_string())
                .chain(country_names.iter().cloned())
                .collect()
        };

        let default = options
            .iter()
            .find(|option| **option == rule_group.outbound)
            .cloned();

        groups.push(SelectorGroup {
            default,
            ..SelectorGroup::select(rule_group.name.clone(), options)
        });
    }

    // Final 兜底
    let final_options = vec![
        outbound_names::PROXY.to_string(),
        outbound_names::DIRECT.to_string(),
    ];
    let default = final_options
        .iter()
        .find(|option| **option == settings.final_outbound)
        .cloned();
    groups.push(SelectorGroup {
        default,
        ..SelectorGroup::select(outbound_names::FINAL, final_options)
    });

    debug!("Built {} selector groups", groups.len());
    groups
}
