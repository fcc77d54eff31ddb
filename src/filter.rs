use crate::config::{Filter, Node};

/// 判断节点是否匹配过滤器
///
/// 依次检查国家包含、国家排除、关键字包含、关键字排除，任一不满足立即返回 `false`。
/// 未配置的条件视为满足，因此空过滤器匹配所有节点。
pub fn matches(node: &Node, filter: &Filter) -> bool {
    let country = node.country.as_deref().unwrap_or_default();

    // 检查国家包含条件
    if !filter.include_countries.is_empty()
        && !filter
            .include_countries
            .iter()
            .any(|code| code.eq_ignore_ascii_case(country))
    {
        return false;
    }

    // 检查国家排除条件
    if filter
        .exclude_countries
        .iter()
        .any(|code| code.eq_ignore_ascii_case(country))
    {
        return false;
    }

    let name = node.tag.to_lowercase();

    // 检查关键字包含条件
    if !filter.include.is_empty()
        && !filter
            .include
            .iter()
            .any(|keyword| name.contains(&keyword.to_lowercase()))
    {
        return false;
    }

    // 检查关键字排除条件
    !filter
        .exclude
        .iter()
        .any(|keyword| name.contains(&keyword.to_lowercase()))
}
