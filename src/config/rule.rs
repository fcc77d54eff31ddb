use serde::{Deserialize, Serialize};
use validator::Validate;

use super::validate_url;

// 过滤器分组模式
//
// 只识别自动测速的两种写法，其余任何模式都按手动选择处理。
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum FilterMode {
    // 手动选择
    #[default]
    Select,
    // 自动测速
    UrlTest,
}

impl From<String> for FilterMode {
    fn from(mode: String) -> Self {
        match mode.trim().to_ascii_lowercase().as_str() {
            "url-test" | "urltest" => Self::UrlTest,
            _ => Self::Select,
        }
    }
}

// 自动测速参数
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct UrlTestConfig {
    // 探测地址
    #[validate(custom(function = "validate_url", message = "URL test address is invalid"))]
    pub url: String,
    // 容差（毫秒）
    pub tolerance: u32,
}

// 节点过滤器
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct Filter {
    // 过滤器名称（即分组名称）
    #[validate(length(min = 1, message = "Filter name must not be empty"))]
    pub name: String,
    // 是否启用
    #[serde(default)]
    pub enabled: bool,
    // 分组模式
    #[serde(default)]
    pub mode: FilterMode,
    // 包含关键字
    #[serde(default)]
    pub include: Vec<String>,
    // 排除关键字
    #[serde(default)]
    pub exclude: Vec<String>,
    // 包含国家
    #[serde(default)]
    pub include_countries: Vec<String>,
    // 排除国家
    #[serde(default)]
    pub exclude_countries: Vec<String>,
    // 自动测速参数（可选）
    #[serde(default)]
    #[validate(nested)]
    pub url_test_config: Option<UrlTestConfig>,
}

// 规则匹配类型
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    // 完整域名
    Domain,
    // 域名后缀
    DomainSuffix,
    // 域名关键字
    DomainKeyword,
    // IP 段
    IpCidr,
    // geosite 数据库
    Geosite,
    // geoip 数据库
    Geoip,
    // 目标端口
    Port,
}

// 自定义路由规则
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct Rule {
    // 匹配类型
    pub rule_type: RuleType,
    // 匹配值
    #[serde(default)]
    pub values: Vec<String>,
    // 目标出站
    #[validate(length(min = 1, message = "Rule outbound must not be empty"))]
    pub outbound: String,
    // 是否启用
    #[serde(default)]
    pub enabled: bool,
}

// 规则组
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
pub struct RuleGroup {
    // 规则组名称（即选择器名称）
    #[validate(length(min = 1, message = "Rule group name must not be empty"))]
    pub name: String,
    // 是否启用
    #[serde(default)]
    pub enabled: bool,
    // 目标出站（可为 DIRECT / REJECT）
    pub outbound: String,
    // geosite 标签
    #[serde(default)]
    pub site_rules: Vec<String>,
    // geoip 标签
    #[serde(default)]
    pub ip_rules: Vec<String>,
}
