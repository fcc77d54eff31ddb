use crate::r#const::{outbound_names, settings_defaults};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::validate_url;

// 自定义验证函数 - 验证 GitHub 代理前缀
fn validate_github_proxy(settings: &Settings) -> Result<(), ValidationError> {
    match settings.github_proxy.as_deref() {
        Some(proxy) if !proxy.is_empty() => validate_url(proxy),
        _ => Ok(()),
    }
}

fn default_mixed_port() -> u16 {
    settings_defaults::MIXED_PORT
}

fn default_clash_api_port() -> u16 {
    settings_defaults::CLASH_API_PORT
}

fn default_ruleset_base_url() -> String {
    settings_defaults::RULESET_BASE_URL.to_string()
}

fn default_proxy_dns() -> String {
    settings_defaults::PROXY_DNS.to_string()
}

fn default_direct_dns() -> String {
    settings_defaults::DIRECT_DNS.to_string()
}

fn default_final_outbound() -> String {
    outbound_names::PROXY.to_string()
}

/// 全局编译设置
///
/// 每次编译时作为不可变值显式传入，编译路径中不存在进程级的可变设置。
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Validate)]
#[validate(schema(
    function = "validate_github_proxy",
    message = "GitHub proxy must be a valid URL"
))]
pub struct Settings {
    // 混合代理端口
    #[serde(default = "default_mixed_port")]
    #[validate(range(min = 1, message = "Mixed port must be greater than 0"))]
    pub mixed_port: u16,
    // 是否允许局域网连接
    #[serde(default)]
    pub allow_lan: bool,
    // Clash API 端口
    #[serde(default = "default_clash_api_port")]
    #[validate(range(min = 1, message = "Clash API port must be greater than 0"))]
    pub clash_api_port: u16,
    // Clash API 密钥
    #[serde(default)]
    pub clash_api_secret: String,
    // 是否启用 TUN
    #[serde(default)]
    pub tun_enabled: bool,
    // 规则集基础地址
    #[serde(default = "default_ruleset_base_url")]
    #[validate(custom(function = "validate_url", message = "Rule-set base URL is invalid"))]
    pub ruleset_base_url: String,
    // GitHub 代理前缀（可选）
    #[serde(default)]
    pub github_proxy: Option<String>,
    // 移动端模式
    #[serde(default)]
    pub mobile_mode: bool,
    // 代理 DNS
    #[serde(default = "default_proxy_dns")]
    pub proxy_dns: String,
    // 直连 DNS
    #[serde(default = "default_direct_dns")]
    pub direct_dns: String,
    // Final 选择器的默认出站
    #[serde(default = "default_final_outbound")]
    pub final_outbound: String,
}

impl Settings {
    // 非空的 GitHub 代理前缀
    pub fn github_proxy(&self) -> Option<&str> {
        self.github_proxy.as_deref().filter(|proxy| !proxy.is_empty())
    }

    // 非空的 Clash API 密钥
    pub fn clash_api_secret(&self) -> Option<&str> {
        Some(self.clash_api_secret.as_str()).filter(|secret| !secret.is_empty())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mixed_port: default_mixed_port(),
            allow_lan: false,
            clash_api_port: default_clash_api_port(),
            clash_api_secret: String::new(),
            tun_enabled: false,
            ruleset_base_url: default_ruleset_base_url(),
            github_proxy: None,
            mobile_mode: false,
            proxy_dns: default_proxy_dns(),
            direct_dns: default_direct_dns(),
            final_outbound: default_final_outbound(),
        }
    }
}
