use crate::country;
use crate::error::ConfigError;
use crate::r#const::outbound_names;
use serde::Deserialize;
use std::{borrow::Cow, collections::HashSet, fs, path::Path};
use tracing::debug;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors};

pub mod core;
pub mod node;
pub mod rule;
pub mod settings;

pub use core::*;
pub use node::*;
pub use rule::*;
pub use settings::*;

// 配置结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;

// 自定义验证函数 - 验证URL格式
pub fn validate_url(url_str: &str) -> Result<(), ValidationError> {
    match Url::parse(url_str) {
        Ok(_) => Ok(()),
        Err(_) => Err(ValidationError::new("invalid_url")),
    }
}

// 自定义验证函数 - 验证出站名称唯一性
//
// 节点标签、启用的过滤器与规则组共用同一个出站命名空间，
// 且不能占用内置分组、内置出站或国家组的名称。
pub fn validate_unique_outbound_names(snapshot: &ModelSnapshot) -> Result<(), ValidationError> {
    let reserved: HashSet<String> = [
        outbound_names::PROXY,
        outbound_names::AUTO,
        outbound_names::FINAL,
        outbound_names::DIRECT,
        outbound_names::REJECT,
    ]
    .iter()
    .map(|name| name.to_string())
    .chain(snapshot.nodes.iter().map(|node| {
        country::group_name(node.country.as_deref().unwrap_or(outbound_names::OTHER))
    }))
    .collect();

    let names = snapshot
        .nodes
        .iter()
        .map(|node| node.tag.as_str())
        .chain(
            snapshot
                .filters
                .iter()
                .filter(|filter| filter.enabled)
                .map(|filter| filter.name.as_str()),
        )
        .chain(
            snapshot
                .rule_groups
                .iter()
                .filter(|group| group.enabled)
                .map(|group| group.name.as_str()),
        );

    let mut seen = HashSet::new();
    for name in names {
        if reserved.contains(name) {
            return Err(ValidationError::new("reserved_outbound_name").with_message(
                Cow::Owned(format!(
                    "Outbound name '{}' is reserved for a built-in group or outbound",
                    name
                )),
            ));
        }
        if !seen.insert(name) {
            return Err(ValidationError::new("duplicate_outbound_name").with_message(
                Cow::Owned(format!("Outbound name '{}' is not unique", name)),
            ));
        }
    }
    Ok(())
}

/// 一次编译所需的领域模型快照
///
/// 由外部存储提供，编译期间只读。
#[derive(Debug, Deserialize, Clone, PartialEq, Default, Validate)]
#[validate(schema(function = "validate_unique_outbound_names"))]
pub struct ModelSnapshot {
    // 全局设置
    #[serde(default)]
    #[validate(nested)]
    pub settings: Settings,
    // 节点列表
    #[serde(default)]
    #[validate(nested)]
    pub nodes: Vec<Node>,
    // 过滤器列表
    #[serde(default)]
    #[validate(nested)]
    pub filters: Vec<Filter>,
    // 自定义规则列表
    #[serde(default)]
    #[validate(nested)]
    pub rules: Vec<Rule>,
    // 规则组列表
    #[serde(default)]
    #[validate(nested)]
    pub rule_groups: Vec<RuleGroup>,
}

// 输入文件：模型快照 + 规则集下载配置
#[derive(Debug, Deserialize, Clone, PartialEq, Default, Validate)]
pub struct Config {
    // 模型快照
    #[serde(flatten)]
    #[validate(nested)]
    pub model: ModelSnapshot,
    // 规则集下载配置（可选）
    #[serde(default)]
    #[validate(nested)]
    pub download: DownloadConfig,
}

impl Config {
    // 从文件加载配置（YAML，JSON 作为其子集同样可用）
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        debug!("Loading configuration file: {:?}", path.as_ref());
        let content = fs::read_to_string(path).map_err(ConfigError::LoadError)?;
        Self::from_yaml(&content)
    }

    // 从字符串加载配置
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    // 验证配置有效性
    pub fn validate(&self) -> ConfigResult<()> {
        // 使用 validator 库进行验证
        if let Err(errors) = Validate::validate(self) {
            return Err(ConfigError::ValidationError(format_validation_errors(
                &errors,
            )));
        }
        Ok(())
    }
}

// 将 ValidationErrors 转换为友好的错误信息
fn format_validation_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();

    // 格式化字段错误
    for (field, error_kind) in errors.errors() {
        match error_kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    messages.push(format!("Field '{}': {}", field, message));
                }
            }
            validator::ValidationErrorsKind::Struct(struct_errors) => {
                messages.push(format!(
                    "Struct '{}' validation failed: {}",
                    field,
                    format_validation_errors(struct_errors)
                ));
            }
            validator::ValidationErrorsKind::List(list_errors) => {
                for (index, err) in list_errors {
                    messages.push(format!(
                        "List '{}' at index {}: {}",
                        field,
                        index,
                        format_validation_errors(err)
                    ));
                }
            }
        }
    }

    if messages.is_empty() {
        "Unknown validation error".to_string()
    } else {
        messages.join("\n")
    }
}
