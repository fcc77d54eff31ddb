use crate::config::{ModelSnapshot, Node};
use crate::error::CompileError;
use crate::group::{build_groups, SelectorGroup};
use crate::protocol::is_encodable;
use crate::rule::{compile_rules, RuleRecord};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

mod clash;
mod singbox;

pub use self::clash::{render_rule as render_clash_rule, ClashAssembler};
pub use self::singbox::SingBoxAssembler;

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    // sing-box JSON
    SingBox,
    // Clash / mihomo YAML
    Clash,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::SingBox => "sing-box",
            Self::Clash => "clash",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singbox" | "sing-box" | "json" => Ok(Self::SingBox),
            "clash" | "mihomo" | "yaml" => Ok(Self::Clash),
            other => Err(CompileError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// 编译选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    // 移动端模式，与设置中的开关取或
    pub mobile_mode: bool,
    // 已同步的本地规则集目录，设置后 sing-box 规则集以 local 形式引用
    pub local_rule_set_dir: Option<PathBuf>,
}

/// 编译计划：每次编译只推导一次的分组与路由记录
#[derive(Debug, Clone)]
pub struct CompilePlan<'a> {
    pub snapshot: &'a ModelSnapshot,
    // 可编码的节点
    pub nodes: Vec<Node>,
    pub groups: Vec<SelectorGroup>,
    pub records: Vec<RuleRecord>,
    pub mobile_mode: bool,
    pub local_rule_set_dir: Option<&'a Path>,
}

impl<'a> CompilePlan<'a> {
    pub fn prepare(
        snapshot: &'a ModelSnapshot,
        options: &'a CompileOptions,
    ) -> Result<Self, CompileError> {
        let (nodes, skipped): (Vec<&Node>, Vec<&Node>) =
            snapshot.nodes.iter().partition(|node| is_encodable(node));
        let nodes: Vec<Node> = nodes.into_iter().cloned().collect();

        for node in &skipped {
            warn!(
                "Node '{}' has unsupported type '{}', omitted from output",
                node.tag, node.kind
            );
        }

        if nodes.is_empty() {
            return Err(CompileError::NoNodes);
        }

        let groups = build_groups(
            &nodes,
            &snapshot.filters,
            &snapshot.rule_groups,
            &snapshot.settings,
        );
        let records = compile_rules(&snapshot.rules, &snapshot.rule_groups);

        Ok(Self {
            snapshot,
            nodes,
            groups,
            records,
            mobile_mode: options.mobile_mode || snapshot.settings.mobile_mode,
            local_rule_set_dir: options.local_rule_set_dir.as_deref(),
        })
    }
}

/// 输出组装器特征
pub trait Assembler {
    fn format(&self) -> ExportFormat;

    /// 将编译计划渲染为完整文档
    fn assemble(&self, plan: &CompilePlan<'_>) -> Result<String, CompileError>;
}

// 序列化错误统一包装
pub(crate) fn serialization_error(format: ExportFormat, err: impl std::fmt::Display) -> CompileError {
    CompileError::Serialization {
        format: format.name(),
        message: err.to_string(),
    }
}

/// 编译入口
///
/// 任何错误都不会产生部分文档。
pub fn compile(
    format: ExportFormat,
    snapshot: &ModelSnapshot,
    options: &CompileOptions,
) -> Result<String, CompileError> {
    let plan = CompilePlan::prepare(snapshot, options)?;

    let document = match format {
        ExportFormat::SingBox => SingBoxAssembler.assemble(&plan)?,
        ExportFormat::Clash => ClashAssembler.assemble(&plan)?,
    };

    info!(
        "Compiled {} configuration: {} nodes, {} groups, {} rules",
        format.name(),
        plan.nodes.len(),
        plan.groups.len(),
        plan.records.len()
    );

    Ok(document)
}
