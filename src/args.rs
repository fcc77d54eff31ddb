use crate::error::AppError;
use crate::output::ExportFormat;
use crate::r#const::rule_set;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

// 代理节点配置编译工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "boxsmith",
    author,
    version,
    about = "Compile proxy node inventories into sing-box and Clash configurations\n\n\
             Key Features:\n\
             - Protocol Encoding: Shadowsocks, VMess, VLESS, Trojan, Hysteria2, TUIC\n\
             - Selector Groups: Country groups, Keyword/country filters, Per-rule-group selectors\n\
             - Routing Rules: Domain, IP-CIDR, Port, GeoSite and GeoIP rule-sets\n\
             - Rule-Set Cache: Concurrent download with freshness check and atomic replacement\n\
             - Usability: Simple YAML input, Configuration validation, Command-line interface"
)]
pub struct Args {
    // 配置文件路径
    #[arg(short, long, global = true, default_value = "./config.yaml")]
    pub config: PathBuf,

    // 测试配置
    #[arg(
        short = 't',
        long = "test",
        global = true,
        action = ArgAction::SetTrue,
        help = "Test configuration file for validity and exit"
    )]
    pub test_config: bool,

    // 启用调试日志
    #[arg(
        short = 'd',
        long = "debug",
        global = true,
        action = ArgAction::SetTrue,
        help = "Enable debug level logging for detailed output"
    )]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compile the model into a target configuration document
    Compile(CompileArgs),
    /// Download missing or stale rule-sets into the local directory
    Sync(SyncArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct CompileArgs {
    // 导出格式
    #[arg(
        short,
        long,
        default_value = "singbox",
        help = "Export format: singbox (json) or clash (yaml)"
    )]
    pub format: String,

    // 输出文件，缺省写到标准输出
    #[arg(short, long, help = "Output file path, defaults to stdout")]
    pub output: Option<PathBuf>,

    // 移动端模式
    #[arg(long, action = ArgAction::SetTrue, help = "Render the mobile variant of the document")]
    pub mobile: bool,

    // 规则集目录
    #[arg(long, default_value = rule_set::DEFAULT_DIR, help = "Local rule-set directory")]
    pub rule_set_dir: PathBuf,

    // 使用本地规则集
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Synchronize rule-sets first and reference them as local files"
    )]
    pub local_rule_sets: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct SyncArgs {
    // 规则集目录
    #[arg(long, default_value = rule_set::DEFAULT_DIR, help = "Local rule-set directory")]
    pub rule_set_dir: PathBuf,

    // 强制重新下载
    #[arg(long, action = ArgAction::SetTrue, help = "Download every rule-set even if fresh")]
    pub refresh: bool,
}

impl Args {
    // 解析命令行参数
    pub fn parse_args() -> Self {
        Args::parse()
    }

    // 验证参数
    pub fn validation(&self) -> Result<(), AppError> {
        match &self.command {
            Some(Command::Compile(compile)) => {
                compile.format.parse::<ExportFormat>()?;
                Ok(())
            }
            Some(Command::Sync(_)) => Ok(()),
            None if self.test_config => Ok(()),
            None => Err(AppError::InvalidArgument(
                "A subcommand is required: compile or sync".to_string(),
            )),
        }
    }
}
