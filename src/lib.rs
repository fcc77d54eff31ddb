pub mod args;
pub mod config;
pub mod r#const;
pub mod country;
pub mod error;
pub mod filter;
pub mod group;
pub mod http_client;
pub mod output;
pub mod protocol;
pub mod rule;
pub mod ruleset;

// 重导出常用组件
pub use args::{Args, Command};
pub use config::{Config, ModelSnapshot};
pub use error::{AppError, CompileError, ConfigError, SyncError};
pub use group::{build_groups, GroupKind, SelectorGroup};
pub use output::{compile, CompileOptions, ExportFormat};
pub use protocol::{ClashEncoder, ProxyEncoder, SingBoxEncoder};
pub use rule::{collect_needed_rule_sets, compile_rules, RuleSetSource, RuleSetTag};
pub use ruleset::{HttpRuleSetFetcher, RuleSetFetcher, RuleSetSynchronizer, SyncReport};
