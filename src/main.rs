use anyhow::Context;
use boxsmith::args::{CompileArgs, SyncArgs};
use boxsmith::{
    collect_needed_rule_sets, compile, Args, Command, CompileOptions, Config, ExportFormat,
    RuleSetSource, RuleSetSynchronizer,
};
use mimalloc::MiMalloc;
use std::process;
use tracing::{error, info, warn};

// 使用 mimalloc 分配器提高内存效率
#[global_allocator]
static GLOBAL: MiMalloc = mimalloc::MiMalloc;

fn init_logging(args: &Args) {
    // 日志写到 stderr，标准输出留给生成的文档
    let builder = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    // 如果启用调试模式，输出调试信息，否则只输出 info 及以上级别
    if args.debug {
        builder.with_max_level(tracing::Level::DEBUG)
    } else {
        builder.with_max_level(tracing::Level::INFO)
    }
    .init();
}

// 程序入口
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse_args();

    init_logging(&args);

    if let Err(e) = args.validation() {
        error!("Invalid command line arguments: {}", e);
        process::exit(1);
    }

    let config = match Config::from_file(&args.config) {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration file: {}", e);
            process::exit(1);
        }
    };

    // 如果是测试模式，成功验证配置后退出
    if args.test_config {
        info!("Configuration file validation successful");
        return Ok(());
    }

    let result = match &args.command {
        Some(Command::Compile(compile_args)) => run_compile(&config, compile_args).await,
        Some(Command::Sync(sync_args)) => run_sync(&config, sync_args).await,
        None => Ok(()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}

// 编译配置文档
async fn run_compile(config: &Config, args: &CompileArgs) -> anyhow::Result<()> {
    let format: ExportFormat = args.format.parse()?;
    let model = &config.model;

    let mut options = CompileOptions {
        mobile_mode: args.mobile,
        local_rule_set_dir: None,
    };

    // 先同步本地规则集；失败时退回远程引用
    if args.local_rule_sets {
        let synchronizer = RuleSetSynchronizer::from_config(&args.rule_set_dir, &config.download)
            .context("Failed to create rule-set synchronizer")?;
        let tags = collect_needed_rule_sets(&model.rules, &model.rule_groups);
        let source = RuleSetSource::from_settings(&model.settings);

        match synchronizer.ensure(&tags, &source).await?.into_result() {
            Ok(_) => options.local_rule_set_dir = Some(args.rule_set_dir.clone()),
            Err(e) => warn!("{}, falling back to remote rule-sets", e),
        }
    }

    let document = compile(format, model, &options)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, document)
                .await
                .with_context(|| format!("Failed to write output file {:?}", path))?;
            info!("Configuration written to {:?}", path);
        }
        None => println!("{}", document),
    }

    Ok(())
}

// 同步规则集
async fn run_sync(config: &Config, args: &SyncArgs) -> anyhow::Result<()> {
    let model = &config.model;
    let synchronizer = RuleSetSynchronizer::from_config(&args.rule_set_dir, &config.download)
        .context("Failed to create rule-set synchronizer")?;
    let tags = collect_needed_rule_sets(&model.rules, &model.rule_groups);
    let source = RuleSetSource::from_settings(&model.settings);

    let report = if args.refresh {
        synchronizer.refresh_all(&tags, &source).await?
    } else {
        synchronizer.ensure(&tags, &source).await?
    };

    info!(
        "Rule-set synchronization finished: {} checked, {} downloaded, {} available locally",
        report.checked,
        report.downloaded.len(),
        synchronizer.available().await.len()
    );

    report.into_result()?;
    Ok(())
}
