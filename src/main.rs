//! Site Vitals 主程序入口
//!
//! 轻量级站点可用性监控工具

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use site_vitals::cli::args::{Args, Commands};
use site_vitals::cli::commands::{
    CheckCommand, Command, InitCommand, StartCommand, TestNotificationCommand, ValidateCommand,
    VersionCommand,
};
use site_vitals::config::{ConfigLoader, TomlConfigLoader};
use site_vitals::logging::{parse_level, LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = LogConfig {
        level: resolve_log_level(&args).await,
        file_path: args.log_file.clone(),
        json_format: args.json_logs,
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("{} v{} 启动", site_vitals::APP_NAME, site_vitals::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 确定日志级别
///
/// 命令行参数优先；否则尝试读取配置文件中的级别，配置不可用时使用 info。
async fn resolve_log_level(args: &Args) -> LevelFilter {
    if let Some(level) = &args.log_level {
        return level.clone().into();
    }

    // init 和 version 不依赖配置文件
    if matches!(args.command, Commands::Init { .. } | Commands::Version { .. }) {
        return LevelFilter::Info;
    }

    let loader = TomlConfigLoader::new(true);
    match loader.load_from_file(args.get_config_path()).await {
        Ok(config) => parse_level(&config.global.log_level).unwrap_or(LevelFilter::Info),
        Err(_) => LevelFilter::Info,
    }
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Start { .. } => Box::new(StartCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::TestNotification { .. } => Box::new(TestNotificationCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
