//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{Config, ConfigLoader, NotifierConfig, SiteConfig, TomlConfigLoader};
use crate::error::{ConfigError, Result};
use crate::health::{classify, MonitorScheduler, Prober, TcpProber};
use crate::notification::{AlertDispatcher, AlertEvent, AlertKind};
use crate::signal_handler::{setup_signal_handlers, wait_for_shutdown};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// `init` 命令写出的示例配置
const SAMPLE_CONFIG: &str = include_str!("../../templates/config.toml");

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 加载命令行指定的配置文件
async fn load_config(args: &Args) -> Result<Config> {
    let loader = TomlConfigLoader::new(true);
    loader.load_from_file(args.get_config_path()).await
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, SAMPLE_CONFIG).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加需要监控的站点");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证配置文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        if verbose {
            println!("配置验证通过！");
            println!("全局配置:");
            println!(
                "  默认探测间隔: {}毫秒",
                config.global.default_polling_interval_ms
            );
            println!("  日志级别: {}", config.global.log_level);
            println!(
                "  恢复通知: {}",
                if config.global.notify_recovery { "是" } else { "否" }
            );

            println!("站点配置:");
            for (i, site) in config.sites.iter().enumerate() {
                println!("  {}. {}", i + 1, site.address());
                println!("     失败阈值: {}", site.threshold);
                println!("     探测间隔: {:?}", site.polling_interval());
                println!("     启用状态: {}", if site.enabled { "是" } else { "否" });
                if let Some(description) = &site.description {
                    println!("     描述: {description}");
                }
            }

            println!("通知渠道:");
            for notifier in &config.notifiers {
                let kind = match notifier {
                    NotifierConfig::Webhook { .. } => "webhook",
                    NotifierConfig::Feishu { .. } => "feishu",
                };
                println!("  - {kind}: {}", notifier.url());
            }
        } else {
            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个站点配置", config.sites.len());
            println!("✓ 找到 {} 个通知渠道", config.notifiers.len());
        }

        Ok(())
    }
}

/// 单个站点的一次性探测结果
#[derive(Debug, Serialize)]
struct CheckReport {
    site: String,
    port: u16,
    /// ok / recoverable / fatal
    status: &'static str,
    round_trip_ms: Option<u64>,
    error_code: Option<&'static str>,
    message: Option<String>,
}

/// 检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Check { site, format } = &args.command {
            self.perform_check(args, site.as_deref(), format).await
        } else {
            Ok(())
        }
    }
}

impl CheckCommand {
    /// 对选中的站点各探测一次
    async fn perform_check(
        &self,
        args: &Args,
        site_name: Option<&str>,
        format: &OutputFormat,
    ) -> Result<()> {
        let config = load_config(args).await?;

        let sites: Vec<&SiteConfig> = match site_name {
            Some(name) => config.sites.iter().filter(|s| s.name == name).collect(),
            None => config.enabled_sites().collect(),
        };

        if sites.is_empty() {
            match site_name {
                Some(name) => eprintln!("未找到名为 '{name}' 的站点"),
                None => eprintln!("未找到任何启用的站点"),
            }
            return Ok(());
        }

        let prober = TcpProber::new();
        let mut reports = Vec::with_capacity(sites.len());
        for site in sites {
            reports.push(Self::probe_once(&prober, site).await);
        }

        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
            OutputFormat::Text => Self::print_text(&reports),
        }

        Ok(())
    }

    async fn probe_once(prober: &dyn Prober, site: &SiteConfig) -> CheckReport {
        let mut report = CheckReport {
            site: site.name.clone(),
            port: site.port,
            status: "ok",
            round_trip_ms: None,
            error_code: None,
            message: None,
        };

        match prober.probe(site).await {
            Ok(round_trip) => report.round_trip_ms = Some(round_trip.as_millis() as u64),
            Err(e) => {
                match classify(&e) {
                    Some(kind) => {
                        report.status = "recoverable";
                        report.error_code = Some(kind.code());
                    }
                    None => report.status = "fatal",
                }
                report.message = Some(e.to_string());
            }
        }

        report
    }

    fn print_text(reports: &[CheckReport]) {
        println!("{:<32} {:<6} {:<12} {:<10} 详情", "站点", "端口", "状态", "耗时");
        println!("{}", "-".repeat(80));

        for report in reports {
            let status = match report.status {
                "ok" => "✅ 可达",
                "recoverable" => "⚠️ 不可达",
                _ => "❌ 致命",
            };
            let round_trip = report
                .round_trip_ms
                .map(|ms| format!("{ms}ms"))
                .unwrap_or_else(|| "-".to_string());
            let detail = match (report.error_code, &report.message) {
                (Some(code), Some(message)) => format!("[{code}] {message}"),
                (None, Some(message)) => message.clone(),
                _ => String::new(),
            };

            println!(
                "{:<32} {:<6} {:<12} {:<10} {}",
                report.site, report.port, status, round_trip, detail
            );
        }
    }
}

/// 测试通知命令
pub struct TestNotificationCommand;

#[async_trait]
impl Command for TestNotificationCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::TestNotification { message } = &args.command {
            self.test_notification(args, message).await
        } else {
            Ok(())
        }
    }
}

impl TestNotificationCommand {
    /// 向所有已配置的通知渠道发送测试消息
    async fn test_notification(&self, args: &Args, message: &str) -> Result<()> {
        let config = load_config(args).await?;

        if config.notifiers.is_empty() {
            println!("❌ 未配置任何通知渠道");
            println!("请在配置文件中添加 [[notifiers]] 配置");
            return Ok(());
        }

        let dispatcher = AlertDispatcher::from_config(&config.notifiers)?;
        let content = format!(
            "🧪 {} 通知测试\n测试时间: {}\n测试消息: {}",
            crate::APP_NAME,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        let event = AlertEvent::new(AlertKind::Test, crate::APP_NAME, content);

        println!("📤 向 {} 个通知渠道发送测试消息...", dispatcher.len());
        let report = dispatcher.broadcast(&event).await;

        println!("✅ 发送成功: {}", report.delivered);
        if !report.all_delivered() {
            println!("❌ 发送失败: {}", report.failed.join(", "));
            return Err(crate::error::NotificationError::SendError(format!(
                "{} 个通知渠道发送失败",
                report.failed.len()
            ))
            .into());
        }

        Ok(())
    }
}

/// 启动命令
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Start { interval } = &args.command {
            self.run_monitor(args, *interval).await
        } else {
            Ok(())
        }
    }
}

impl StartCommand {
    /// 在前台运行监控，直到收到关闭信号
    async fn run_monitor(&self, args: &Args, interval: Option<u64>) -> Result<()> {
        let mut config = load_config(args).await?;

        if let Some(interval_ms) = interval {
            config
                .override_polling_interval(interval_ms)
                .map_err(ConfigError::ValidationError)?;
            info!("命令行覆盖探测间隔: {}毫秒", interval_ms);
        }

        if config.enabled_sites().next().is_none() {
            warn!("没有启用的站点，监控不会产生任何探测");
        }

        let dispatcher = AlertDispatcher::from_config(&config.notifiers)?;
        let prober: Arc<dyn Prober> = Arc::new(TcpProber::new());
        let scheduler = MonitorScheduler::start(&config, prober, dispatcher);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        setup_signal_handlers(shutdown_tx).await?;

        info!("{} 运行中，按 Ctrl+C 停止", crate::APP_NAME);
        wait_for_shutdown(shutdown_rx).await;

        let report = scheduler.stop().await?;

        println!("站点最终状态:");
        for (site, state) in report.controller.sites() {
            println!(
                "  {:<32} {:<6} 连续失败 {:<4} 成功率 {:.1}%",
                site.address(),
                state.health().to_string(),
                state.consecutive_failures,
                state.stats.success_rate()
            );
        }
        if !report.failed_sites.is_empty() {
            warn!("因致命错误停止探测的站点: {}", report.failed_sites.join(", "));
        }

        let stats = report.controller.notification_stats();
        info!(
            "共处理 {} 条探测结果，通知成功 {} 次，失败 {} 次",
            report.controller.processed(),
            stats.successful_sent,
            stats.failed_sent
        );

        Ok(())
    }
}
