//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Site Vitals - 轻量级站点可用性监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "site-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "SITE_VITALS_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的 `global.log_level`
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "SITE_VITALS_LOG_LEVEL",
        global = true
    )]
    pub log_level: Option<LogLevel>,

    /// 是否输出JSON格式日志
    #[arg(long, help = "输出JSON格式日志", global = true)]
    pub json_logs: bool,

    /// 日志文件路径，指定后日志写入文件而不是控制台
    #[arg(
        long,
        value_name = "FILE",
        help = "日志文件路径",
        env = "SITE_VITALS_LOG_FILE",
        global = true
    )]
    pub log_file: Option<PathBuf>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动站点监控
    Start {
        /// 覆盖所有站点的探测间隔（毫秒）
        #[arg(
            short,
            long,
            value_name = "MILLIS",
            help = "覆盖所有站点的探测间隔（毫秒）",
            env = "SITE_VITALS_INTERVAL"
        )]
        interval: Option<u64>,
    },

    /// 对站点执行一次性探测
    Check {
        /// 站点名称（可选，不指定则探测所有站点）
        #[arg(value_name = "SITE", help = "站点名称")]
        site: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径", default_value = "config.toml")]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 向所有通知渠道发送测试消息
    TestNotification {
        /// 测试消息内容
        #[arg(short, long, default_value = "这是一条测试消息", help = "测试消息内容")]
        message: String,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_with_interval() {
        let args = Args::try_parse_from([
            "site-vitals",
            "--config",
            "/etc/site-vitals.toml",
            "start",
            "--interval",
            "1000",
        ])
        .unwrap();

        assert_eq!(args.get_config_path(), PathBuf::from("/etc/site-vitals.toml"));
        assert!(matches!(
            args.command,
            Commands::Start {
                interval: Some(1000)
            }
        ));
    }

    #[test]
    fn test_parse_check_defaults() {
        let args = Args::try_parse_from(["site-vitals", "check", "example.com"]).unwrap();

        match args.command {
            Commands::Check { site, format } => {
                assert_eq!(site.as_deref(), Some("example.com"));
                assert_eq!(format, OutputFormat::Text);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(log::LevelFilter::from(LogLevel::Trace), log::LevelFilter::Trace);
    }

    #[test]
    fn test_parse_global_logging_flags() {
        let args = Args::try_parse_from([
            "site-vitals",
            "validate",
            "--log-level",
            "trace",
            "--log-file",
            "/tmp/site-vitals.log",
        ])
        .unwrap();

        assert_eq!(args.log_level, Some(LogLevel::Trace));
        assert_eq!(args.log_file, Some(PathBuf::from("/tmp/site-vitals.log")));
    }
}
