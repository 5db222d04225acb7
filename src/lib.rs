//! Site Vitals - 轻量级站点可用性监控工具
//!
//! 周期性地对一组网络端点执行TCP探测，跟踪每个站点的健康状态，
//! 连续失败超过阈值后通过可插拔的通知渠道发出告警：
//! - TCP可达性与往返时间探测
//! - 可恢复/致命网络错误分类
//! - 边沿触发的告警，避免告警风暴
//! - webhook/飞书通知集成
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod signal_handler;

// 重新导出主要类型
pub use config::{Config, GlobalConfig, SiteConfig};
pub use error::SiteVitalsError;
pub use health::{Controller, MonitorScheduler, PollResult, ResultQueue, TcpProber};
pub use notification::{AlertDispatcher, AlertEvent, AlertSink};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
