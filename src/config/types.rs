//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use crate::logging::parse_level;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// 默认探测端口
pub const DEFAULT_PORT: u16 = 443;
/// 默认连续失败阈值
pub const DEFAULT_THRESHOLD: u32 = 10;
/// 默认探测间隔（毫秒）
pub const DEFAULT_POLLING_INTERVAL_MS: u64 = 5000;

/// 主配置结构，包含全局配置、站点列表和通知渠道
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 站点配置列表
    pub sites: Vec<SiteConfig>,
    /// 通知渠道列表
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 默认探测间隔（毫秒）
    #[serde(default = "default_polling_interval")]
    pub default_polling_interval_ms: u64,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 站点恢复时是否发送恢复通知
    #[serde(default)]
    pub notify_recovery: bool,
    /// 自定义告警消息模板
    pub alert_template: Option<String>,
    /// 自定义恢复消息模板
    pub recovery_template: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            default_polling_interval_ms: default_polling_interval(),
            log_level: default_log_level(),
            notify_recovery: false,
            alert_template: None,
            recovery_template: None,
        }
    }
}

/// 站点配置结构
///
/// 加载完成后不可变，由控制器持有并以 `Arc` 共享给对应的探测任务。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteConfig {
    /// 站点主机名（同时作为站点标识）
    pub name: String,
    /// 探测端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 连续失败超过该次数后告警
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// 站点特定的探测间隔（毫秒）
    pub polling_interval_ms: Option<u64>,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 站点描述
    pub description: Option<String>,
}

impl SiteConfig {
    /// 使用默认端口、阈值和间隔创建站点配置
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: default_port(),
            threshold: default_threshold(),
            polling_interval_ms: None,
            enabled: default_enabled(),
            description: None,
        }
    }

    /// 设置端口
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// 设置失败阈值
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// 设置探测间隔
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// 实际生效的探测间隔
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(
            self.polling_interval_ms
                .unwrap_or(DEFAULT_POLLING_INTERVAL_MS),
        )
    }

    /// `host:port` 形式的地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.name, self.port)
    }
}

/// 通知渠道配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierConfig {
    /// 通用webhook，发送 `{"content": ...}`
    Webhook { url: String },
    /// 飞书机器人webhook
    Feishu { url: String },
}

impl NotifierConfig {
    /// 渠道的目标URL
    pub fn url(&self) -> &str {
        match self {
            NotifierConfig::Webhook { url } | NotifierConfig::Feishu { url } => url,
        }
    }
}

impl Config {
    /// 用全局默认间隔补齐未单独配置间隔的站点
    pub fn apply_defaults(&mut self) {
        let default_interval = self.global.default_polling_interval_ms;
        for site in &mut self.sites {
            if site.polling_interval_ms.is_none() {
                site.polling_interval_ms = Some(default_interval);
            }
        }
    }

    /// 用同一个间隔覆盖全局默认值和所有站点的间隔
    pub fn override_polling_interval(&mut self, interval_ms: u64) -> Result<(), String> {
        if interval_ms == 0 {
            return Err("探测间隔必须大于0".to_string());
        }
        self.global.default_polling_interval_ms = interval_ms;
        for site in &mut self.sites {
            site.polling_interval_ms = Some(interval_ms);
        }
        Ok(())
    }

    /// 已启用的站点
    pub fn enabled_sites(&self) -> impl Iterator<Item = &SiteConfig> {
        self.sites.iter().filter(|site| site.enabled)
    }
}

// 默认值函数
fn default_polling_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL_MS
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_threshold() -> u32 {
    DEFAULT_THRESHOLD
}
fn default_enabled() -> bool {
    true
}

/// 配置验证函数
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.default_polling_interval_ms == 0 {
        return Err("默认探测间隔不能为0".to_string());
    }

    if parse_level(&config.global.log_level).is_none() {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: off/error/warn/info/debug/trace",
            config.global.log_level
        ));
    }

    // 验证站点配置
    if config.sites.is_empty() {
        return Err("至少需要配置一个站点".to_string());
    }

    // 运行时状态按站点名称索引，名称必须唯一
    let mut seen = HashSet::new();
    for site in &config.sites {
        if site.name.trim().is_empty() {
            return Err("站点名称不能为空".to_string());
        }

        if !seen.insert(site.name.as_str()) {
            return Err(format!("站点名称重复: {}", site.name));
        }

        if site.port == 0 {
            return Err(format!("站点 {} 的端口不能为0", site.name));
        }

        if site.threshold == 0 {
            return Err(format!("站点 {} 的失败阈值不能为0", site.name));
        }

        if let Some(interval) = site.polling_interval_ms {
            if interval == 0 {
                return Err(format!("站点 {} 的探测间隔不能为0", site.name));
            }
        }
    }

    // 验证通知渠道
    for notifier in &config.notifiers {
        let url = notifier.url();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("通知渠道URL格式无效: {}", url));
        }
    }

    Ok(())
}
