//! 通知发送器模块
//!
//! 定义告警事件和通知渠道的trait

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// 告警消息
    Alert,
    /// 恢复消息
    Recovery,
    /// 测试消息
    Test,
}

/// 告警事件，原样交给每个通知渠道
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    /// 事件类型
    pub kind: AlertKind,
    /// 相关站点名称
    pub site_name: String,
    /// 渲染后的消息文本
    pub message: String,
    /// 事件产生时间
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// 创建新的告警事件
    pub fn new(kind: AlertKind, site_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            site_name: site_name.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// 适合作为卡片标题的短文本
    pub fn title(&self) -> String {
        match self.kind {
            AlertKind::Alert => format!("🚨 站点告警 - {}", self.site_name),
            AlertKind::Recovery => format!("✅ 站点恢复 - {}", self.site_name),
            AlertKind::Test => "连接测试".to_string(),
        }
    }
}

/// 通知渠道trait
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// 渠道名称，用于日志
    fn name(&self) -> &str;

    /// 发送告警事件
    ///
    /// # 参数
    /// * `event` - 告警事件
    ///
    /// # 返回
    /// * `Result<()>` - 发送结果
    async fn notify(&self, event: &AlertEvent) -> Result<()>;
}

/// 空的通知渠道实现（用于测试或禁用通知）
pub struct NoOpSender;

#[async_trait]
impl AlertSink for NoOpSender {
    fn name(&self) -> &str {
        "noop"
    }

    async fn notify(&self, _event: &AlertEvent) -> Result<()> {
        Ok(())
    }
}
