//! 通用webhook通知发送器
//!
//! 以 `{"content": <message>}` 格式POST到配置的URL，兼容Discord等聊天webhook

use crate::error::NotificationError;
use crate::notification::sender::{AlertEvent, AlertSink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, error, info};

/// 通用webhook发送器
pub struct WebhookSender {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
}

impl WebhookSender {
    /// 创建新的webhook发送器
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSender {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        debug!("发送消息到webhook: {}", self.webhook_url);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "content": event.message }))
            .send()
            .await
            .context("发送webhook消息失败")?;

        let status = response.status();
        if status.is_success() {
            info!("webhook消息发送成功");
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            error!("webhook消息发送失败: {} - {}", status, text);
            Err(NotificationError::HttpStatus {
                status: status.as_u16(),
            }
            .into())
        }
    }
}
