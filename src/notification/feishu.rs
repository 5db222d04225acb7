//! 飞书通知发送器模块
//!
//! 实现飞书webhook通知功能

use crate::error::NotificationError;
use crate::notification::sender::{AlertEvent, AlertKind, AlertSink};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

/// 飞书通知发送器
pub struct FeishuSender {
    /// HTTP客户端
    client: Client,
    /// webhook URL
    webhook_url: String,
}

impl FeishuSender {
    /// 创建新的飞书发送器
    ///
    /// # 参数
    /// * `webhook_url` - 飞书机器人webhook URL
    pub fn new(webhook_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    /// 构建飞书卡片消息体
    fn build_message_body(&self, event: &AlertEvent) -> Value {
        let color = match event.kind {
            AlertKind::Alert => "red",
            AlertKind::Recovery => "green",
            AlertKind::Test => "blue",
        };

        json!({
            "msg_type": "interactive",
            "card": {
                "elements": [
                    {
                        "tag": "div",
                        "text": {
                            "content": event.message,
                            "tag": "lark_md"
                        }
                    }
                ],
                "header": {
                    "title": {
                        "content": event.title(),
                        "tag": "plain_text"
                    },
                    "template": color
                }
            }
        })
    }
}

#[async_trait]
impl AlertSink for FeishuSender {
    fn name(&self) -> &str {
        "feishu"
    }

    async fn notify(&self, event: &AlertEvent) -> Result<()> {
        debug!("发送消息到飞书webhook: {}", self.webhook_url);

        let body = self.build_message_body(event);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .context("发送飞书消息失败")?;

        let status = response.status();
        if status.is_success() {
            info!("飞书消息发送成功");
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            error!("飞书消息发送失败: {} - {}", status, text);
            Err(NotificationError::HttpStatus {
                status: status.as_u16(),
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_color_follows_kind() {
        let sender = FeishuSender::new("https://open.feishu.cn/hook/x").unwrap();

        let alert = AlertEvent::new(AlertKind::Alert, "example.com", "down");
        let body = sender.build_message_body(&alert);
        assert_eq!(body["card"]["header"]["template"], "red");
        assert_eq!(body["card"]["elements"][0]["text"]["content"], "down");

        let recovery = AlertEvent::new(AlertKind::Recovery, "example.com", "up");
        let body = sender.build_message_body(&recovery);
        assert_eq!(body["card"]["header"]["template"], "green");
    }
}
