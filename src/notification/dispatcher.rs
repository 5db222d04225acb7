//! 告警分发器
//!
//! 持有一组通知渠道，把同一个告警事件依次广播给所有渠道。
//! 单个渠道失败只记录日志，不影响其余渠道，也不会向调用方传播。

use crate::config::NotifierConfig;
use crate::notification::feishu::FeishuSender;
use crate::notification::sender::{AlertEvent, AlertSink};
use crate::notification::webhook::WebhookSender;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 一次广播的投递结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 投递成功的渠道数
    pub delivered: usize,
    /// 投递失败的渠道名称
    pub failed: Vec<String>,
}

impl DispatchReport {
    /// 是否全部成功
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 通知统计信息
#[derive(Debug, Clone, Default)]
pub struct NotificationStats {
    /// 总投递次数
    pub total_sent: u32,
    /// 投递成功次数
    pub successful_sent: u32,
    /// 投递失败次数
    pub failed_sent: u32,
    /// 最后通知时间
    pub last_notification_time: Option<DateTime<Utc>>,
}

impl NotificationStats {
    /// 累加一次广播的结果
    pub fn record(&mut self, report: &DispatchReport) {
        let failed = report.failed.len() as u32;
        let delivered = report.delivered as u32;
        self.total_sent += delivered + failed;
        self.successful_sent += delivered;
        self.failed_sent += failed;
        self.last_notification_time = Some(Utc::now());
    }
}

/// 告警分发器，渠道在启动时确定，运行期间不可增删
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    sinks: Vec<Arc<dyn AlertSink>>,
}

impl AlertDispatcher {
    /// 使用给定的渠道创建分发器
    pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        Self { sinks }
    }

    /// 根据配置创建分发器
    pub fn from_config(notifiers: &[NotifierConfig]) -> Result<Self> {
        let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::with_capacity(notifiers.len());
        for notifier in notifiers {
            let sink: Arc<dyn AlertSink> = match notifier {
                NotifierConfig::Webhook { url } => Arc::new(WebhookSender::new(url.clone())?),
                NotifierConfig::Feishu { url } => Arc::new(FeishuSender::new(url.clone())?),
            };
            sinks.push(sink);
        }

        if sinks.is_empty() {
            warn!("未配置任何通知渠道，告警只会写入日志");
        }

        Ok(Self::new(sinks))
    }

    /// 渠道数量
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// 是否没有任何渠道
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// 按注册顺序把事件投递给所有渠道
    pub async fn broadcast(&self, event: &AlertEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in &self.sinks {
            match sink.notify(event).await {
                Ok(()) => {
                    info!("通知已送达 [{}]: {}", sink.name(), event.site_name);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!("通知发送失败 [{}]: {} - {:#}", sink.name(), event.site_name, e);
                    report.failed.push(sink.name().to_string());
                }
            }
        }

        report
    }
}
