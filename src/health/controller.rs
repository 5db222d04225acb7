//! 结果消费者与站点状态机
//!
//! 控制器是结果队列唯一的消费者，也是站点运行时状态唯一的写入者。
//! 每个站点的状态迁移：正常 → 降级（失败次数未超过阈值）→ 告警（超过阈值，只通知一次）
//! → 下一次成功后回到正常。

use crate::config::{Config, SiteConfig};
use crate::health::queue::ResultQueue;
use crate::health::result::{PollOutcome, PollResult, SiteHealth, SiteRuntimeState};
use crate::notification::template::{
    default_alert_template, default_recovery_template, MessageTemplate, SimpleTemplate,
    TemplateContext,
};
use crate::notification::{AlertDispatcher, AlertEvent, AlertKind, DispatchReport, NotificationStats};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// 站点配置及其运行时状态
#[derive(Debug)]
struct SiteEntry {
    config: Arc<SiteConfig>,
    state: SiteRuntimeState,
}

/// 控制器
pub struct Controller {
    /// 按站点名称索引的状态表
    sites: HashMap<String, SiteEntry>,
    /// 结果队列
    queue: Arc<ResultQueue<PollResult>>,
    /// 告警分发器
    dispatcher: AlertDispatcher,
    /// 告警消息模板
    alert_template: SimpleTemplate,
    /// 恢复消息模板，为 `None` 时恢复不发送通知
    recovery_template: Option<SimpleTemplate>,
    /// 通知统计
    stats: NotificationStats,
    /// 已处理的结果数
    processed: u64,
}

impl Controller {
    /// 创建控制器，为每个站点初始化运行时状态
    pub fn new(
        sites: impl IntoIterator<Item = Arc<SiteConfig>>,
        queue: Arc<ResultQueue<PollResult>>,
        dispatcher: AlertDispatcher,
    ) -> Self {
        let sites = sites
            .into_iter()
            .map(|config| {
                (
                    config.name.clone(),
                    SiteEntry {
                        config,
                        state: SiteRuntimeState::default(),
                    },
                )
            })
            .collect();

        Self {
            sites,
            queue,
            dispatcher,
            alert_template: SimpleTemplate::new(default_alert_template()),
            recovery_template: None,
            stats: NotificationStats::default(),
            processed: 0,
        }
    }

    /// 按全局配置设置消息模板和恢复通知
    pub fn with_global_config(mut self, config: &Config) -> Self {
        if let Some(template) = &config.global.alert_template {
            self.alert_template = SimpleTemplate::new(template.clone());
        }
        if config.global.notify_recovery {
            let template = config
                .global
                .recovery_template
                .clone()
                .unwrap_or_else(default_recovery_template);
            self.recovery_template = Some(SimpleTemplate::new(template));
        }
        self
    }

    /// 设置告警消息模板
    pub fn with_alert_template(mut self, template: SimpleTemplate) -> Self {
        self.alert_template = template;
        self
    }

    /// 启用恢复通知
    pub fn with_recovery_template(mut self, template: SimpleTemplate) -> Self {
        self.recovery_template = Some(template);
        self
    }

    /// 根据一条探测结果更新站点状态
    ///
    /// 返回需要发送的事件。告警是边沿触发的：持续失败期间只在首次超过阈值时产生一次。
    pub fn apply(&mut self, result: &PollResult) -> Option<AlertEvent> {
        let Some(entry) = self.sites.get_mut(&result.site_name) else {
            warn!("收到未知站点的探测结果: {}", result.site_name);
            return None;
        };

        self.processed += 1;
        let config = &entry.config;
        let state = &mut entry.state;
        state.stats.update(result);

        match result.outcome {
            PollOutcome::Ok { round_trip } => {
                let was_alerting = state.is_alerting;
                state.consecutive_failures = 0;
                state.is_alerting = false;
                state.last_round_trip = Some(round_trip);

                if !was_alerting {
                    return None;
                }

                info!("站点 {} 已恢复，往返时间 {:?}", config.name, round_trip);
                self.recovery_template
                    .as_ref()
                    .map(|template| render_event(template, AlertKind::Recovery, config, state))
            }
            PollOutcome::Error { error } => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.last_error = Some(error);

                if state.consecutive_failures > config.threshold && !state.is_alerting {
                    state.is_alerting = true;
                    warn!(
                        "站点 {} 连续失败 {} 次，超过阈值 {}，发送告警",
                        config.name, state.consecutive_failures, config.threshold
                    );
                    Some(render_event(
                        &self.alert_template,
                        AlertKind::Alert,
                        config,
                        state,
                    ))
                } else {
                    debug!(
                        "站点 {} 连续失败 {} 次（阈值 {}）",
                        config.name, state.consecutive_failures, config.threshold
                    );
                    None
                }
            }
        }
    }

    /// 处理一条结果，必要时广播通知
    ///
    /// 通知失败只计入统计，不影响状态机。
    pub async fn handle(&mut self, result: PollResult) -> Option<DispatchReport> {
        let event = self.apply(&result)?;
        let report = self.dispatcher.broadcast(&event).await;
        self.stats.record(&report);
        Some(report)
    }

    /// 阻塞式主循环，在专用线程上运行
    ///
    /// 队列关闭并取空后返回控制器本身，便于调用方读取最终状态。
    pub fn run(mut self, runtime: Handle) -> Self {
        info!("控制器启动，站点数量: {}", self.sites.len());

        while let Ok(result) = self.queue.dequeue() {
            runtime.block_on(self.handle(result));
        }

        info!("结果队列已关闭，控制器退出，共处理 {} 条结果", self.processed);
        self
    }

    /// 站点运行时状态
    pub fn state(&self, site_name: &str) -> Option<&SiteRuntimeState> {
        self.sites.get(site_name).map(|entry| &entry.state)
    }

    /// 站点健康阶段
    pub fn health(&self, site_name: &str) -> Option<SiteHealth> {
        self.state(site_name).map(SiteRuntimeState::health)
    }

    /// 所有站点的配置和状态，按名称排序
    pub fn sites(&self) -> Vec<(&SiteConfig, &SiteRuntimeState)> {
        let mut sites: Vec<_> = self
            .sites
            .values()
            .map(|entry| (entry.config.as_ref(), &entry.state))
            .collect();
        sites.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        sites
    }

    /// 已处理的结果数
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// 通知统计
    pub fn notification_stats(&self) -> &NotificationStats {
        &self.stats
    }
}

/// 根据站点状态渲染事件
fn render_event(
    template: &SimpleTemplate,
    kind: AlertKind,
    config: &SiteConfig,
    state: &SiteRuntimeState,
) -> AlertEvent {
    let mut context = TemplateContext {
        site_name: config.name.clone(),
        port: config.port,
        consecutive_failures: state.consecutive_failures,
        threshold: config.threshold,
        error_code: state.last_error.map(|e| e.code().to_string()),
        error_message: state.last_error.map(|e| e.description().to_string()),
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ..Default::default()
    };
    if let Some(description) = &config.description {
        context
            .custom_fields
            .insert("description".to_string(), description.clone());
    }

    AlertEvent::new(kind, config.name.clone(), template.render(&context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::classifier::RecoverableNetworkError;
    use std::time::Duration;

    fn controller_with_threshold(threshold: u32) -> Controller {
        let site = Arc::new(SiteConfig::new("example.com").with_threshold(threshold));
        Controller::new(
            vec![site],
            Arc::new(ResultQueue::new()),
            AlertDispatcher::default(),
        )
    }

    fn ok() -> PollResult {
        PollResult::ok("example.com", Duration::from_millis(10))
    }

    fn err() -> PollResult {
        PollResult::error("example.com", RecoverableNetworkError::ConnectionTimedOut)
    }

    #[test]
    fn test_alert_fires_once_above_threshold() {
        let mut controller = controller_with_threshold(3);

        assert!(controller.apply(&ok()).is_none());
        for _ in 0..3 {
            assert!(controller.apply(&err()).is_none());
        }
        assert_eq!(controller.health("example.com"), Some(SiteHealth::Degrading));

        let event = controller.apply(&err()).expect("第4次失败应当告警");
        assert_eq!(event.kind, AlertKind::Alert);
        assert!(event.message.contains("连接超时"));
        assert_eq!(controller.health("example.com"), Some(SiteHealth::Alerting));

        assert!(controller.apply(&err()).is_none());
    }

    #[test]
    fn test_recovery_resets_silently_by_default() {
        let mut controller = controller_with_threshold(1);
        controller.apply(&err());
        assert!(controller.apply(&err()).is_some());

        assert!(controller.apply(&ok()).is_none());

        let state = controller.state("example.com").unwrap();
        assert_eq!(state.consecutive_failures, 0);
        assert!(!state.is_alerting);
        assert_eq!(state.last_round_trip, Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_recovery_notification_when_enabled() {
        let mut controller = controller_with_threshold(1)
            .with_recovery_template(SimpleTemplate::new("{{site_name}} 已恢复"));

        // 未进入告警状态时的成功不产生恢复通知
        controller.apply(&err());
        assert!(controller.apply(&ok()).is_none());

        controller.apply(&err());
        controller.apply(&err());
        let event = controller.apply(&ok()).expect("应当产生恢复通知");
        assert_eq!(event.kind, AlertKind::Recovery);
        assert_eq!(event.message, "example.com 已恢复");
    }

    #[test]
    fn test_custom_alert_template_and_description() {
        let mut site = SiteConfig::new("db.internal").with_port(5432).with_threshold(1);
        site.description = Some("主数据库".to_string());
        let mut controller = Controller::new(
            vec![Arc::new(site)],
            Arc::new(ResultQueue::new()),
            AlertDispatcher::default(),
        )
        .with_alert_template(SimpleTemplate::new(
            "{{description}} {{site_name}}:{{port}} {{error_code}} x{{consecutive_failures}}",
        ));

        let failure = PollResult::error("db.internal", RecoverableNetworkError::ConnectionRefused);
        controller.apply(&failure);
        let event = controller.apply(&failure).unwrap();

        assert_eq!(event.message, "主数据库 db.internal:5432 connection_refused x2");
    }

    #[test]
    fn test_unknown_site_is_ignored() {
        let mut controller = controller_with_threshold(1);
        let stray = PollResult::error("other.com", RecoverableNetworkError::ConnectionRefused);

        assert!(controller.apply(&stray).is_none());
        assert!(controller.apply(&stray).is_none());
        assert_eq!(controller.processed(), 0);
        assert!(controller.state("other.com").is_none());
    }

    #[test]
    fn test_sites_sorted_by_name() {
        let controller = Controller::new(
            vec![
                Arc::new(SiteConfig::new("b.example.com")),
                Arc::new(SiteConfig::new("a.example.com")),
            ],
            Arc::new(ResultQueue::new()),
            AlertDispatcher::default(),
        );

        let names: Vec<&str> = controller
            .sites()
            .iter()
            .map(|(config, _)| config.name.as_str())
            .collect();
        assert_eq!(names, vec!["a.example.com", "b.example.com"]);
    }
}
