//! 通知模块
//!
//! 提供告警分发、webhook/飞书通知渠道和消息模板功能

pub mod dispatcher;
pub mod feishu;
pub mod sender;
pub mod template;
pub mod webhook;

// 重新导出主要类型
pub use dispatcher::{AlertDispatcher, DispatchReport, NotificationStats};
pub use feishu::FeishuSender;
pub use sender::{AlertEvent, AlertKind, AlertSink, NoOpSender};
pub use template::{MessageTemplate, SimpleTemplate, TemplateContext};
pub use webhook::WebhookSender;
