//! 消息模板模块
//!
//! 提供告警文本的模板渲染功能

use std::collections::HashMap;

/// 模板上下文数据
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// 站点名称
    pub site_name: String,
    /// 站点端口
    pub port: u16,
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 失败阈值
    pub threshold: u32,
    /// 最近错误代码
    pub error_code: Option<String>,
    /// 最近错误描述
    pub error_message: Option<String>,
    /// 时间戳
    pub timestamp: String,
    /// 自定义字段
    pub custom_fields: HashMap<String, String>,
}

/// 消息模板trait
pub trait MessageTemplate: Send + Sync {
    /// 渲染模板
    fn render(&self, context: &TemplateContext) -> String;
}

/// 简单的 `{{name}}` 占位符替换模板
#[derive(Debug, Clone)]
pub struct SimpleTemplate {
    /// 模板字符串
    template: String,
}

impl SimpleTemplate {
    /// 创建新的简单模板
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl MessageTemplate for SimpleTemplate {
    fn render(&self, context: &TemplateContext) -> String {
        let mut result = self.template.clone();

        result = result.replace("{{site_name}}", &context.site_name);
        result = result.replace("{{port}}", &context.port.to_string());
        result = result.replace(
            "{{consecutive_failures}}",
            &context.consecutive_failures.to_string(),
        );
        result = result.replace("{{threshold}}", &context.threshold.to_string());
        result = result.replace("{{timestamp}}", &context.timestamp);
        result = result.replace(
            "{{error_code}}",
            context.error_code.as_deref().unwrap_or("N/A"),
        );
        result = result.replace(
            "{{error_message}}",
            context.error_message.as_deref().unwrap_or(""),
        );

        for (key, value) in &context.custom_fields {
            let placeholder = format!("{{{{{}}}}}", key);
            result = result.replace(&placeholder, value);
        }

        result
    }
}

/// 默认的告警消息模板
pub fn default_alert_template() -> String {
    r#"🚨 **站点告警**
- **站点**: {{site_name}}:{{port}}
- **连续失败**: {{consecutive_failures}} 次（阈值 {{threshold}}）
- **最近错误**: {{error_message}}
- **检测时间**: {{timestamp}}"#
        .to_string()
}

/// 默认的恢复消息模板
pub fn default_recovery_template() -> String {
    r#"✅ **站点恢复**
- **站点**: {{site_name}}:{{port}}
- **恢复时间**: {{timestamp}}"#
        .to_string()
}
