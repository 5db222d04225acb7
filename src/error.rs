//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Site Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum SiteVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测相关错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 结果队列错误
    #[error("队列错误: {0}")]
    Queue(#[from] QueueError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 单次TCP探测的失败原因
///
/// 是否可恢复由 [`crate::health::classifier::classify`] 决定。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// 域名解析失败
    #[error("域名解析失败 {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// 域名解析成功但没有任何地址
    #[error("域名 {host} 没有可用的地址")]
    NoAddress { host: String },

    /// TCP连接失败
    #[error("连接 {addr} 失败: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// 结果队列错误类型
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// 非阻塞出队时队列为空
    #[error("队列为空")]
    Empty,

    /// 队列已关闭
    #[error("队列已关闭")]
    Closed,
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 发送失败
    #[error("通知发送失败: {0}")]
    SendError(String),

    /// 对端返回非成功状态码
    #[error("通知接口返回错误状态: {status}")]
    HttpStatus { status: u16 },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, SiteVitalsError>;
