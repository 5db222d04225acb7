//! 网络错误分类
//!
//! 把一次探测失败划分为可恢复的网络错误或致命错误。可恢复错误进入结果流并累计失败次数，
//! 其他错误会终止对应站点的探测任务。

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;

/// 可恢复的网络错误种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoverableNetworkError {
    /// 连接被拒绝
    ConnectionRefused,
    /// 网络或主机不可达
    NetworkUnreachable,
    /// 连接超时
    ConnectionTimedOut,
    /// 连接被对端重置
    ConnectionResetByPeer,
    /// 未知主机名
    UnknownHostName,
    /// 域名服务器临时故障
    TemporaryNameServerFailure,
    /// 域名服务器故障
    NameServerFailure,
}

impl RecoverableNetworkError {
    /// 所有可恢复错误种类
    pub const ALL: [RecoverableNetworkError; 7] = [
        RecoverableNetworkError::ConnectionRefused,
        RecoverableNetworkError::NetworkUnreachable,
        RecoverableNetworkError::ConnectionTimedOut,
        RecoverableNetworkError::ConnectionResetByPeer,
        RecoverableNetworkError::UnknownHostName,
        RecoverableNetworkError::TemporaryNameServerFailure,
        RecoverableNetworkError::NameServerFailure,
    ];

    /// 稳定的机器可读代码，用于日志和消息模板
    pub fn code(&self) -> &'static str {
        match self {
            RecoverableNetworkError::ConnectionRefused => "connection_refused",
            RecoverableNetworkError::NetworkUnreachable => "network_unreachable",
            RecoverableNetworkError::ConnectionTimedOut => "connection_timed_out",
            RecoverableNetworkError::ConnectionResetByPeer => "connection_reset_by_peer",
            RecoverableNetworkError::UnknownHostName => "unknown_host_name",
            RecoverableNetworkError::TemporaryNameServerFailure => {
                "temporary_name_server_failure"
            }
            RecoverableNetworkError::NameServerFailure => "name_server_failure",
        }
    }

    /// 可读的错误描述，用于组装告警文本
    pub fn description(&self) -> &'static str {
        match self {
            RecoverableNetworkError::ConnectionRefused => "连接被拒绝",
            RecoverableNetworkError::NetworkUnreachable => "网络不可达",
            RecoverableNetworkError::ConnectionTimedOut => "连接超时",
            RecoverableNetworkError::ConnectionResetByPeer => "连接被对端重置",
            RecoverableNetworkError::UnknownHostName => "未知的主机名",
            RecoverableNetworkError::TemporaryNameServerFailure => "域名服务器暂时不可用",
            RecoverableNetworkError::NameServerFailure => "域名服务器解析失败",
        }
    }
}

impl std::fmt::Display for RecoverableNetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// 对探测失败进行分类
///
/// 返回 `None` 表示该错误不在已知的网络错误范围内，应视为致命错误。
pub fn classify(error: &ProbeError) -> Option<RecoverableNetworkError> {
    match error {
        ProbeError::Connect { source, .. } => classify_connect(source.kind()),
        ProbeError::Resolve { source, .. } => classify_resolve(source),
        ProbeError::NoAddress { .. } => Some(RecoverableNetworkError::UnknownHostName),
    }
}

fn classify_connect(kind: ErrorKind) -> Option<RecoverableNetworkError> {
    match kind {
        ErrorKind::ConnectionRefused => Some(RecoverableNetworkError::ConnectionRefused),
        ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable | ErrorKind::NetworkDown => {
            Some(RecoverableNetworkError::NetworkUnreachable)
        }
        ErrorKind::TimedOut => Some(RecoverableNetworkError::ConnectionTimedOut),
        ErrorKind::ConnectionReset => Some(RecoverableNetworkError::ConnectionResetByPeer),
        _ => None,
    }
}

/// 解析器错误没有统一的 `ErrorKind`，只能依据 getaddrinfo 的错误文本判断
fn classify_resolve(source: &std::io::Error) -> Option<RecoverableNetworkError> {
    if source.kind() == ErrorKind::TimedOut {
        return Some(RecoverableNetworkError::TemporaryNameServerFailure);
    }

    let message = source.to_string().to_lowercase();

    if message.contains("temporary failure") || message.contains("try again") {
        Some(RecoverableNetworkError::TemporaryNameServerFailure)
    } else if message.contains("non-recoverable")
        || message.contains("servfail")
        || message.contains("server failure")
    {
        Some(RecoverableNetworkError::NameServerFailure)
    } else if message.contains("not known")
        || message.contains("no address associated")
        || message.contains("nodename nor servname")
        || message.contains("no such host")
    {
        Some(RecoverableNetworkError::UnknownHostName)
    } else {
        None
    }
}
