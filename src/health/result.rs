//! 探测结果数据结构
//!
//! 定义探测结果、站点运行时状态和统计信息

use crate::health::classifier::RecoverableNetworkError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单次探测的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PollOutcome {
    /// 连接成功
    Ok {
        /// 往返时间，仅作参考，不参与告警判断
        #[serde(with = "duration_serde")]
        round_trip: Duration,
    },
    /// 可恢复的网络错误
    Error { error: RecoverableNetworkError },
}

impl PollOutcome {
    /// 是否探测成功
    pub fn is_ok(&self) -> bool {
        matches!(self, PollOutcome::Ok { .. })
    }
}

/// 探测任务推送给控制器的结果，只会被消费一次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResult {
    /// 站点名称
    pub site_name: String,
    /// 探测结果
    pub outcome: PollOutcome,
    /// 探测完成时间
    pub timestamp: DateTime<Utc>,
}

impl PollResult {
    /// 创建成功结果
    pub fn ok(site_name: impl Into<String>, round_trip: Duration) -> Self {
        Self {
            site_name: site_name.into(),
            outcome: PollOutcome::Ok { round_trip },
            timestamp: Utc::now(),
        }
    }

    /// 创建失败结果
    pub fn error(site_name: impl Into<String>, error: RecoverableNetworkError) -> Self {
        Self {
            site_name: site_name.into(),
            outcome: PollOutcome::Error { error },
            timestamp: Utc::now(),
        }
    }
}

/// 站点健康阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteHealth {
    /// 没有连续失败
    Healthy,
    /// 有连续失败但未超过阈值
    Degrading,
    /// 连续失败超过阈值，已告警
    Alerting,
}

impl std::fmt::Display for SiteHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SiteHealth::Healthy => write!(f, "正常"),
            SiteHealth::Degrading => write!(f, "降级"),
            SiteHealth::Alerting => write!(f, "告警中"),
        }
    }
}

/// 站点运行时状态，只由控制器线程修改
#[derive(Debug, Clone, Default)]
pub struct SiteRuntimeState {
    /// 连续失败次数
    pub consecutive_failures: u32,
    /// 是否处于告警状态
    pub is_alerting: bool,
    /// 最近一次成功探测的往返时间
    pub last_round_trip: Option<Duration>,
    /// 最近一次失败的原因
    pub last_error: Option<RecoverableNetworkError>,
    /// 探测统计
    pub stats: PollStats,
}

impl SiteRuntimeState {
    /// 当前健康阶段
    pub fn health(&self) -> SiteHealth {
        if self.is_alerting {
            SiteHealth::Alerting
        } else if self.consecutive_failures > 0 {
            SiteHealth::Degrading
        } else {
            SiteHealth::Healthy
        }
    }
}

/// Duration序列化模块
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// 探测统计信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollStats {
    /// 总探测次数
    pub total_polls: u64,
    /// 成功次数
    pub successful_polls: u64,
    /// 失败次数
    pub failed_polls: u64,
    /// 平均往返时间（毫秒）
    pub average_round_trip_ms: f64,
    /// 最大往返时间（毫秒）
    pub max_round_trip_ms: u64,
    /// 最小往返时间（毫秒）
    pub min_round_trip_ms: u64,
    /// 最后探测时间
    pub last_poll_time: Option<DateTime<Utc>>,
}

impl Default for PollStats {
    fn default() -> Self {
        Self {
            total_polls: 0,
            successful_polls: 0,
            failed_polls: 0,
            average_round_trip_ms: 0.0,
            max_round_trip_ms: 0,
            min_round_trip_ms: u64::MAX,
            last_poll_time: None,
        }
    }
}

impl PollStats {
    /// 更新统计信息
    pub fn update(&mut self, result: &PollResult) {
        self.total_polls += 1;
        self.last_poll_time = Some(result.timestamp);

        match result.outcome {
            PollOutcome::Ok { round_trip } => {
                // 平均值只统计成功的探测
                let round_trip_ms = round_trip.as_millis() as u64;
                let previous = self.successful_polls as f64;
                self.successful_polls += 1;

                self.max_round_trip_ms = self.max_round_trip_ms.max(round_trip_ms);
                self.min_round_trip_ms = self.min_round_trip_ms.min(round_trip_ms);
                self.average_round_trip_ms = (self.average_round_trip_ms * previous
                    + round_trip_ms as f64)
                    / self.successful_polls as f64;
            }
            PollOutcome::Error { .. } => {
                self.failed_polls += 1;
            }
        }
    }

    /// 成功率（百分比）
    pub fn success_rate(&self) -> f64 {
        if self.total_polls == 0 {
            0.0
        } else {
            (self.successful_polls as f64 / self.total_polls as f64) * 100.0
        }
    }
}
