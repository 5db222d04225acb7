//! 健康检测模块
//!
//! 提供TCP探测、错误分类、结果队列、站点状态机和任务调度功能

pub mod classifier;
pub mod controller;
pub mod monitor;
pub mod prober;
pub mod queue;
pub mod result;
pub mod scheduler;

// 重新导出主要类型
pub use classifier::{classify, RecoverableNetworkError};
pub use controller::Controller;
pub use monitor::{MonitorError, SiteMonitor};
pub use prober::{Prober, TcpProber};
pub use queue::ResultQueue;
pub use result::{PollOutcome, PollResult, PollStats, SiteHealth, SiteRuntimeState};
pub use scheduler::{MonitorScheduler, SchedulerReport};
