//! 站点探测任务
//!
//! 每个站点一个探测任务，循环执行“探测 → 休眠”，把结果推入共享的结果队列。

use crate::config::SiteConfig;
use crate::error::{ProbeError, QueueError};
use crate::health::classifier::classify;
use crate::health::prober::Prober;
use crate::health::queue::ResultQueue;
use crate::health::result::PollResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// 终止探测任务的错误
#[derive(Error, Debug)]
pub enum MonitorError {
    /// 分类器无法识别的探测错误
    #[error("站点 {site} 出现无法恢复的探测错误: {source}")]
    Fatal {
        site: String,
        #[source]
        source: ProbeError,
    },
}

/// 单个站点的探测任务
pub struct SiteMonitor {
    /// 站点配置
    site: Arc<SiteConfig>,
    /// 探测器
    prober: Arc<dyn Prober>,
    /// 共享的结果队列
    queue: Arc<ResultQueue<PollResult>>,
    /// 全局停止标志
    terminate: Arc<AtomicBool>,
}

impl SiteMonitor {
    /// 创建新的探测任务
    pub fn new(
        site: Arc<SiteConfig>,
        prober: Arc<dyn Prober>,
        queue: Arc<ResultQueue<PollResult>>,
        terminate: Arc<AtomicBool>,
    ) -> Self {
        Self {
            site,
            prober,
            queue,
            terminate,
        }
    }

    /// 运行探测循环
    ///
    /// 每轮探测前检查一次停止标志；可恢复错误作为失败结果入队，
    /// 无法识别的错误结束本站点的循环，不影响其他站点。
    #[instrument(skip(self), fields(site = %self.site.name, port = self.site.port))]
    pub async fn run(self) -> Result<(), MonitorError> {
        let interval = self.site.polling_interval();
        info!("启动站点探测任务，间隔 {:?}", interval);

        loop {
            if self.terminate.load(Ordering::Acquire) {
                info!("收到停止信号，探测任务退出");
                return Ok(());
            }

            let result = match self.prober.probe(&self.site).await {
                Ok(round_trip) => {
                    debug!("探测成功，往返时间 {:?}", round_trip);
                    PollResult::ok(self.site.name.clone(), round_trip)
                }
                Err(probe_error) => match classify(&probe_error) {
                    Some(kind) => {
                        warn!("探测失败: {} ({})", kind, probe_error);
                        PollResult::error(self.site.name.clone(), kind)
                    }
                    None => {
                        error!("探测出现无法恢复的错误，停止监控该站点: {}", probe_error);
                        return Err(MonitorError::Fatal {
                            site: self.site.name.clone(),
                            source: probe_error,
                        });
                    }
                },
            };

            if let Err(QueueError::Closed) = self.queue.enqueue(result) {
                info!("结果队列已关闭，探测任务退出");
                return Ok(());
            }

            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::classifier::RecoverableNetworkError;
    use crate::health::result::PollOutcome;
    use async_trait::async_trait;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// 按调用次数返回预设结果的探测器
    struct ScriptedProber {
        calls: AtomicUsize,
        fatal_after: usize,
    }

    #[async_trait]
    impl Prober for ScriptedProber {
        async fn probe(&self, site: &SiteConfig) -> Result<Duration, ProbeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fatal_after {
                return Err(ProbeError::Connect {
                    addr: site.address(),
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                });
            }
            if call % 2 == 0 {
                Ok(Duration::from_millis(5))
            } else {
                Err(ProbeError::Connect {
                    addr: site.address(),
                    source: io::Error::from(io::ErrorKind::ConnectionRefused),
                })
            }
        }
    }

    fn test_site() -> Arc<SiteConfig> {
        Arc::new(SiteConfig::new("example.com").with_polling_interval(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_recoverable_errors_are_enqueued_and_fatal_stops() {
        let queue = Arc::new(ResultQueue::new());
        let prober = Arc::new(ScriptedProber {
            calls: AtomicUsize::new(0),
            fatal_after: 4,
        });
        let monitor = SiteMonitor::new(
            test_site(),
            prober,
            Arc::clone(&queue),
            Arc::new(AtomicBool::new(false)),
        );

        let result = monitor.run().await;

        assert!(matches!(result, Err(MonitorError::Fatal { .. })));
        assert_eq!(queue.len(), 4);

        let outcomes: Vec<PollOutcome> = (0..4)
            .map(|_| queue.try_dequeue().unwrap().outcome)
            .collect();
        assert!(outcomes[0].is_ok());
        assert_eq!(
            outcomes[1],
            PollOutcome::Error {
                error: RecoverableNetworkError::ConnectionRefused
            }
        );
        assert!(outcomes[2].is_ok());
    }

    #[tokio::test]
    async fn test_terminate_flag_checked_before_probe() {
        let queue = Arc::new(ResultQueue::new());
        let prober = Arc::new(ScriptedProber {
            calls: AtomicUsize::new(0),
            fatal_after: usize::MAX,
        });
        let terminate = Arc::new(AtomicBool::new(true));
        let monitor = SiteMonitor::new(test_site(), prober.clone(), Arc::clone(&queue), terminate);

        assert!(monitor.run().await.is_ok());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_closed_queue_stops_monitor() {
        let queue = Arc::new(ResultQueue::new());
        queue.close();
        let prober = Arc::new(ScriptedProber {
            calls: AtomicUsize::new(0),
            fatal_after: usize::MAX,
        });
        let monitor = SiteMonitor::new(
            test_site(),
            prober.clone(),
            queue,
            Arc::new(AtomicBool::new(false)),
        );

        assert!(monitor.run().await.is_ok());
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
    }
}
