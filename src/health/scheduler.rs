//! 任务调度器模块
//!
//! 负责启动每个站点的探测任务和唯一的控制器线程，并按顺序完成停止流程

use crate::config::{Config, SiteConfig};
use crate::health::controller::Controller;
use crate::health::monitor::SiteMonitor;
use crate::health::prober::Prober;
use crate::health::queue::ResultQueue;
use crate::health::result::PollResult;
use crate::notification::AlertDispatcher;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 调度器停止后的汇总信息
pub struct SchedulerReport {
    /// 退出时的控制器，包含所有站点的最终状态
    pub controller: Controller,
    /// 因致命错误而停止探测的站点
    pub failed_sites: Vec<String>,
}

/// 任务调度器
pub struct MonitorScheduler {
    /// 共享的结果队列
    queue: Arc<ResultQueue<PollResult>>,
    /// 全局停止标志
    terminate: Arc<AtomicBool>,
    /// 探测任务句柄
    monitors: Vec<(String, JoinHandle<bool>)>,
    /// 控制器线程句柄
    controller: JoinHandle<Controller>,
}

impl MonitorScheduler {
    /// 启动所有已启用站点的探测任务和控制器
    ///
    /// 必须在tokio运行时内调用。
    pub fn start(config: &Config, prober: Arc<dyn Prober>, dispatcher: AlertDispatcher) -> Self {
        let sites: Vec<Arc<SiteConfig>> = config.enabled_sites().cloned().map(Arc::new).collect();
        let skipped = config.sites.len() - sites.len();
        if skipped > 0 {
            debug!("跳过 {} 个已禁用的站点", skipped);
        }

        info!("启动任务调度器，站点数量: {}", sites.len());

        let queue = Arc::new(ResultQueue::new());
        let terminate = Arc::new(AtomicBool::new(false));

        let controller = Controller::new(sites.iter().cloned(), Arc::clone(&queue), dispatcher)
            .with_global_config(config);
        let runtime = Handle::current();
        let controller = tokio::task::spawn_blocking(move || controller.run(runtime));

        let monitors = sites
            .into_iter()
            .map(|site| {
                let site_name = site.name.clone();
                let monitor = SiteMonitor::new(
                    site,
                    Arc::clone(&prober),
                    Arc::clone(&queue),
                    Arc::clone(&terminate),
                );
                let handle = tokio::spawn(async move {
                    match monitor.run().await {
                        Ok(()) => true,
                        Err(e) => {
                            debug!("探测任务结束: {}", e);
                            false
                        }
                    }
                });
                (site_name, handle)
            })
            .collect();

        info!("任务调度器启动完成");

        Self {
            queue,
            terminate,
            monitors,
            controller,
        }
    }

    /// 仍在运行的探测任务数量
    pub fn running_monitors(&self) -> usize {
        self.monitors
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .count()
    }

    /// 停止调度器
    ///
    /// 探测任务在当前探测或休眠结束后退出；所有探测任务结束后关闭队列，
    /// 控制器处理完剩余结果后退出。
    pub async fn stop(self) -> Result<SchedulerReport> {
        info!("停止任务调度器");
        self.terminate.store(true, Ordering::Release);

        let mut failed_sites = Vec::new();
        for (site_name, handle) in self.monitors {
            match handle.await {
                Ok(true) => debug!("探测任务已停止: {}", site_name),
                Ok(false) => failed_sites.push(site_name),
                Err(e) => {
                    warn!("探测任务异常退出 {}: {}", site_name, e);
                    failed_sites.push(site_name);
                }
            }
        }

        self.queue.close();
        let controller = self.controller.await.context("控制器线程异常退出")?;

        info!("任务调度器已停止");
        Ok(SchedulerReport {
            controller,
            failed_sites,
        })
    }
}
