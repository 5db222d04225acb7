//! TCP探测器实现
//!
//! 提供TCP可达性探测功能，测量建立连接所需的往返时间

use crate::config::SiteConfig;
use crate::error::ProbeError;
use crate::health::classifier::classify;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::Instant;
use tracing::trace;

/// 探测器trait，定义探测接口
#[async_trait]
pub trait Prober: Send + Sync {
    /// 对站点执行一次探测
    ///
    /// # 参数
    /// * `site` - 站点配置
    ///
    /// # 返回
    /// * `Result<Duration, ProbeError>` - 成功时返回往返时间
    async fn probe(&self, site: &SiteConfig) -> Result<Duration, ProbeError>;
}

/// 基于TCP连接的探测器
///
/// 只建立连接，不交换任何数据。超时完全由操作系统的连接超时决定。
#[derive(Debug, Clone, Default)]
pub struct TcpProber;

impl TcpProber {
    /// 创建新的TCP探测器
    pub fn new() -> Self {
        Self
    }

    /// 解析站点地址
    async fn resolve(&self, site: &SiteConfig) -> Result<Vec<SocketAddr>, ProbeError> {
        let addrs: Vec<SocketAddr> = lookup_host((site.name.as_str(), site.port))
            .await
            .map_err(|source| ProbeError::Resolve {
                host: site.name.clone(),
                source,
            })?
            .collect();

        if addrs.is_empty() {
            return Err(ProbeError::NoAddress {
                host: site.name.clone(),
            });
        }

        Ok(addrs)
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, site: &SiteConfig) -> Result<Duration, ProbeError> {
        let addrs = self.resolve(site).await?;
        let mut errors = Vec::with_capacity(addrs.len());

        // 依次尝试解析出的地址，第一个成功即返回
        for addr in addrs {
            let start_time = Instant::now();
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let round_trip = start_time.elapsed();
                    drop(stream);
                    trace!("连接 {} 成功，耗时 {:?}", addr, round_trip);
                    return Ok(round_trip);
                }
                Err(source) => {
                    trace!("连接 {} 失败: {}", addr, source);
                    errors.push(ProbeError::Connect {
                        addr: addr.to_string(),
                        source,
                    });
                }
            }
        }

        Err(select_connect_error(&site.name, errors))
    }
}

/// 从所有地址的连接错误中选出上报的那个
///
/// 优先返回第一个可识别的网络错误；都无法识别时返回最后一个。
fn select_connect_error(host: &str, mut errors: Vec<ProbeError>) -> ProbeError {
    if let Some(index) = errors.iter().position(|e| classify(e).is_some()) {
        return errors.swap_remove(index);
    }
    errors.pop().unwrap_or_else(|| ProbeError::NoAddress {
        host: host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::classifier::RecoverableNetworkError;
    use std::io;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let site = SiteConfig::new("127.0.0.1").with_port(port);
        let round_trip = TcpProber::new().probe(&site).await.unwrap();

        assert!(round_trip < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_probe_closed_port_is_refused() {
        // 绑定后立即释放，得到一个大概率无人监听的端口
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let site = SiteConfig::new("127.0.0.1").with_port(port);
        let error = TcpProber::new().probe(&site).await.unwrap_err();

        assert!(matches!(error, ProbeError::Connect { .. }));
        assert_eq!(
            classify(&error),
            Some(RecoverableNetworkError::ConnectionRefused)
        );
    }

    #[tokio::test]
    async fn test_probe_unresolvable_host() {
        let site = SiteConfig::new("nonexistent.invalid").with_port(80);
        let error = TcpProber::new().probe(&site).await.unwrap_err();

        assert!(matches!(
            error,
            ProbeError::Resolve { .. } | ProbeError::NoAddress { .. }
        ));
    }

    fn connect_error(addr: &str, kind: io::ErrorKind) -> ProbeError {
        ProbeError::Connect {
            addr: addr.to_string(),
            source: io::Error::from(kind),
        }
    }

    #[test]
    fn test_recoverable_error_wins_over_later_unknown_error() {
        let errors = vec![
            connect_error("93.184.216.34:443", io::ErrorKind::ConnectionRefused),
            connect_error("[2606:2800:220:1::]:443", io::ErrorKind::AddrNotAvailable),
        ];

        let error = select_connect_error("example.com", errors);
        assert_eq!(
            classify(&error),
            Some(RecoverableNetworkError::ConnectionRefused)
        );
    }

    #[test]
    fn test_unknown_errors_fall_back_to_last() {
        let errors = vec![
            connect_error("10.0.0.1:443", io::ErrorKind::PermissionDenied),
            connect_error("10.0.0.2:443", io::ErrorKind::AddrNotAvailable),
        ];

        match select_connect_error("example.com", errors) {
            ProbeError::Connect { addr, source } => {
                assert_eq!(addr, "10.0.0.2:443");
                assert_eq!(source.kind(), io::ErrorKind::AddrNotAvailable);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_errors_means_no_address() {
        assert!(matches!(
            select_connect_error("example.com", Vec::new()),
            ProbeError::NoAddress { .. }
        ));
    }
}
