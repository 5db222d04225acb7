//! 通知渠道集成测试

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use mockito::Matcher;
use serde_json::json;
use site_vitals::config::NotifierConfig;
use site_vitals::notification::{
    AlertDispatcher, AlertEvent, AlertKind, AlertSink, FeishuSender, NoOpSender, WebhookSender,
};
use std::sync::Arc;

struct FailingSink;

#[async_trait]
impl AlertSink for FailingSink {
    fn name(&self) -> &str {
        "failing"
    }

    async fn notify(&self, _event: &AlertEvent) -> Result<()> {
        Err(anyhow!("下游不可用"))
    }
}

fn alert(message: &str) -> AlertEvent {
    AlertEvent::new(AlertKind::Alert, "example.com", message)
}

#[tokio::test]
async fn test_webhook_posts_content_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({ "content": "example.com 不可达" })))
        .with_status(204)
        .create_async()
        .await;

    let sender = WebhookSender::new(format!("{}/hook", server.url())).unwrap();
    sender.notify(&alert("example.com 不可达")).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_webhook_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hook")
        .with_status(500)
        .create_async()
        .await;

    let sender = WebhookSender::new(format!("{}/hook", server.url())).unwrap();
    assert!(sender.notify(&alert("down")).await.is_err());
}

#[tokio::test]
async fn test_feishu_rejected_request_is_failure() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/bot")
        .match_body(Matcher::PartialJson(json!({ "msg_type": "interactive" })))
        .with_status(400)
        .create_async()
        .await;

    let sender = FeishuSender::new(format!("{}/bot", server.url())).unwrap();
    assert!(sender.notify(&alert("down")).await.is_err());

    mock.assert_async().await;
}

#[tokio::test]
async fn test_failing_sink_does_not_block_others() {
    let mut server = mockito::Server::new_async().await;
    let good = server
        .mock("POST", "/good")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let bad = server
        .mock("POST", "/bad")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;

    let dispatcher = AlertDispatcher::from_config(&[
        NotifierConfig::Webhook {
            url: format!("{}/bad", server.url()),
        },
        NotifierConfig::Webhook {
            url: format!("{}/good", server.url()),
        },
    ])
    .unwrap();

    let report = dispatcher.broadcast(&alert("down")).await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, vec!["webhook".to_string()]);
    good.assert_async().await;
    bad.assert_async().await;
}

#[tokio::test]
async fn test_dispatcher_isolates_custom_sinks() {
    let dispatcher = AlertDispatcher::new(vec![
        Arc::new(FailingSink) as Arc<dyn AlertSink>,
        Arc::new(NoOpSender),
        Arc::new(FailingSink),
    ]);

    let report = dispatcher.broadcast(&alert("down")).await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed.len(), 2);
    assert!(!report.all_delivered());
}
