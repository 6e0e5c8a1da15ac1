//! # Webhook 転送
//!
//! お問い合わせ内容を外部のワークフローシステム（n8n 等）へ JSON で POST する。
//! 転送の失敗はお問い合わせ受付を失敗させない。呼び出し元が警告として扱う。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use sayone_domain::contact::Submission;

use crate::error::InfraError;

/// Webhook 転送トレイト
#[async_trait]
pub trait WebhookForwarder: Send + Sync {
    /// お問い合わせ内容を転送する
    async fn forward(&self, submission: &Submission) -> Result<(), InfraError>;
}

/// HTTP 実装の WebhookForwarder
///
/// `{ "name": ..., "email": ..., "message": ... }` を POST する。
#[derive(Debug, Clone)]
pub struct HttpWebhookForwarder {
    client: Client,
    url:    Url,
}

impl HttpWebhookForwarder {
    /// 新しい転送インスタンスを作成
    ///
    /// `timeout` はリクエスト全体（接続からレスポンス受信まで）の制限時間。
    pub fn new(url: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl WebhookForwarder for HttpWebhookForwarder {
    #[tracing::instrument(skip_all, level = "debug", fields(url = %self.url))]
    async fn forward(&self, submission: &Submission) -> Result<(), InfraError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(InfraError::webhook_rejected(status.as_u16()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpWebhookForwarder>();
    }

    #[test]
    fn newでインスタンスを作成できる() {
        let url = Url::parse("https://hooks.example.com/webhook/contact").unwrap();
        let forwarder = HttpWebhookForwarder::new(url, Duration::from_secs(10));

        assert!(forwarder.is_ok());
    }
}
