//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! `NOTIFICATION_BACKEND=noop` のローカル開発で使用する。

use async_trait::async_trait;
use sayone_domain::notification::{EmailMessage, NotificationError, SentEmail};

use super::{NotificationSender, generate_message_id};

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone, Default)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
        let message_id = generate_message_id(&email.from);
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "Noop: メール送信をスキップ"
        );
        Ok(SentEmail { message_id })
    }

    async fn probe(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_emailはメッセージidを返す() {
        let sender = NoopNotificationSender;
        let email = EmailMessage {
            from:      "noreply@example.com".to_string(),
            to:        "test@example.com".to_string(),
            reply_to:  None,
            subject:   "テスト件名".to_string(),
            html_body: "<p>テスト</p>".to_string(),
            text_body: "テスト".to_string(),
        };

        let sent = sender.send_email(&email).await.unwrap();

        assert!(sent.message_id.ends_with("@example.com>"));
    }

    #[tokio::test]
    async fn probeは常に成功する() {
        assert!(NoopNotificationSender.probe().await.is_ok());
    }
}
