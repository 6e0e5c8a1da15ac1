//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpTransport` を使用してメールを送信する。
//! `secure = true` の場合は接続直後から TLS（465 番ポート想定）、
//! それ以外は STARTTLS（587 番ポート想定）で接続する。

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Tokio1Executor,
    message::{Mailbox, Message, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use sayone_domain::notification::{EmailMessage, NotificationError, SentEmail};

use super::{NotificationSender, generate_message_id};

/// SMTP 接続設定
#[derive(Clone)]
pub struct SmtpSettings {
    /// SMTP サーバーのホスト名
    pub host:     String,
    /// SMTP サーバーのポート番号
    pub port:     u16,
    /// 接続直後から TLS を使うか（false なら STARTTLS）
    pub secure:   bool,
    /// 認証ユーザー
    pub username: String,
    /// 認証パスワード
    pub password: String,
    /// 接続・コマンドのタイムアウト
    pub timeout:  Duration,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &"*****")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP 通知送信
///
/// `lettre::AsyncSmtpTransport<Tokio1Executor>` をラップする。
/// トランスポートは内部に接続プールを持つため、起動時に 1 つ作って使い回す。
pub struct SmtpNotificationSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    ///
    /// この時点では接続しない。接続確認は [`NotificationSender::probe`] で行う。
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotificationError> {
        let builder = if settings.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        }
        .map_err(|e| NotificationError::SendFailed(format!("SMTP トランスポート構築失敗: {e}")))?;

        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        Ok(Self { transport })
    }

    fn build_message(
        email: &EmailMessage,
        message_id: String,
    ) -> Result<Message, NotificationError> {
        let from: Mailbox = email
            .from
            .parse()
            .map_err(|e| NotificationError::InvalidMessage(format!("送信元アドレス不正: {e}")))?;
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| NotificationError::InvalidMessage(format!("宛先アドレス不正: {e}")))?;

        let mut builder = Message::builder()
            .message_id(Some(message_id))
            .from(from)
            .to(to)
            .subject(&email.subject);

        // 解釈できない返信先は省略する
        if let Some(reply_to) = &email.reply_to {
            match reply_to.parse::<Mailbox>() {
                Ok(mailbox) => builder = builder.reply_to(mailbox),
                Err(e) => tracing::warn!(
                    reply_to = %reply_to,
                    error = %e,
                    "返信先アドレスを解釈できないため Reply-To を省略"
                ),
            }
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )
            .map_err(|e| NotificationError::InvalidMessage(format!("メッセージ構築失敗: {e}")))
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
        let message_id = generate_message_id(&email.from);
        let message = Self::build_message(email, message_id.clone())?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SMTP 送信失敗: {e}")))?;

        Ok(SentEmail { message_id })
    }

    async fn probe(&self) -> Result<(), NotificationError> {
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(NotificationError::ProbeFailed(
                "SMTP サーバーが NOOP に応答しません".to_string(),
            )),
            Err(e) => Err(NotificationError::ProbeFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_settings() -> SmtpSettings {
        SmtpSettings {
            host:     "smtp.example.com".to_string(),
            port:     587,
            secure:   false,
            username: "mailer@example.com".to_string(),
            password: "app-password".to_string(),
            timeout:  Duration::from_secs(10),
        }
    }

    fn make_email() -> EmailMessage {
        EmailMessage {
            from:      r#""SayOne Ventures" <noreply@example.com>"#.to_string(),
            to:        "asha@example.com".to_string(),
            reply_to:  Some("asha@example.com".to_string()),
            subject:   "Thank You for Contacting SayOne Ventures".to_string(),
            html_body: "<p>Dear Asha,</p>".to_string(),
            text_body: "Dear Asha,".to_string(),
        }
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpNotificationSender>();
    }

    #[tokio::test]
    async fn newは接続せずにインスタンスを作成できる() {
        let sender = SmtpNotificationSender::new(&make_settings());
        assert!(sender.is_ok());
    }

    #[test]
    fn debug出力にパスワードを含めない() {
        let debug = format!("{:?}", make_settings());

        assert!(!debug.contains("app-password"));
        assert!(debug.contains("smtp.example.com"));
    }

    #[test]
    fn メッセージにmessage_idと返信先が設定される() {
        let message =
            SmtpNotificationSender::build_message(&make_email(), "<id-1@example.com>".to_string())
                .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("Message-ID: <id-1@example.com>"));
        assert!(formatted.contains("Reply-To: asha@example.com"));
        assert!(formatted.contains("To: asha@example.com"));
    }

    #[test]
    fn 不正な宛先はinvalid_messageになる() {
        let mut email = make_email();
        email.to = "not-an-email".to_string();

        let result = SmtpNotificationSender::build_message(&email, "<id@example.com>".to_string());

        assert!(matches!(result, Err(NotificationError::InvalidMessage(_))));
    }

    #[test]
    fn 解釈できない返信先は省略して組み立てる() {
        let mut email = make_email();
        email.to = "mailer@sayoneventures.com".to_string();
        email.reply_to = Some("a,b@example.com".to_string());

        let message =
            SmtpNotificationSender::build_message(&email, "<id-2@example.com>".to_string())
                .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();

        assert!(formatted.contains("To: mailer@sayoneventures.com"));
        assert!(!formatted.contains("Reply-To"));
    }
}
