//! # 通知送信
//!
//! メール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（本番・開発）、Noop（送信せずログ出力のみ）
//! - **接続確認**: 起動時に一度だけ `probe()` を呼び、通知の有効・無効を決める
//! - **リトライしない**: 1 回の呼び出しは 1 回の送信試行。リトライはユースケース層の責務

mod noop;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
use sayone_domain::notification::{EmailMessage, NotificationError, SentEmail};
pub use smtp::{SmtpNotificationSender, SmtpSettings};

/// メール送信トレイト
///
/// 通知基盤の中核。メール送信の具体的な方法を抽象化する。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを 1 回送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError>;

    /// 送信先サーバーへの接続を確認する
    async fn probe(&self) -> Result<(), NotificationError>;
}

/// `"表示名" <address>` 形式の送信元からドメイン部分を取り出す
///
/// Message-ID の右辺に使う。取り出せない場合は `localhost`。
fn message_id_domain(from: &str) -> &str {
    let address = from
        .rsplit_once('<')
        .map_or(from, |(_, rest)| rest.trim_end_matches('>'));
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim())
        .filter(|domain| !domain.is_empty())
        .unwrap_or("localhost")
}

/// 新しい Message-ID を生成する
fn generate_message_id(from: &str) -> String {
    format!("<{}@{}>", uuid::Uuid::new_v4(), message_id_domain(from))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(r#""SayOne Ventures" <noreply@sayoneventures.com>"#, "sayoneventures.com")]
    #[case("noreply@example.com", "example.com")]
    #[case("<bot@mail.example.org>", "mail.example.org")]
    #[case("no-domain", "localhost")]
    #[case("trailing@", "localhost")]
    fn message_id_domainが送信元のドメインを返す(#[case] from: &str, #[case] expected: &str) {
        assert_eq!(message_id_domain(from), expected);
    }

    #[test]
    fn generate_message_idは毎回異なるidを生成する() {
        let from = "noreply@example.com";
        let first = generate_message_id(from);
        let second = generate_message_id(from);

        assert_ne!(first, second);
        assert!(first.starts_with('<'));
        assert!(first.ends_with("@example.com>"));
    }
}
