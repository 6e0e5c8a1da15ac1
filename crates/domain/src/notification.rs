//! # 通知
//!
//! お問い合わせに伴うメール通知のドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`MessageKind`] | 通知メール種別 | 送信者への受付確認、管理者へのアラート、設定確認用テスト |
//! | [`EmailMessage`] | メールメッセージ | テンプレートレンダリングの出力 |
//! | [`DispatchResult`] | 送信結果 | 1 通のメールにつき 1 つ。成功時はメッセージ ID を持つ |
//! | [`DispatchErrorKind`] | 送信失敗種別 | 無効化、未設定、宛先不正、送信失敗 |
//!
//! ## 設計方針
//!
//! - **例外を投げない**: 通知の失敗はすべて [`DispatchResult`] に符号化して呼び出し元へ返す
//! - **種別ごとに独立**: 受付確認の失敗は管理者アラートの送信に影響しない
//! - **送信エラーと結果の分離**: トランスポートが返す [`NotificationError`] は
//!   リトライエンジン内部で消費され、呼び出し元には [`DispatchResult`] だけが渡る

use serde::Serialize;
use strum::IntoStaticStr;
use thiserror::Error;

/// 通知送信エラー
///
/// トランスポート（SMTP 等）とテンプレートエンジンが返すエラー。
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// メッセージを組み立てられない（アドレスの解釈失敗など）。再送しても結果は変わらない
    #[error("メッセージの組み立てに失敗: {0}")]
    InvalidMessage(String),

    /// 1 回の送信試行が制限時間内に完了しなかった
    #[error("メール送信がタイムアウト: {0:?}")]
    Timeout(std::time::Duration),

    /// 起動時の接続確認に失敗
    #[error("メールサーバーへの接続確認に失敗: {0}")]
    ProbeFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),
}

impl NotificationError {
    /// 再送で回復する見込みがあるか
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidMessage(_) | Self::TemplateFailed(_))
    }
}

/// 通知メール種別
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    /// 受付確認: お問い合わせの送信者へ
    UserConfirmation,
    /// 管理者アラート: 設定された管理者アドレスへ
    AdminAlert,
    /// テストメール: 設定確認用に管理者アドレスへ
    TestEmail,
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
/// HTML 本文とプレーンテキスト本文は同じ事実（名前、メールアドレス、本文、日時）を含む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信元（表示名付き、例: `"SayOne Ventures" <noreply@example.com>`）
    pub from:      String,
    /// 送信先メールアドレス
    pub to:        String,
    /// 返信先メールアドレス
    pub reply_to:  Option<String>,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
    /// プレーンテキスト本文
    pub text_body: String,
}

/// 送信成功時にトランスポートが返す情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    /// トランスポートが割り当てたメッセージ ID
    pub message_id: String,
}

/// 送信失敗種別
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DispatchErrorKind {
    /// 設定不足または起動時の接続確認失敗により通知が無効化されている。送信は試行しない
    ServiceDisabled,
    /// この種別のメールを組み立てられない（管理者アドレス未設定など）。この 1 通だけスキップする
    NotConfigured,
    /// 宛先アドレスが構文チェックに失敗した。リトライしない
    InvalidRecipient,
    /// すべての送信試行が失敗した
    TransportFailure,
}

/// 1 通のメールの送信結果
///
/// 成功時は `message_id`、失敗時は `error_kind` と `detail` を持つ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    success:    bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<DispatchErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail:     Option<String>,
}

impl DispatchResult {
    /// 送信成功
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            success:    true,
            message_id: Some(message_id.into()),
            error_kind: None,
            detail:     None,
        }
    }

    /// 送信失敗
    pub fn failed(error_kind: DispatchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            success:    false,
            message_id: None,
            error_kind: Some(error_kind),
            detail:     Some(detail.into()),
        }
    }

    pub fn service_disabled() -> Self {
        Self::failed(
            DispatchErrorKind::ServiceDisabled,
            "Email service is disabled",
        )
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn error_kind(&self) -> Option<DispatchErrorKind> {
        self.error_kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// 呼び出し元が警告として扱うべき失敗かどうか
    ///
    /// `NotConfigured` は設定による意図的なスキップなので警告にしない。
    pub fn is_warning(&self) -> bool {
        matches!(
            self.error_kind,
            Some(
                DispatchErrorKind::ServiceDisabled
                    | DispatchErrorKind::InvalidRecipient
                    | DispatchErrorKind::TransportFailure
            )
        )
    }
}

/// 1 件のお問い合わせに対する通知結果の組
///
/// 受付確認と管理者アラートの結果が常に両方そろう。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationOutcome {
    pub user_result:  DispatchResult,
    pub admin_result: DispatchResult,
}

impl NotificationOutcome {
    /// 両方とも送信に成功したか
    pub fn all_sent(&self) -> bool {
        self.user_result.is_success() && self.admin_result.is_success()
    }

    /// 警告として扱うべき失敗が 1 つでもあるか
    pub fn has_warning(&self) -> bool {
        self.user_result.is_warning() || self.admin_result.is_warning()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn message_kindの文字列変換が正しい() {
        assert_eq!(MessageKind::UserConfirmation.to_string(), "user_confirmation");
        assert_eq!(MessageKind::AdminAlert.to_string(), "admin_alert");
        assert_eq!(MessageKind::TestEmail.to_string(), "test_email");

        assert_eq!(
            MessageKind::from_str("admin_alert").unwrap(),
            MessageKind::AdminAlert
        );
        assert!(MessageKind::from_str("unknown").is_err());
    }

    #[rstest]
    #[case(NotificationError::SendFailed("connection reset".to_string()), true)]
    #[case(NotificationError::Timeout(std::time::Duration::from_secs(10)), true)]
    #[case(NotificationError::InvalidMessage("宛先アドレス不正".to_string()), false)]
    #[case(NotificationError::TemplateFailed("missing".to_string()), false)]
    fn 組み立て失敗は再送対象外(#[case] error: NotificationError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[test]
    fn sentは成功とメッセージidだけを持つ() {
        let result = DispatchResult::sent("<abc@example.com>");

        assert!(result.is_success());
        assert_eq!(result.message_id(), Some("<abc@example.com>"));
        assert_eq!(result.error_kind(), None);
        assert_eq!(result.detail(), None);
        assert!(!result.is_warning());
    }

    #[test]
    fn failedは失敗種別と詳細だけを持つ() {
        let result = DispatchResult::failed(DispatchErrorKind::TransportFailure, "接続拒否");

        assert!(!result.is_success());
        assert_eq!(result.message_id(), None);
        assert_eq!(
            result.error_kind(),
            Some(DispatchErrorKind::TransportFailure)
        );
        assert_eq!(result.detail(), Some("接続拒否"));
    }

    #[rstest]
    #[case(DispatchErrorKind::ServiceDisabled, true)]
    #[case(DispatchErrorKind::InvalidRecipient, true)]
    #[case(DispatchErrorKind::TransportFailure, true)]
    #[case(DispatchErrorKind::NotConfigured, false)]
    fn is_warningは未設定によるスキップを除外する(
        #[case] kind: DispatchErrorKind,
        #[case] expected: bool,
    ) {
        assert_eq!(DispatchResult::failed(kind, "x").is_warning(), expected);
    }

    #[test]
    fn dispatch_resultのjsonは該当フィールドだけを含む() {
        let sent = serde_json::to_value(DispatchResult::sent("id-1")).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({ "success": true, "message_id": "id-1" })
        );

        let failed = serde_json::to_value(DispatchResult::service_disabled()).unwrap();
        assert_eq!(
            failed,
            serde_json::json!({
                "success": false,
                "error_kind": "service_disabled",
                "detail": "Email service is disabled",
            })
        );
    }

    #[test]
    fn notification_outcomeの集計() {
        let outcome = NotificationOutcome {
            user_result:  DispatchResult::sent("u"),
            admin_result: DispatchResult::failed(DispatchErrorKind::NotConfigured, "admin"),
        };

        assert!(!outcome.all_sent());
        assert!(!outcome.has_warning());

        let outcome = NotificationOutcome {
            user_result:  DispatchResult::failed(DispatchErrorKind::InvalidRecipient, "bad"),
            admin_result: DispatchResult::sent("a"),
        };

        assert!(outcome.has_warning());
    }
}
