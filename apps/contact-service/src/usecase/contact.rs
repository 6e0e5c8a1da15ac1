//! # お問い合わせ受付ユースケース
//!
//! お問い合わせを保存し、Webhook 転送と通知メール送信を行う。
//!
//! ## 結果の集約
//!
//! - 保存に失敗した場合のみ [`ContactError`] を返す
//! - Webhook 転送と通知の失敗は [`SubmissionWarning`] として受付結果に含める
//! - 通知の `NotConfigured`（管理者アラート無効など）は警告にしない

use std::sync::Arc;

use sayone_domain::{
    clock::Clock,
    contact::{StoredSubmission, Submission, SubmissionId},
    notification::NotificationOutcome,
};
use sayone_infra::{InfraError, repository::SubmissionRepository, webhook::WebhookForwarder};
use sayone_shared::{event_log::event, log_business_event};
use serde::Serialize;
use thiserror::Error;

use super::notification::NotificationDispatcher;

/// 受付完了時に送信者へ表示するメッセージ
pub const SUCCESS_MESSAGE: &str = "Thank you for your message! We'll get back to you soon.";

const MAX_NAME_LENGTH: usize = 100;
const MAX_EMAIL_LENGTH: usize = 255;
const MAX_MESSAGE_LENGTH: usize = 5000;

/// お問い合わせ受付エラー
#[derive(Debug, Error)]
pub enum ContactError {
    /// 入力値が制約を満たさない
    #[error("入力値が不正です: {}", .0.join(", "))]
    Validation(Vec<&'static str>),

    /// 保存に失敗
    #[error("お問い合わせの保存に失敗: {0}")]
    Persistence(#[from] InfraError),
}

/// 受付は成功したが一部の後続処理に失敗したことを表す警告
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubmissionWarning {
    /// 通知メールの送信に失敗
    NotificationFailed,
    /// Webhook 転送に失敗
    WebhookFailed,
}

impl SubmissionWarning {
    /// 送信者へ表示する警告文
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotificationFailed => "There was an issue sending email notifications",
            Self::WebhookFailed => "There was an issue forwarding to the workflow system",
        }
    }
}

/// 受付結果
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub submission_id: SubmissionId,
    pub notification:  NotificationOutcome,
    pub warnings:      Vec<SubmissionWarning>,
}

impl SubmissionReceipt {
    /// 送信者へ表示するメッセージ
    pub fn message(&self) -> &'static str {
        SUCCESS_MESSAGE
    }

    /// 警告文を `"; "` で連結したもの（警告がなければ `None`）
    pub fn warning_message(&self) -> Option<String> {
        if self.warnings.is_empty() {
            return None;
        }
        Some(
            self.warnings
                .iter()
                .map(SubmissionWarning::message)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// お問い合わせ受付ユースケース
pub struct ContactUseCase {
    repo:       Arc<dyn SubmissionRepository>,
    webhook:    Option<Arc<dyn WebhookForwarder>>,
    dispatcher: Arc<NotificationDispatcher>,
    clock:      Arc<dyn Clock>,
}

impl ContactUseCase {
    pub fn new(
        repo: Arc<dyn SubmissionRepository>,
        webhook: Option<Arc<dyn WebhookForwarder>>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            webhook,
            dispatcher,
            clock,
        }
    }

    /// お問い合わせを受け付ける
    ///
    /// 保存が成功した後、Webhook 転送と通知メール送信を並行に行う。
    #[tracing::instrument(skip_all, fields(email = %submission.email()))]
    pub async fn submit(&self, submission: Submission) -> Result<SubmissionReceipt, ContactError> {
        validate(&submission)?;

        let stored = StoredSubmission {
            id: SubmissionId::new(),
            submission,
            created_at: self.clock.now(),
        };

        if let Err(e) = self.repo.insert(&stored).await {
            tracing::error!(
                error.category = sayone_shared::event_log::error::category::INFRASTRUCTURE,
                error.kind = sayone_shared::event_log::error::kind::DATABASE,
                error = %e,
                "お問い合わせの保存に失敗"
            );
            return Err(e.into());
        }

        log_business_event!(
            event.category = event::category::CONTACT,
            event.action = event::action::CONTACT_RECEIVED,
            event.entity_type = event::entity_type::SUBMISSION,
            event.entity_id = %stored.id,
            event.result = event::result::SUCCESS,
            "お問い合わせを受付"
        );

        let (forwarded, notification) = tokio::join!(
            self.forward(&stored),
            self.dispatcher.notify_all(&stored.submission),
        );

        let mut warnings = Vec::new();
        if notification.has_warning() {
            warnings.push(SubmissionWarning::NotificationFailed);
        }
        if !forwarded {
            warnings.push(SubmissionWarning::WebhookFailed);
        }

        Ok(SubmissionReceipt {
            submission_id: stored.id,
            notification,
            warnings,
        })
    }

    /// 保存済みのお問い合わせを新しい順に取得する
    pub async fn list_submissions(&self) -> Result<Vec<StoredSubmission>, ContactError> {
        Ok(self.repo.find_all().await?)
    }

    /// Webhook へ転送する（未設定なら成功扱い）
    async fn forward(&self, stored: &StoredSubmission) -> bool {
        let Some(webhook) = &self.webhook else {
            return true;
        };

        match webhook.forward(&stored.submission).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::CONTACT,
                    event.action = event::action::CONTACT_FORWARDED,
                    event.entity_type = event::entity_type::SUBMISSION,
                    event.entity_id = %stored.id,
                    event.result = event::result::SUCCESS,
                    "お問い合わせを Webhook へ転送"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    error.category = sayone_shared::event_log::error::category::EXTERNAL_SERVICE,
                    error.kind = sayone_shared::event_log::error::kind::WEBHOOK,
                    submission_id = %stored.id,
                    error = %e,
                    "Webhook 転送に失敗"
                );
                false
            }
        }
    }
}

fn validate(submission: &Submission) -> Result<(), ContactError> {
    let mut violations = Vec::new();

    if submission.email().trim().is_empty() {
        violations.push("Email is required");
    }
    if submission.email().chars().count() > MAX_EMAIL_LENGTH {
        violations.push("Email must be less than 255 characters");
    }
    if submission
        .name()
        .is_some_and(|name| name.chars().count() > MAX_NAME_LENGTH)
    {
        violations.push("Name must be less than 100 characters");
    }
    if submission
        .message()
        .is_some_and(|message| message.chars().count() > MAX_MESSAGE_LENGTH)
    {
        violations.push("Message must be less than 5000 characters");
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ContactError::Validation(violations))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sayone_domain::notification::{DispatchErrorKind, DispatchResult};

    use super::*;

    fn make_receipt(notification: NotificationOutcome, warnings: Vec<SubmissionWarning>) -> SubmissionReceipt {
        SubmissionReceipt {
            submission_id: SubmissionId::new(),
            notification,
            warnings,
        }
    }

    fn all_sent() -> NotificationOutcome {
        NotificationOutcome {
            user_result:  DispatchResult::sent("u"),
            admin_result: DispatchResult::sent("a"),
        }
    }

    #[test]
    fn 警告がなければwarning_messageはnone() {
        let receipt = make_receipt(all_sent(), vec![]);

        assert_eq!(receipt.warning_message(), None);
        assert_eq!(receipt.message(), SUCCESS_MESSAGE);
    }

    #[test]
    fn 警告文はセミコロンで連結される() {
        let receipt = make_receipt(
            NotificationOutcome {
                user_result:  DispatchResult::service_disabled(),
                admin_result: DispatchResult::failed(DispatchErrorKind::NotConfigured, "x"),
            },
            vec![
                SubmissionWarning::NotificationFailed,
                SubmissionWarning::WebhookFailed,
            ],
        );

        assert_eq!(
            receipt.warning_message().as_deref(),
            Some(
                "There was an issue sending email notifications; \
                 There was an issue forwarding to the workflow system"
            )
        );
    }

    #[rstest]
    #[case(Submission::new(None, "", None), vec!["Email is required"])]
    #[case(
        Submission::new(Some("a".repeat(101)), "a@example.com", None),
        vec!["Name must be less than 100 characters"]
    )]
    #[case(
        Submission::new(None, "a@example.com", Some("m".repeat(5001))),
        vec!["Message must be less than 5000 characters"]
    )]
    fn 制約を満たさない入力はvalidationエラー(
        #[case] submission: Submission,
        #[case] expected: Vec<&'static str>,
    ) {
        match validate(&submission) {
            Err(ContactError::Validation(violations)) => assert_eq!(violations, expected),
            other => panic!("Validation エラーを期待: {other:?}"),
        }
    }

    #[test]
    fn 上限ちょうどの入力は受け付ける() {
        let submission = Submission::new(
            Some("a".repeat(100)),
            "asha@example.com",
            Some("m".repeat(5000)),
        );

        assert!(validate(&submission).is_ok());
    }
}
