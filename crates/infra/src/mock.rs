//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリ実装。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! sayone-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sayone_domain::{
    contact::{StoredSubmission, Submission},
    notification::{EmailMessage, NotificationError, SentEmail},
};
use tokio::time::Instant;

use crate::{
    error::InfraError,
    notification::NotificationSender,
    repository::SubmissionRepository,
    webhook::WebhookForwarder,
};

// ===== MockNotificationSender =====

#[derive(Default)]
struct SenderState {
    /// send_email が呼ばれた時刻と宛先メッセージ（成功・失敗を問わない）
    attempts:        Vec<(Instant, EmailMessage)>,
    /// 送信に成功したメッセージ
    sent:            Vec<EmailMessage>,
    /// 残り何回失敗させるか
    fail_remaining:  usize,
    /// 常に失敗させるか
    always_fail:     bool,
    /// 失敗時のエラーメッセージ
    failure_message: String,
    /// この宛先への送信は常に失敗させる
    failing_to:      Vec<String>,
    /// 組み立て失敗（再送対象外）を返す
    invalid_message: Option<String>,
    /// send_email を完了させない（タイムアウト検証用）
    hang:            bool,
    /// probe の失敗メッセージ
    probe_failure:   Option<String>,
    probe_calls:     usize,
}

/// 送信を記録するモック NotificationSender
///
/// `Clone` は内部状態を共有する。テストでは clone をサービスに渡し、
/// 元のインスタンスで呼び出し履歴を検証する。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    state: Arc<Mutex<SenderState>>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次の `n` 回の送信を失敗させる
    pub fn fail_next(&self, n: usize, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.fail_remaining = n;
        state.failure_message = message.to_string();
    }

    /// すべての送信を失敗させる
    pub fn fail_always(&self, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.always_fail = true;
        state.failure_message = message.to_string();
    }

    /// 特定の宛先への送信だけを常に失敗させる
    pub fn fail_for_recipient(&self, to: &str, message: &str) {
        let mut state = self.state.lock().unwrap();
        state.failing_to.push(to.to_string());
        state.failure_message = message.to_string();
    }

    /// すべての送信を再送対象外の組み立て失敗にする
    pub fn reject_message(&self, message: &str) {
        self.state.lock().unwrap().invalid_message = Some(message.to_string());
    }

    /// 送信を完了させない
    pub fn hang(&self) {
        self.state.lock().unwrap().hang = true;
    }

    /// probe を失敗させる
    pub fn fail_probe(&self, message: &str) {
        self.state.lock().unwrap().probe_failure = Some(message.to_string());
    }

    /// send_email の呼び出し回数
    pub fn send_count(&self) -> usize {
        self.state.lock().unwrap().attempts.len()
    }

    /// 指定した宛先への send_email の呼び出し回数
    pub fn send_count_to(&self, to: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .filter(|(_, email)| email.to == to)
            .count()
    }

    /// send_email が呼ばれた時刻の一覧
    pub fn attempt_instants(&self) -> Vec<Instant> {
        self.state
            .lock()
            .unwrap()
            .attempts
            .iter()
            .map(|(at, _)| *at)
            .collect()
    }

    /// 送信に成功したメッセージの一覧
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    /// probe の呼び出し回数
    pub fn probe_count(&self) -> usize {
        self.state.lock().unwrap().probe_calls
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<SentEmail, NotificationError> {
        let (outcome, hang) = {
            let mut state = self.state.lock().unwrap();
            state.attempts.push((Instant::now(), email.clone()));

            let outcome = if state.hang {
                Ok(0)
            } else if let Some(message) = &state.invalid_message {
                Err(NotificationError::InvalidMessage(message.clone()))
            } else if state.always_fail || state.failing_to.contains(&email.to) {
                Err(NotificationError::SendFailed(state.failure_message.clone()))
            } else if state.fail_remaining > 0 {
                state.fail_remaining -= 1;
                Err(NotificationError::SendFailed(state.failure_message.clone()))
            } else {
                state.sent.push(email.clone());
                Ok(state.sent.len())
            };
            (outcome, state.hang)
        };

        if hang {
            std::future::pending::<()>().await;
        }

        outcome.map(|seq| SentEmail {
            message_id: format!("<mock-{seq}@example.com>"),
        })
    }

    async fn probe(&self) -> Result<(), NotificationError> {
        let mut state = self.state.lock().unwrap();
        state.probe_calls += 1;
        match &state.probe_failure {
            Some(message) => Err(NotificationError::ProbeFailed(message.clone())),
            None => Ok(()),
        }
    }
}

// ===== MockSubmissionRepository =====

#[derive(Clone, Default)]
pub struct MockSubmissionRepository {
    stored:  Arc<Mutex<Vec<StoredSubmission>>>,
    failing: bool,
}

impl MockSubmissionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// insert / find_all が常に失敗するリポジトリ
    pub fn failing() -> Self {
        Self {
            stored:  Arc::default(),
            failing: true,
        }
    }

    pub fn stored(&self) -> Vec<StoredSubmission> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionRepository for MockSubmissionRepository {
    async fn insert(&self, stored: &StoredSubmission) -> Result<(), InfraError> {
        if self.failing {
            return Err(InfraError::unexpected("データベースに接続できません"));
        }
        self.stored.lock().unwrap().push(stored.clone());
        Ok(())
    }

    async fn find_all(&self) -> Result<Vec<StoredSubmission>, InfraError> {
        if self.failing {
            return Err(InfraError::unexpected("データベースに接続できません"));
        }
        let mut all = self.stored.lock().unwrap().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }
}

// ===== MockWebhookForwarder =====

#[derive(Clone, Default)]
pub struct MockWebhookForwarder {
    forwarded:       Arc<Mutex<Vec<Submission>>>,
    rejected_status: Option<u16>,
}

impl MockWebhookForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常に指定したステータスで拒否する転送先
    pub fn rejecting(status: u16) -> Self {
        Self {
            forwarded:       Arc::default(),
            rejected_status: Some(status),
        }
    }

    pub fn forwarded(&self) -> Vec<Submission> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookForwarder for MockWebhookForwarder {
    async fn forward(&self, submission: &Submission) -> Result<(), InfraError> {
        if let Some(status) = self.rejected_status {
            return Err(InfraError::webhook_rejected(status));
        }
        self.forwarded.lock().unwrap().push(submission.clone());
        Ok(())
    }
}
