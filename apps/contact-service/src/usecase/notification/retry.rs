//! # 送信リトライ
//!
//! 1 通のメールを指数バックオフ付きで送信する。
//!
//! 試行ごとに制限時間を設け、失敗したら `2^attempt` 秒待って再送する
//! （1 回目の失敗後 2 秒、2 回目の失敗後 4 秒、...）。
//! 待機は `tokio::time::sleep` で行い、ワーカースレッドをブロックしない。
//! メッセージの組み立て失敗のように再送しても変わらないエラーは即座に打ち切る。

use std::time::Duration;

use sayone_domain::notification::{
    DispatchErrorKind,
    DispatchResult,
    EmailMessage,
    NotificationError,
};
use sayone_infra::notification::NotificationSender;

/// 既定の最大試行回数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// 既定の 1 試行あたりの制限時間
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// リトライポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts:    u32,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// `max_attempts` が 1 未満の場合は 1 に切り上げる
    pub fn new(max_attempts: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            attempt_timeout,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// `attempt` 回目の失敗後の待機時間（`2^attempt` 秒）
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        BACKOFF_BASE.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_ATTEMPT_TIMEOUT)
    }
}

/// メールを送信し、失敗したらリトライする
///
/// 成功すればメッセージ ID を持つ結果を返す。すべての試行が失敗した場合は
/// 最後のエラーを詳細に持つ `TransportFailure` を返す。エラーは返さない。
#[tracing::instrument(
    skip_all,
    level = "debug",
    fields(to = %email.to, max_attempts = policy.max_attempts())
)]
pub async fn send_with_retry(
    sender: &dyn NotificationSender,
    email: &EmailMessage,
    policy: &RetryPolicy,
) -> DispatchResult {
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts() {
        let result = tokio::time::timeout(policy.attempt_timeout(), sender.send_email(email))
            .await
            .unwrap_or_else(|_| Err(NotificationError::Timeout(policy.attempt_timeout())));

        match result {
            Ok(sent) => {
                tracing::debug!(attempt, message_id = %sent.message_id, "メール送信成功");
                return DispatchResult::sent(sent.message_id);
            }
            Err(e) if !e.is_retryable() => {
                tracing::warn!(
                    error.category = sayone_shared::event_log::error::category::EXTERNAL_SERVICE,
                    error.kind = sayone_shared::event_log::error::kind::SMTP,
                    attempt,
                    error = %e,
                    "再送できないエラーのため送信を打ち切る"
                );
                return DispatchResult::failed(DispatchErrorKind::TransportFailure, e.to_string());
            }
            Err(e) => {
                tracing::warn!(
                    error.category = sayone_shared::event_log::error::category::EXTERNAL_SERVICE,
                    error.kind = sayone_shared::event_log::error::kind::SMTP,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    error = %e,
                    "メール送信に失敗"
                );
                last_error = Some(e);
            }
        }

        if attempt < policy.max_attempts() {
            tokio::time::sleep(policy.backoff_delay(attempt)).await;
        }
    }

    let detail = last_error.map_or_else(|| "送信を試行していません".to_string(), |e| e.to_string());
    DispatchResult::failed(DispatchErrorKind::TransportFailure, detail)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use sayone_infra::mock::MockNotificationSender;

    use super::*;

    fn make_email() -> EmailMessage {
        EmailMessage {
            from:      r#""SayOne Ventures" <noreply@sayoneventures.com>"#.to_string(),
            to:        "asha@example.com".to_string(),
            reply_to:  None,
            subject:   "Thank You for Contacting SayOne Ventures".to_string(),
            html_body: "<p>Dear Asha,</p>".to_string(),
            text_body: "Dear Asha,".to_string(),
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_secs(10))
    }

    #[rstest]
    #[case(1, 2)]
    #[case(2, 4)]
    #[case(3, 8)]
    #[case(4, 16)]
    fn backoff_delayは2のattempt乗秒(#[case] attempt: u32, #[case] expected_secs: u64) {
        assert_eq!(
            RetryPolicy::default().backoff_delay(attempt),
            Duration::from_secs(expected_secs)
        );
    }

    #[test]
    fn backoff_delayは桁あふれしない() {
        assert!(RetryPolicy::default().backoff_delay(200) > Duration::from_secs(1 << 30));
    }

    #[test]
    fn max_attemptsの既定値は2で0は1に切り上げる() {
        assert_eq!(RetryPolicy::default().max_attempts(), 2);
        assert_eq!(policy(0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn 初回で成功すればリトライしない() {
        let sender = MockNotificationSender::new();

        let result = send_with_retry(&sender, &make_email(), &policy(3)).await;

        assert!(result.is_success());
        assert_eq!(result.message_id(), Some("<mock-1@example.com>"));
        assert_eq!(sender.send_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn n回目で成功し待機は2秒_4秒になる() {
        let sender = MockNotificationSender::new();
        sender.fail_next(2, "connection reset");

        let result = send_with_retry(&sender, &make_email(), &policy(3)).await;

        assert!(result.is_success());
        assert_eq!(sender.send_count(), 3);

        let instants = sender.attempt_instants();
        let tolerance = Duration::from_millis(100);
        let first_gap = instants[1] - instants[0];
        let second_gap = instants[2] - instants[1];
        assert!(first_gap >= Duration::from_secs(2) && first_gap < Duration::from_secs(2) + tolerance);
        assert!(second_gap >= Duration::from_secs(4) && second_gap < Duration::from_secs(4) + tolerance);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(4)]
    #[tokio::test(start_paused = true)]
    async fn すべて失敗するとmax_attempts回でtransport_failureになる(#[case] max_attempts: u32) {
        let sender = MockNotificationSender::new();
        sender.fail_always("550 mailbox unavailable");

        let result = send_with_retry(&sender, &make_email(), &policy(max_attempts)).await;

        assert!(!result.is_success());
        assert_eq!(
            result.error_kind(),
            Some(DispatchErrorKind::TransportFailure)
        );
        assert!(
            result
                .detail()
                .is_some_and(|detail| detail.contains("550 mailbox unavailable"))
        );
        assert_eq!(sender.send_count(), max_attempts as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn max_attemptsが1なら待機しない() {
        let sender = MockNotificationSender::new();
        sender.fail_always("connection refused");
        let started = tokio::time::Instant::now();

        let result = send_with_retry(&sender, &make_email(), &policy(1)).await;

        assert!(!result.is_success());
        assert_eq!(sender.send_count(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn 組み立て失敗は再送せずに打ち切る() {
        let sender = MockNotificationSender::new();
        sender.reject_message("宛先アドレス不正: Invalid input");
        let started = tokio::time::Instant::now();

        let result = send_with_retry(&sender, &make_email(), &policy(3)).await;

        assert_eq!(
            result.error_kind(),
            Some(DispatchErrorKind::TransportFailure)
        );
        assert!(
            result
                .detail()
                .is_some_and(|detail| detail.contains("宛先アドレス不正"))
        );
        assert_eq!(sender.send_count(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn 応答がなければ試行ごとにタイムアウトする() {
        let sender = MockNotificationSender::new();
        sender.hang();
        let started = tokio::time::Instant::now();

        let result = send_with_retry(
            &sender,
            &make_email(),
            &RetryPolicy::new(2, Duration::from_secs(5)),
        )
        .await;

        assert_eq!(
            result.error_kind(),
            Some(DispatchErrorKind::TransportFailure)
        );
        assert_eq!(sender.send_count(), 2);
        // 5 秒 + 待機 2 秒 + 5 秒
        assert!(started.elapsed() >= Duration::from_secs(12));
        assert!(
            result
                .detail()
                .is_some_and(|detail| detail.contains("タイムアウト"))
        );
    }
}
