//! # 通知ディスパッチャー
//!
//! 起動時の設定検証と、お問い合わせ 1 件に対する 2 種類の通知の送信を統合する。
//!
//! ## 設計方針
//!
//! - **起動時に一度だけ判定**: SMTP 設定の欠落や接続確認の失敗があれば無効状態で構築し、
//!   以降の呼び出しはすべて `ServiceDisabled` を返す
//! - **エラーを返さない**: すべての失敗は [`DispatchResult`] に符号化する
//! - **独立した並行送信**: 受付確認と管理者アラートは `tokio::join!` で並行に送り、
//!   一方の失敗が他方に影響しない

use std::sync::Arc;

use sayone_domain::{
    clock::Clock,
    contact::Submission,
    email_address,
    notification::{DispatchErrorKind, DispatchResult, NotificationOutcome},
};
use sayone_infra::notification::{
    NoopNotificationSender,
    NotificationSender,
    SmtpNotificationSender,
};
use sayone_shared::{event_log::event, log_business_event};

use super::{
    NotificationRequest,
    RenderError,
    RetryPolicy,
    SiteIdentity,
    TemplateRenderer,
    send_with_retry,
};
use crate::config::{NotificationBackend, NotificationConfig};

/// ディスパッチャーの読み取り専用設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub site:         SiteIdentity,
    /// 管理者アラートを送るか
    pub admin_alerts: bool,
    pub retry:        RetryPolicy,
}

impl From<&NotificationConfig> for DispatchConfig {
    fn from(config: &NotificationConfig) -> Self {
        Self {
            site:         SiteIdentity {
                site_name:      config.site_name.clone(),
                site_url:       config.site_url.clone(),
                sender_address: config.from_address.clone(),
                admin_email:    config.admin_email.clone(),
            },
            admin_alerts: config.admin_alerts,
            retry:        RetryPolicy::new(config.max_attempts, config.attempt_timeout),
        }
    }
}

enum DispatcherState {
    Enabled {
        sender:   Arc<dyn NotificationSender>,
        renderer: TemplateRenderer,
    },
    Disabled {
        reason: String,
    },
}

/// 通知ディスパッチャー
///
/// 起動時に [`initialize`](Self::initialize) で構築し、`Arc` で共有する。
pub struct NotificationDispatcher {
    config: DispatchConfig,
    state:  DispatcherState,
}

impl NotificationDispatcher {
    /// 設定からディスパッチャーを構築する
    ///
    /// SMTP バックエンドでは必須項目（ホスト、ポート、ユーザー、パスワード）が
    /// 欠けていればトランスポートを作らずに無効状態になる。
    /// Noop バックエンドは SMTP 設定を必要としない。
    pub async fn initialize(config: &NotificationConfig, clock: Arc<dyn Clock>) -> Self {
        let dispatch_config = DispatchConfig::from(config);

        let sender: Arc<dyn NotificationSender> = match config.backend {
            NotificationBackend::Noop => Arc::new(NoopNotificationSender),
            NotificationBackend::Smtp => {
                let settings = match config.smtp_settings() {
                    Ok(settings) => settings,
                    Err(missing) => {
                        return Self::disabled(dispatch_config, missing_fields_reason(&missing));
                    }
                };
                match SmtpNotificationSender::new(&settings) {
                    Ok(sender) => Arc::new(sender),
                    Err(e) => return Self::disabled(dispatch_config, e.to_string()),
                }
            }
        };

        Self::probe_and_enable(dispatch_config, sender, clock).await
    }

    /// 任意の送信実装でディスパッチャーを構築する
    ///
    /// SMTP 必須項目の検証と接続確認は [`initialize`](Self::initialize) と同じ。
    /// 必須項目が欠けている場合は `sender` を一度も呼ばない。
    pub async fn initialize_with_sender(
        config: &NotificationConfig,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatch_config = DispatchConfig::from(config);

        let missing = config.missing_smtp_fields();
        if !missing.is_empty() {
            return Self::disabled(dispatch_config, missing_fields_reason(&missing));
        }

        Self::probe_and_enable(dispatch_config, sender, clock).await
    }

    async fn probe_and_enable(
        config: DispatchConfig,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timeout = config.retry.attempt_timeout();
        let probed = match tokio::time::timeout(timeout, sender.probe()).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("接続確認がタイムアウト: {timeout:?}")),
        };
        if let Err(reason) = probed {
            return Self::disabled(config, reason);
        }

        let renderer = match TemplateRenderer::new(clock) {
            Ok(renderer) => renderer,
            Err(e) => return Self::disabled(config, e.to_string()),
        };

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_ENABLED,
            event.result = event::result::SUCCESS,
            notification.from = %config.site.sender_address,
            notification.admin_alerts = config.admin_alerts,
            notification.max_attempts = config.retry.max_attempts(),
            "メール通知を有効化"
        );

        Self {
            config,
            state: DispatcherState::Enabled { sender, renderer },
        }
    }

    fn disabled(config: DispatchConfig, reason: String) -> Self {
        tracing::warn!(
            event.kind = "business_event",
            event.category = event::category::NOTIFICATION,
            event.action = event::action::NOTIFICATION_DISABLED,
            event.result = event::result::FAILURE,
            reason = %reason,
            "メール通知を無効化"
        );

        Self {
            config,
            state: DispatcherState::Disabled { reason },
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self.state, DispatcherState::Enabled { .. })
    }

    /// 無効化された理由（有効な場合は `None`）
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.state {
            DispatcherState::Enabled { .. } => None,
            DispatcherState::Disabled { reason } => Some(reason),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// 受付確認と管理者アラートを並行に送信する
    ///
    /// 常に両方の結果を返す。
    pub async fn notify_all(&self, submission: &Submission) -> NotificationOutcome {
        let (user_result, admin_result) = tokio::join!(
            self.dispatch(NotificationRequest::UserConfirmation(submission)),
            self.dispatch(NotificationRequest::AdminAlert(submission)),
        );

        NotificationOutcome {
            user_result,
            admin_result,
        }
    }

    /// 設定確認用のテストメールを管理者へ送信する
    pub async fn send_test_email(&self) -> DispatchResult {
        self.dispatch(NotificationRequest::TestEmail).await
    }

    async fn dispatch(&self, request: NotificationRequest<'_>) -> DispatchResult {
        let kind: &'static str = request.kind().into();

        let DispatcherState::Enabled { sender, renderer } = &self.state else {
            return skipped(kind, DispatchResult::service_disabled());
        };

        match request {
            NotificationRequest::UserConfirmation(submission)
                if !email_address::is_valid(submission.email()) =>
            {
                return skipped(
                    kind,
                    DispatchResult::failed(
                        DispatchErrorKind::InvalidRecipient,
                        format!("Invalid recipient email address: {}", submission.email()),
                    ),
                );
            }
            NotificationRequest::AdminAlert(_) if !self.config.admin_alerts => {
                return skipped(
                    kind,
                    DispatchResult::failed(
                        DispatchErrorKind::NotConfigured,
                        "Admin alerts are disabled",
                    ),
                );
            }
            _ => {}
        }

        let email = match renderer.render(request, &self.config.site) {
            Ok(email) => email,
            Err(RenderError::NotConfigured(detail)) => {
                return skipped(
                    kind,
                    DispatchResult::failed(DispatchErrorKind::NotConfigured, detail),
                );
            }
            Err(RenderError::Template(e)) => {
                tracing::error!(
                    error.category = sayone_shared::event_log::error::category::INFRASTRUCTURE,
                    error.kind = sayone_shared::event_log::error::kind::TEMPLATE,
                    error = %e,
                    notification.kind = kind,
                    "通知テンプレートのレンダリングに失敗"
                );
                return DispatchResult::failed(DispatchErrorKind::NotConfigured, e.to_string());
            }
        };

        let result = send_with_retry(sender.as_ref(), &email, &self.config.retry).await;

        if result.is_success() {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SENT,
                event.entity_type = event::entity_type::EMAIL,
                event.entity_id = result.message_id().unwrap_or_default(),
                event.result = event::result::SUCCESS,
                notification.kind = kind,
                notification.recipient = %email.to,
                "通知メール送信成功"
            );
        } else {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_FAILED,
                event.entity_type = event::entity_type::EMAIL,
                event.result = event::result::FAILURE,
                notification.kind = kind,
                notification.recipient = %email.to,
                error = result.detail().unwrap_or_default(),
                "通知メール送信失敗"
            );
        }

        result
    }
}

fn missing_fields_reason(missing: &[&str]) -> String {
    format!("SMTP 設定が不足しています: {}", missing.join(", "))
}

/// 送信を試みずに終わった結果を記録して返す
fn skipped(kind: &'static str, result: DispatchResult) -> DispatchResult {
    log_business_event!(
        event.category = event::category::NOTIFICATION,
        event.action = event::action::NOTIFICATION_SKIPPED,
        event.result = event::result::SKIPPED,
        notification.kind = kind,
        reason = result.detail().unwrap_or_default(),
        "通知メールの送信をスキップ"
    );
    result
}
