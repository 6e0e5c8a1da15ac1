//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで通知メールを HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **HTML のみエスケープ**: `.html` テンプレートは tera の autoescape 対象。
//!   plaintext には入力をそのまま埋め込む
//! - **決定的な出力**: 時刻は注入された [`Clock`] からのみ取得する。
//!   同じ送信内容と同じ時刻からは同じメールが生成される

use std::sync::Arc;

use sayone_domain::{
    clock::Clock,
    contact::{NO_MESSAGE_PROVIDED, NOT_PROVIDED, Submission},
    email_address,
    notification::{EmailMessage, MessageKind, NotificationError},
};
use tera::{Context, Tera};
use thiserror::Error;

/// サイトと送信元の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentity {
    /// サイト表示名（件名と送信者名に使う）
    pub site_name:      String,
    pub site_url:       String,
    /// 送信元メールアドレス
    pub sender_address: String,
    /// 管理者アラートとテストメールの宛先
    pub admin_email:    Option<String>,
}

impl SiteIdentity {
    /// 表示名付きの送信元（`"{表示名}" <{アドレス}>`）
    ///
    /// 表示名に含まれる `"` と `\` は取り除く。
    fn sender(&self, display_name: &str) -> String {
        let display_name: String = display_name
            .chars()
            .filter(|c| *c != '"' && *c != '\\')
            .collect();
        format!("\"{display_name}\" <{}>", self.sender_address)
    }

    /// 構文チェックを通る管理者アドレス
    fn valid_admin_email(&self) -> Option<&str> {
        self.admin_email
            .as_deref()
            .filter(|address| email_address::is_valid(address))
    }
}

/// レンダリング対象の通知
#[derive(Debug, Clone, Copy)]
pub enum NotificationRequest<'a> {
    /// 受付確認: 送信者へ
    UserConfirmation(&'a Submission),
    /// 管理者アラート: 管理者へ
    AdminAlert(&'a Submission),
    /// テストメール: 管理者へ
    TestEmail,
}

impl NotificationRequest<'_> {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::UserConfirmation(_) => MessageKind::UserConfirmation,
            Self::AdminAlert(_) => MessageKind::AdminAlert,
            Self::TestEmail => MessageKind::TestEmail,
        }
    }
}

/// メッセージ組み立てエラー
#[derive(Debug, Error)]
pub enum RenderError {
    /// この種別のメールを組み立てるための設定がない
    #[error("{0}")]
    NotConfigured(&'static str),

    /// テンプレートレンダリングに失敗
    #[error(transparent)]
    Template(#[from] NotificationError),
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、[`NotificationRequest`] から
/// [`EmailMessage`] を生成する。
pub struct TemplateRenderer {
    engine: Tera,
    clock:  Arc<dyn Clock>,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "user_confirmation.html",
                    include_str!("../../../templates/notifications/user_confirmation.html"),
                ),
                (
                    "user_confirmation.txt",
                    include_str!("../../../templates/notifications/user_confirmation.txt"),
                ),
                (
                    "admin_alert.html",
                    include_str!("../../../templates/notifications/admin_alert.html"),
                ),
                (
                    "admin_alert.txt",
                    include_str!("../../../templates/notifications/admin_alert.txt"),
                ),
                (
                    "test_email.html",
                    include_str!("../../../templates/notifications/test_email.html"),
                ),
                (
                    "test_email.txt",
                    include_str!("../../../templates/notifications/test_email.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine, clock })
    }

    /// 通知からメールメッセージを生成する
    pub fn render(
        &self,
        request: NotificationRequest<'_>,
        site: &SiteIdentity,
    ) -> Result<EmailMessage, RenderError> {
        let now = self.clock.now();

        let mut context = Context::new();
        context.insert("site_name", &site.site_name);
        context.insert("site_url", &site.site_url);
        context.insert("received_at", &now.format("%Y-%m-%d %H:%M:%S UTC").to_string());
        context.insert("year", &now.format("%Y").to_string());

        let (from, to, reply_to, subject) = match request {
            NotificationRequest::UserConfirmation(submission) => {
                insert_submission(&mut context, submission);
                (
                    site.sender(&site.site_name),
                    submission.email().to_string(),
                    None,
                    format!("Thank You for Contacting {}", site.site_name),
                )
            }
            NotificationRequest::AdminAlert(submission) => {
                let admin = site
                    .valid_admin_email()
                    .ok_or(RenderError::NotConfigured("No admin email configured"))?;
                insert_submission(&mut context, submission);
                (
                    site.sender(&format!("{} Contact Form", site.site_name)),
                    admin.to_string(),
                    Some(submission.email())
                        .filter(|address| email_address::is_valid(address))
                        .map(str::to_string),
                    format!(
                        "New Contact Form Submission from {}",
                        submission.name().unwrap_or("a visitor")
                    ),
                )
            }
            NotificationRequest::TestEmail => {
                let admin = site
                    .valid_admin_email()
                    .ok_or(RenderError::NotConfigured("No admin email configured"))?;
                (
                    site.sender(&format!("{} Test", site.site_name)),
                    admin.to_string(),
                    None,
                    format!("[{}] Test Email", site.site_name),
                )
            }
        };

        let template_name: &str = request.kind().into();
        let html_body = self.render_template(&format!("{template_name}.html"), &context)?;
        let text_body = self.render_template(&format!("{template_name}.txt"), &context)?;

        Ok(EmailMessage {
            from,
            to,
            reply_to,
            subject,
            html_body,
            text_body,
        })
    }

    fn render_template(&self, name: &str, context: &Context) -> Result<String, NotificationError> {
        self.engine
            .render(name, context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))
    }
}

/// 送信内容をテンプレートコンテキストに追加する
///
/// `message_html` は本文をエスケープしたうえで改行を `<br>` に置き換えたもの。
/// テンプレート側では `safe` フィルタで埋め込む。
fn insert_submission(context: &mut Context, submission: &Submission) {
    let email = Some(submission.email())
        .filter(|email| !email.trim().is_empty())
        .unwrap_or(NOT_PROVIDED);
    let message = submission.message().unwrap_or(NO_MESSAGE_PROVIDED);
    let message_html = tera::escape_html(message)
        .replace("\r\n", "<br>")
        .replace('\n', "<br>");

    context.insert("name", submission.name().unwrap_or(NOT_PROVIDED));
    context.insert("greeting_name", submission.display_name());
    context.insert("email", email);
    context.insert("message", message);
    context.insert("message_html", &message_html);
}
