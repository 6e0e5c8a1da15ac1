//! # 通知ユースケース
//!
//! お問い合わせに伴うメール通知（送信者への受付確認、管理者へのアラート）を扱う。
//!
//! - [`TemplateRenderer`]: 送信内容からメールメッセージを組み立てる
//! - [`send_with_retry`]: 1 通のメールを指数バックオフ付きで送信する
//! - [`NotificationDispatcher`]: 起動時の設定検証と、2 種類の通知の並行送信

mod dispatcher;
mod retry;
mod template_renderer;

pub use dispatcher::{DispatchConfig, NotificationDispatcher};
pub use retry::{RetryPolicy, send_with_retry};
pub use template_renderer::{NotificationRequest, RenderError, SiteIdentity, TemplateRenderer};
