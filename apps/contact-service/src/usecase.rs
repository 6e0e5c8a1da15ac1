//! # ユースケース層
//!
//! Contact Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ、Webhook、送信実装を `Arc<dyn Trait>` で外部から注入
//! - **通知はエラーを返さない**: 通知の失敗は結果値として呼び出し元へ渡す
//!
//! ## モジュール構成
//!
//! - `contact`: お問い合わせの受付と一覧
//! - `notification`: メッセージ組み立て、送信リトライ、ディスパッチャー

pub mod contact;
pub mod notification;

pub use contact::{ContactError, ContactUseCase, SubmissionReceipt, SubmissionWarning};
pub use notification::NotificationDispatcher;
