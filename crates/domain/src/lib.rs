//! # SayOne ドメイン層
//!
//! お問い合わせフォームと通知メールのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **インフラ非依存**: SMTP、PostgreSQL、HTTP などの外部システムには依存しない
//! - **不変な入力**: [`contact::Submission`] は通知処理の間に変更されない
//! - **結果の型付け**: 通知の成否は例外ではなく [`notification::DispatchResult`] で表現する
//!
//! ## 依存関係の方向
//!
//! ```text
//! contact-service → infra → domain
//!        ↘                   ↑
//!          ──────────────────
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - 時刻プロバイダ（テストで固定時刻を注入する）
//! - [`contact`] - お問い合わせ送信内容
//! - [`email_address`] - メールアドレスの構文チェック
//! - [`notification`] - 通知メッセージ、送信結果、送信エラー
//!
//! ## 使用例
//!
//! ```rust
//! use sayone_domain::{contact::Submission, email_address};
//!
//! let submission = Submission::new(
//!     Some("Asha".to_string()),
//!     "asha@example.com",
//!     Some("Where do you ship?".to_string()),
//! );
//!
//! assert!(email_address::is_valid(submission.email()));
//! assert_eq!(submission.display_name(), "Asha");
//! ```

pub mod clock;
pub mod contact;
pub mod email_address;
pub mod notification;
