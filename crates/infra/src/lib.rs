//! # SayOne インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! 外部システム（SMTP サーバー、PostgreSQL、Webhook 受信先）の詳細を
//! トレイトの裏側にカプセル化し、ユースケース層をインフラの変更から保護する。
//!
//! ## 責務
//!
//! - **メール送信**: SMTP / Noop の送信実装
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: お問い合わせの保存と一覧取得
//! - **Webhook 転送**: お問い合わせ内容を外部ワークフローへ POST する
//!
//! ## 依存関係
//!
//! ```text
//! contact-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信トレイトと実装
//! - [`repository`] - リポジトリ実装
//! - [`webhook`] - Webhook 転送
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;
pub mod webhook;

pub use error::InfraError;
