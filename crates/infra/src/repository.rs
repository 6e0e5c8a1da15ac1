//! # リポジトリ実装
//!
//! お問い合わせの永続化を担当するリポジトリを提供する。
//!
//! ## 設計方針
//!
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由でモック可能な設計

pub mod submission_repository;

pub use submission_repository::{PostgresSubmissionRepository, SubmissionRepository};
