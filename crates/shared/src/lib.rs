//! # SayOne 共有ユーティリティ
//!
//! ワークスペース全体で使用する共通ユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - 他のすべてのクレートから依存される
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//!
//! ## モジュール構成
//!
//! - [`event_log`] - ビジネスイベントログの構造化ヘルパー
//! - [`observability`] - トレーシング初期化

pub mod event_log;
pub mod observability;
