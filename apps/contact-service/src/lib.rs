//! # Contact Service ライブラリ
//!
//! お問い合わせ受付と通知メール送信のユースケースを公開する。
//! 統合テストから内部モジュールへアクセスできるようにする。

pub mod config;
pub mod usecase;
