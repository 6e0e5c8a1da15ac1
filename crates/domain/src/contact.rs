//! # お問い合わせ
//!
//! お問い合わせフォームから送信された内容を表現する。
//!
//! ## 設計方針
//!
//! - **空文字列の正規化**: 名前・本文は空白のみの場合も「未入力」として扱う
//! - **不変**: 通知処理は [`Submission`] を参照するだけで変更しない
//! - **永続化との分離**: 保存済みの送信内容は [`StoredSubmission`] として区別する

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 名前が未入力の場合の宛名
pub const FALLBACK_GREETING_NAME: &str = "Valued Customer";

/// 項目が未入力の場合の表示ラベル
pub const NOT_PROVIDED: &str = "Not provided";

/// 本文が未入力の場合のプレースホルダー
pub const NO_MESSAGE_PROVIDED: &str = "No message provided";

/// お問い合わせ ID（一意識別子）
///
/// contacts テーブルの主キー。UUID v7 を使用し、生成順にソート可能。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    /// 新しい ID を生成する（UUID v7）
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// 既存の UUID から ID を作成する
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 内部の UUID 参照を取得する
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

/// お問い合わせ送信内容
///
/// Webhook へはこの構造体をそのまま JSON として転送する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    name:    Option<String>,
    email:   String,
    message: Option<String>,
}

impl Submission {
    /// 送信内容を作成する
    ///
    /// 空文字列・空白のみの名前と本文は `None` に正規化する。
    /// メールアドレスは検証せずに保持する（検証は送信直前に行う）。
    pub fn new(name: Option<String>, email: impl Into<String>, message: Option<String>) -> Self {
        Self {
            name:    name.filter(|s| !s.trim().is_empty()),
            email:   email.into(),
            message: message.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// 宛名として表示する名前（未入力なら "Valued Customer"）
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(FALLBACK_GREETING_NAME)
    }
}

/// 保存済みのお問い合わせ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSubmission {
    pub id:         SubmissionId,
    pub submission: Submission,
    pub created_at: DateTime<Utc>,
}
