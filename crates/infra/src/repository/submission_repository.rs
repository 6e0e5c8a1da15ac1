//! # SubmissionRepository
//!
//! お問い合わせ（contacts テーブル）の保存と一覧取得を担当するリポジトリ。
//!
//! 通知メールの送信結果はここには保存しない。保存の成否だけが
//! お問い合わせ受付全体の成否を決める。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sayone_domain::contact::{StoredSubmission, Submission, SubmissionId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::InfraError;

/// お問い合わせリポジトリトレイト
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// お問い合わせを保存する
    async fn insert(&self, stored: &StoredSubmission) -> Result<(), InfraError>;

    /// お問い合わせを新しい順にすべて取得する
    async fn find_all(&self) -> Result<Vec<StoredSubmission>, InfraError>;
}

/// contacts テーブルの行
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id:         Uuid,
    name:       Option<String>,
    email:      String,
    message:    Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ContactRow> for StoredSubmission {
    fn from(row: ContactRow) -> Self {
        Self {
            id:         SubmissionId::from_uuid(row.id),
            submission: Submission::new(row.name, row.email, row.message),
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL 実装の SubmissionRepository
#[derive(Debug, Clone)]
pub struct PostgresSubmissionRepository {
    pool: PgPool,
}

impl PostgresSubmissionRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionRepository for PostgresSubmissionRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(submission_id = %stored.id))]
    async fn insert(&self, stored: &StoredSubmission) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO contacts (id, name, email, message, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(stored.id.as_uuid())
        .bind(stored.submission.name())
        .bind(stored.submission.email())
        .bind(stored.submission.message())
        .bind(stored.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self) -> Result<Vec<StoredSubmission>, InfraError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, name, email, message, created_at
            FROM contacts
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredSubmission::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresSubmissionRepository>();
    }

    #[test]
    fn contact_rowから空の名前はnoneとして復元される() {
        let id = Uuid::now_v7();
        let row = ContactRow {
            id,
            name: Some(String::new()),
            email: "asha@example.com".to_string(),
            message: Some("Where do you ship?".to_string()),
            created_at: Utc::now(),
        };

        let stored = StoredSubmission::from(row);

        assert_eq!(stored.id.as_uuid(), &id);
        assert_eq!(stored.submission.name(), None);
        assert_eq!(stored.submission.message(), Some("Where do you ship?"));
    }
}
