//! SubmissionRepository 統合テスト
//!
//! データベースを使用したテスト。sqlx::test マクロを使用して、
//! テストごとに専用のデータベースを作成しマイグレーションを適用する。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p sayone-infra --test submission_repository_test
//! ```

use chrono::{Duration, TimeZone, Utc};
use sayone_domain::contact::{StoredSubmission, Submission, SubmissionId};
use sayone_infra::repository::{PostgresSubmissionRepository, SubmissionRepository};
use sqlx::PgPool;

fn make_stored(name: Option<&str>, email: &str, minutes: i64) -> StoredSubmission {
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
    StoredSubmission {
        id:         SubmissionId::new(),
        submission: Submission::new(
            name.map(str::to_string),
            email,
            Some("Do you ship to Pune?".to_string()),
        ),
        created_at: base + Duration::minutes(minutes),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_お問い合わせを保存して取得できる(pool: PgPool) {
    let sut = PostgresSubmissionRepository::new(pool);
    let stored = make_stored(Some("Asha"), "asha@example.com", 0);

    sut.insert(&stored).await.unwrap();
    let all = sut.find_all().await.unwrap();

    assert_eq!(all, vec![stored]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_未入力の名前と本文はnullとして保存される(pool: PgPool) {
    let sut = PostgresSubmissionRepository::new(pool.clone());
    let stored = StoredSubmission {
        id:         SubmissionId::new(),
        submission: Submission::new(None, "anon@example.com", None),
        created_at: Utc::now(),
    };

    sut.insert(&stored).await.unwrap();

    let (name, message): (Option<String>, Option<String>) =
        sqlx::query_as("SELECT name, message FROM contacts WHERE id = $1")
            .bind(stored.id.as_uuid())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(name, None);
    assert_eq!(message, None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_一覧は新しい順に返る(pool: PgPool) {
    let sut = PostgresSubmissionRepository::new(pool);
    let oldest = make_stored(Some("Asha"), "asha@example.com", 0);
    let newest = make_stored(Some("Ravi"), "ravi@example.com", 30);
    let middle = make_stored(None, "anon@example.com", 10);

    for stored in [&oldest, &newest, &middle] {
        sut.insert(stored).await.unwrap();
    }
    let all = sut.find_all().await.unwrap();

    let ids: Vec<_> = all.into_iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_同じidは二重に保存できない(pool: PgPool) {
    let sut = PostgresSubmissionRepository::new(pool);
    let stored = make_stored(Some("Asha"), "asha@example.com", 0);

    sut.insert(&stored).await.unwrap();
    let result = sut.insert(&stored).await;

    assert!(result.is_err());
}
