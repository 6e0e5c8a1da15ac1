//! # Contact Service CLI
//!
//! お問い合わせの受付、通知メール設定の確認、保存済みお問い合わせの一覧を行う。
//!
//! ## サブコマンド
//!
//! | コマンド | 説明 |
//! |---------|------|
//! | `check` | 通知メールの有効・無効と SMTP 設定（パスワードは伏せる）を表示 |
//! | `send-test` | 管理者アドレスへテストメールを送信 |
//! | `submit` | お問い合わせを受け付ける（保存、Webhook 転送、通知） |
//! | `list` | 保存済みのお問い合わせを新しい順に表示 |
//! | `migrate` | データベースマイグレーションを適用 |
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `SMTP_HOST` / `SMTP_PORT` / `SMTP_USER` / `SMTP_PASSWORD` | メール送信時 | 欠けていると通知は無効 |
//! | `SMTP_SECURE` | No | `true` なら暗黙 TLS、それ以外は STARTTLS |
//! | `ADMIN_EMAIL` | No | 管理者アラートの宛先（デフォルト: `SMTP_USER`） |
//! | `DATABASE_URL` | `submit` / `list` / `migrate` | PostgreSQL 接続 URL |
//! | `N8N_WEBHOOK_URL` | No | お問い合わせの転送先 |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! 結果は JSON で標準出力へ書き出す。ログは標準エラー出力へ出る。
//!
//! ```bash
//! contact-service check
//! contact-service submit --name Asha --email asha@example.com --message "Do you ship to Pune?"
//! ```

use std::{process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sayone_contact_service::{
    config::ContactConfig,
    usecase::{ContactUseCase, NotificationDispatcher, contact::SUCCESS_MESSAGE},
};
use sayone_domain::{clock::SystemClock, contact::Submission};
use sayone_infra::{
    db,
    repository::PostgresSubmissionRepository,
    webhook::{HttpWebhookForwarder, WebhookForwarder},
};
use sayone_shared::observability::{TracingConfig, init_tracing};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "contact-service", version, about = "お問い合わせ受付と通知メール送信")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 通知メール設定を確認する
    Check,
    /// テストメールを管理者へ送信する
    SendTest,
    /// お問い合わせを受け付ける
    Submit {
        #[arg(long)]
        name:    Option<String>,
        #[arg(long)]
        email:   String,
        #[arg(long)]
        message: Option<String>,
    },
    /// 保存済みのお問い合わせを一覧表示する
    List,
    /// データベースマイグレーションを適用する
    Migrate,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    enabled:         bool,
    disabled_reason: Option<&'a str>,
    config:          sayone_contact_service::config::ConfigSummary,
}

#[derive(Serialize)]
struct SubmitReport<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    receipt: &'a sayone_contact_service::usecase::SubmissionReceipt,
}

#[derive(Serialize)]
struct ListedSubmission<'a> {
    id:         String,
    name:       Option<&'a str>,
    email:      &'a str,
    message:    Option<&'a str>,
    created_at: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env());

    let cli = Cli::parse();
    let config = ContactConfig::from_env().context("設定の読み込みに失敗しました")?;

    match cli.command {
        Command::Check => {
            let dispatcher =
                NotificationDispatcher::initialize(&config.notification, Arc::new(SystemClock))
                    .await;
            print_json(&CheckReport {
                enabled:         dispatcher.is_enabled(),
                disabled_reason: dispatcher.disabled_reason(),
                config:          config.notification.summary(),
            })?;
            Ok(exit_code(dispatcher.is_enabled()))
        }
        Command::SendTest => {
            let dispatcher =
                NotificationDispatcher::initialize(&config.notification, Arc::new(SystemClock))
                    .await;
            let result = dispatcher.send_test_email().await;
            print_json(&result)?;
            Ok(exit_code(result.is_success()))
        }
        Command::Submit {
            name,
            email,
            message,
        } => {
            let usecase = build_contact_usecase(&config).await?;
            let receipt = usecase
                .submit(Submission::new(name, email, message))
                .await
                .context("お問い合わせの受付に失敗しました")?;
            print_json(&SubmitReport {
                success: true,
                message: SUCCESS_MESSAGE,
                warning: receipt.warning_message(),
                receipt: &receipt,
            })?;
            Ok(ExitCode::SUCCESS)
        }
        Command::List => {
            let usecase = build_contact_usecase(&config).await?;
            let stored = usecase
                .list_submissions()
                .await
                .context("お問い合わせの取得に失敗しました")?;
            let listed: Vec<_> = stored
                .iter()
                .map(|s| ListedSubmission {
                    id:         s.id.to_string(),
                    name:       s.submission.name(),
                    email:      s.submission.email(),
                    message:    s.submission.message(),
                    created_at: s.created_at.to_rfc3339(),
                })
                .collect();
            print_json(&listed)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Migrate => {
            let pool = db::create_pool(config.require_database_url()?)
                .await
                .context("データベース接続に失敗しました")?;
            db::run_migrations(&pool)
                .await
                .context("マイグレーションの適用に失敗しました")?;
            tracing::info!("マイグレーションを適用しました");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// 依存コンポーネントを組み立てて ContactUseCase を作成する
async fn build_contact_usecase(config: &ContactConfig) -> anyhow::Result<ContactUseCase> {
    let pool = db::create_pool(config.require_database_url()?)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    let webhook = match &config.webhook_url {
        Some(url) => {
            let forwarder = HttpWebhookForwarder::new(url.clone(), config.webhook_timeout)
                .context("Webhook クライアントの作成に失敗しました")?;
            Some(Arc::new(forwarder) as Arc<dyn WebhookForwarder>)
        }
        None => None,
    };

    let clock = Arc::new(SystemClock);
    let dispatcher = NotificationDispatcher::initialize(&config.notification, clock.clone()).await;

    Ok(ContactUseCase::new(
        Arc::new(PostgresSubmissionRepository::new(pool)),
        webhook,
        Arc::new(dispatcher),
        clock,
    ))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
