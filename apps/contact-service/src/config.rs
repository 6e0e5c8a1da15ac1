//! # Contact Service 設定
//!
//! 環境変数からお問い合わせ受付と通知メールの設定を読み込む。
//!
//! 読み込みは `lookup` 関数経由で行い、テストでは環境変数の代わりに
//! マップを渡す。空文字列の値は未設定として扱う。
//!
//! SMTP 関連の値が欠けていても [`ConfigError`] にはしない。通知が無効化されるだけで、
//! お問い合わせの受付自体は継続する。

use std::{env, str::FromStr, time::Duration};

use sayone_infra::notification::SmtpSettings;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// 既定のサイト表示名
pub const DEFAULT_SITE_NAME: &str = "SayOne Ventures";
/// 既定のサイト URL
pub const DEFAULT_SITE_URL: &str = "https://www.sayoneventures.com";
/// SMTP_USER も NOTIFICATION_FROM_ADDRESS も未設定の場合の送信元
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@sayoneventures.com";

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値の形式が不正
    #[error("{key} の値が不正です: {value:?}")]
    Invalid {
        key:   &'static str,
        value: String,
    },
}

/// Contact Service 全体の設定
#[derive(Debug, Clone)]
pub struct ContactConfig {
    /// データベース接続 URL（保存を伴うコマンドでのみ必須）
    pub database_url:    Option<String>,
    /// Webhook 転送先（未設定なら転送しない）
    pub webhook_url:     Option<Url>,
    /// Webhook 転送のタイムアウト
    pub webhook_timeout: Duration,
    /// 通知設定
    pub notification:    NotificationConfig,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::EnumString, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NotificationBackend {
    /// SMTP サーバー経由で送信
    #[default]
    Smtp,
    /// 送信しない（ログ出力のみ）
    Noop,
}

/// 通知機能の設定
///
/// `SMTP_HOST` / `SMTP_PORT` / `SMTP_USER` / `SMTP_PASSWORD` がすべて揃った場合のみ
/// 通知を有効化できる。
#[derive(Clone)]
pub struct NotificationConfig {
    pub backend:         NotificationBackend,
    pub smtp_host:       Option<String>,
    /// 数値として解釈できない場合も `None`（未設定扱い）
    pub smtp_port:       Option<u16>,
    pub smtp_secure:     bool,
    pub smtp_user:       Option<String>,
    pub smtp_password:   Option<String>,
    /// 送信元メールアドレス
    pub from_address:    String,
    /// サイト表示名（件名と送信者名に使う）
    pub site_name:       String,
    pub site_url:        String,
    /// 管理者アラートの宛先
    pub admin_email:     Option<String>,
    /// 管理者アラートを送るか
    pub admin_alerts:    bool,
    /// 1 通あたりの最大送信試行回数
    pub max_attempts:    u32,
    /// 1 回の送信試行のタイムアウト
    pub attempt_timeout: Duration,
}

/// `check` コマンドで表示する設定の要約（パスワードは伏せる）
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub backend:         NotificationBackend,
    pub smtp_host:       Option<String>,
    pub smtp_port:       Option<u16>,
    pub smtp_secure:     bool,
    pub smtp_user:       Option<String>,
    pub smtp_password:   Option<&'static str>,
    pub from_address:    String,
    pub admin_email:     Option<String>,
    pub missing_fields:  Vec<&'static str>,
}

impl ContactConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意の lookup 関数から設定を読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let webhook_url = get("N8N_WEBHOOK_URL")
            .map(|value| {
                Url::parse(&value).map_err(|_| ConfigError::Invalid {
                    key: "N8N_WEBHOOK_URL",
                    value,
                })
            })
            .transpose()?;

        Ok(Self {
            database_url: get("DATABASE_URL"),
            webhook_url,
            webhook_timeout: parse_timeout(&get, "WEBHOOK_TIMEOUT_SECS", 10)?,
            notification: NotificationConfig::from_lookup(&get)?,
        })
    }

    /// データベース接続 URL を取得する（未設定ならエラー）
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

impl NotificationConfig {
    fn from_lookup(get: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let smtp_user = get("SMTP_USER");

        let backend = match get("NOTIFICATION_BACKEND") {
            Some(value) => NotificationBackend::from_str(&value).map_err(|_| {
                ConfigError::Invalid {
                    key: "NOTIFICATION_BACKEND",
                    value,
                }
            })?,
            None => NotificationBackend::default(),
        };

        Ok(Self {
            backend,
            smtp_host: get("SMTP_HOST"),
            smtp_port: get("SMTP_PORT").and_then(|v| v.trim().parse().ok()),
            smtp_secure: parse_bool(get, "SMTP_SECURE", false)?,
            from_address: get("NOTIFICATION_FROM_ADDRESS")
                .or_else(|| smtp_user.clone())
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            site_name: get("SITE_NAME").unwrap_or_else(|| DEFAULT_SITE_NAME.to_string()),
            site_url: get("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            admin_email: get("ADMIN_EMAIL").or_else(|| smtp_user.clone()),
            admin_alerts: parse_bool(get, "NOTIFICATION_ADMIN_ALERTS", true)?,
            max_attempts: parse_or(get, "NOTIFICATION_MAX_ATTEMPTS", 2)?,
            attempt_timeout: parse_timeout(get, "NOTIFICATION_TIMEOUT_SECS", 10)?,
            smtp_password: get("SMTP_PASSWORD"),
            smtp_user,
        })
    }

    /// 通知の有効化に必要なのに欠けている環境変数名
    pub fn missing_smtp_fields(&self) -> Vec<&'static str> {
        [
            ("SMTP_HOST", self.smtp_host.is_none()),
            ("SMTP_PORT", self.smtp_port.is_none()),
            ("SMTP_USER", self.smtp_user.is_none()),
            ("SMTP_PASSWORD", self.smtp_password.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, missing)| missing.then_some(key))
        .collect()
    }

    /// SMTP 接続設定を組み立てる
    ///
    /// 必須項目が欠けている場合は欠けている環境変数名を返す。
    pub fn smtp_settings(&self) -> Result<SmtpSettings, Vec<&'static str>> {
        match (
            &self.smtp_host,
            self.smtp_port,
            &self.smtp_user,
            &self.smtp_password,
        ) {
            (Some(host), Some(port), Some(username), Some(password)) => Ok(SmtpSettings {
                host: host.clone(),
                port,
                secure: self.smtp_secure,
                username: username.clone(),
                password: password.clone(),
                timeout: self.attempt_timeout,
            }),
            _ => Err(self.missing_smtp_fields()),
        }
    }

    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            backend:        self.backend,
            smtp_host:      self.smtp_host.clone(),
            smtp_port:      self.smtp_port,
            smtp_secure:    self.smtp_secure,
            smtp_user:      self.smtp_user.clone(),
            smtp_password:  self.smtp_password.as_ref().map(|_| "*****"),
            from_address:   self.from_address.clone(),
            admin_email:    self.admin_email.clone(),
            missing_fields: self.missing_smtp_fields(),
        }
    }
}

impl std::fmt::Debug for NotificationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationConfig")
            .field("summary", &self.summary())
            .field("site_name", &self.site_name)
            .field("admin_alerts", &self.admin_alerts)
            .field("max_attempts", &self.max_attempts)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// 秒数を読み込む。0 秒は即座にタイムアウトするので不正値とする
fn parse_timeout(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    match parse_or(get, key, default_secs)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: get(key).unwrap_or_default(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match get(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value }),
        },
        None => Ok(default),
    }
}
