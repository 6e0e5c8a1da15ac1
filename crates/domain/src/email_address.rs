//! # メールアドレスの構文チェック
//!
//! `local@domain.tld` の形をしているかだけを確認する。
//! RFC 5322 の完全な検証は行わない。明らかに不正な入力をネットワーク往復の前に
//! 弾くためのもので、到達可能性は保証しない。

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("メールアドレスの正規表現が不正")
});

/// メールアドレスとして送信を試みてよい形式かを判定する
pub fn is_valid(address: &str) -> bool {
    EMAIL_PATTERN.is_match(address)
}
