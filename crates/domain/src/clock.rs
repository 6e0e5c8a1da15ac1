//! # Clock（時刻プロバイダ）
//!
//! 通知メールに埋め込む生成時刻を供給する。
//! テストでは [`FixedClock`] を注入し、同じ送信内容から同じメール本文が
//! 生成されることを検証できるようにする。

use chrono::{DateTime, TimeZone, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 実際のシステム時刻を返す実装
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻を返すテスト用実装
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// UTC の年月日時分秒から固定時刻を作る
    ///
    /// 存在しない日時を渡した場合は UNIX エポックにフォールバックする。
    pub fn at(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        let now = Utc
            .with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_system_clock_は現在時刻を返す() {
        let clock = SystemClock;
        let before = Utc::now();
        let result = clock.now();
        let after = Utc::now();

        assert!(result >= before);
        assert!(result <= after);
    }

    #[test]
    fn test_fixed_clock_は何度呼んでも同じ時刻を返す() {
        let clock = FixedClock::at(2025, 3, 14, 9, 30, 0);

        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().year(), 2025);
        assert_eq!(clock.now().hour(), 9);
    }

    #[test]
    fn test_fixed_clock_atは不正な日付でエポックを返す() {
        let clock = FixedClock::at(2025, 2, 30, 0, 0, 0);

        assert_eq!(clock.now(), DateTime::<Utc>::UNIX_EPOCH);
    }
}
