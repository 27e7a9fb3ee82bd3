//! 解锁判断：某个风格系列是否已付费解锁

use serde::Serialize;

/// 全部解锁的哨兵值
pub const ALL_SERIES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockStatus {
    Unlocked,
    Locked,
}

/// 已解锁集合包含 `all` 或该系列时为 Unlocked
pub fn unlock_status<S: AsRef<str>>(unlocked: &[S], group: &str) -> UnlockStatus {
    let hit = unlocked
        .iter()
        .any(|s| s.as_ref() == ALL_SERIES || s.as_ref() == group);
    if hit {
        UnlockStatus::Unlocked
    } else {
        UnlockStatus::Locked
    }
}

pub fn is_unlocked<S: AsRef<str>>(unlocked: &[S], group: &str) -> bool {
    unlock_status(unlocked, group) == UnlockStatus::Unlocked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlock_status() {
        let none: [&str; 0] = [];
        assert_eq!(unlock_status(&none, "诗词雅韵"), UnlockStatus::Locked);
        assert!(is_unlocked(&["诗词雅韵"], "诗词雅韵"));
        assert!(!is_unlocked(&["山河气象"], "诗词雅韵"));
        assert!(is_unlocked(&[ALL_SERIES.to_string()], "任意风格"));
    }
}
