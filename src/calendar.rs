//! 历法辅助：时辰、公历日期中文格式

use chrono::{NaiveDate, NaiveTime, Timelike};

const SHICHEN: [&str; 12] = [
    "子时 (23:00-01:00)",
    "丑时 (01:00-03:00)",
    "寅时 (03:00-05:00)",
    "卯时 (05:00-07:00)",
    "辰时 (07:00-09:00)",
    "巳时 (09:00-11:00)",
    "午时 (11:00-13:00)",
    "未时 (13:00-15:00)",
    "申时 (15:00-17:00)",
    "酉时 (17:00-19:00)",
    "戌时 (19:00-21:00)",
    "亥时 (21:00-23:00)",
];

/// `HH:mm` → 十二时辰；空串或无法解析时返回 None
pub fn shichen(time: &str) -> Option<&'static str> {
    let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;
    let idx = ((parsed.hour() + 1) / 2) % 12;
    Some(SHICHEN[idx as usize])
}

/// `2024-03-15` → `2024年3月15日`；无法解析时原样返回
pub fn format_solar_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") {
        Ok(d) => d.format("%Y年%-m月%-d日").to_string(),
        Err(_) => date.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shichen_boundaries() {
        assert_eq!(shichen("23:00"), Some("子时 (23:00-01:00)"));
        assert_eq!(shichen("00:59"), Some("子时 (23:00-01:00)"));
        assert_eq!(shichen("01:00"), Some("丑时 (01:00-03:00)"));
        assert_eq!(shichen("08:30"), Some("辰时 (07:00-09:00)"));
        assert_eq!(shichen("12:00"), Some("午时 (11:00-13:00)"));
        assert_eq!(shichen("22:59"), Some("亥时 (21:00-23:00)"));
    }

    #[test]
    fn test_shichen_invalid() {
        assert_eq!(shichen(""), None);
        assert_eq!(shichen("25:00"), None);
        assert_eq!(shichen("noon"), None);
    }

    #[test]
    fn test_format_solar_date() {
        assert_eq!(format_solar_date("2024-03-15"), "2024年3月15日");
        assert_eq!(format_solar_date("2024-05-20"), "2024年5月20日");
        assert_eq!(format_solar_date("2024-13-01"), "2024-13-01");
    }
}
