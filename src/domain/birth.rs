//! 出生信息：用户一次性录入，创建会话后不再修改

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 性别（序列化为 boy / girl）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Boy => "boy",
            Gender::Girl => "girl",
        }
    }

    pub fn label_zh(&self) -> &'static str {
        match self {
            Gender::Boy => "男",
            Gender::Girl => "女",
        }
    }
}

/// 历法：公历 / 农历
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarType {
    Solar,
    Lunar,
}

/// 出生信息校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("姓氏不能为空")]
    EmptySurname,

    #[error("出生日期格式错误（应为 YYYY-MM-DD）: {0}")]
    InvalidDate(String),

    #[error("出生时间格式错误（应为 HH:mm）: {0}")]
    InvalidTime(String),

    #[error("名字字数必须为 1-3，实际为 {0}")]
    InvalidNameLength(u8),
}

/// 宝宝出生信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthInput {
    pub last_name: String,
    pub gender: Gender,
    /// YYYY-MM-DD
    pub birth_date: String,
    /// HH:mm，可为空（时辰不详）
    #[serde(default)]
    pub birth_time: String,
    #[serde(default)]
    pub birth_city: String,
    pub calendar_type: CalendarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_leap_month: Option<bool>,
    /// 名字字数（不含姓氏），缺省为 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_length: Option<u8>,
}

impl BirthInput {
    pub const DEFAULT_NAME_LENGTH: u8 = 2;

    pub fn name_length(&self) -> u8 {
        self.name_length.unwrap_or(Self::DEFAULT_NAME_LENGTH)
    }

    pub fn has_birth_time(&self) -> bool {
        !self.birth_time.trim().is_empty()
    }

    /// 表单提交时的校验；通过后才会创建会话
    pub fn validate(&self) -> Result<(), InputError> {
        if self.last_name.trim().is_empty() {
            return Err(InputError::EmptySurname);
        }
        NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d")
            .map_err(|_| InputError::InvalidDate(self.birth_date.clone()))?;
        if self.has_birth_time() {
            NaiveTime::parse_from_str(self.birth_time.trim(), "%H:%M")
                .map_err(|_| InputError::InvalidTime(self.birth_time.clone()))?;
        }
        let len = self.name_length();
        if !(1..=3).contains(&len) {
            return Err(InputError::InvalidNameLength(len));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BirthInput {
        BirthInput {
            last_name: "王".to_string(),
            gender: Gender::Boy,
            birth_date: "2024-05-20".to_string(),
            birth_time: "08:00".to_string(),
            birth_city: "上海".to_string(),
            calendar_type: CalendarType::Solar,
            is_leap_month: None,
            name_length: Some(2),
        }
    }

    #[test]
    fn test_valid_input() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_empty_time_is_allowed() {
        let mut info = sample();
        info.birth_time = String::new();
        assert!(info.validate().is_ok());
        assert!(!info.has_birth_time());
    }

    #[test]
    fn test_rejects_bad_fields() {
        let mut info = sample();
        info.last_name = "  ".to_string();
        assert_eq!(info.validate(), Err(InputError::EmptySurname));

        let mut info = sample();
        info.birth_date = "2024/05/20".to_string();
        assert!(matches!(info.validate(), Err(InputError::InvalidDate(_))));

        let mut info = sample();
        info.birth_time = "25:00".to_string();
        assert!(matches!(info.validate(), Err(InputError::InvalidTime(_))));

        let mut info = sample();
        info.name_length = Some(4);
        assert_eq!(info.validate(), Err(InputError::InvalidNameLength(4)));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["lastName"], "王");
        assert_eq!(json["gender"], "boy");
        assert_eq!(json["calendarType"], "solar");
        assert_eq!(json["nameLength"], 2);
        assert!(json.get("isLeapMonth").is_none());
    }
}
