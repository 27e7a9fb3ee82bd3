//! 领域模型：出生信息、八字分析、名字候选、会话与订单

pub mod bazi;
pub mod birth;
pub mod name;
pub mod order;
pub mod session;

pub use bazi::{BaziAnalysis, ColorTheme, FourPillars, StyleSuggestion, WuxingTally};
pub use birth::{BirthInput, CalendarType, Gender, InputError};
pub use name::{
    CharacterDetail, Etymology, KangxiRecord, NameCandidate, NameDetail, NameListResponse,
    NameSummary, PhoneticQuality,
};
pub use order::{Order, OrderStatus};
pub use session::{Session, SessionPatch};

/// 当前毫秒时间戳
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
