//! 提示词构建：八字分析、取名列表（1 精选 + 5 摘要）、单名详情
//!
//! 输出结构由 schemars 从响应类型生成，与校验使用同一组类型，避免提示词与解析脱节。

use crate::calendar::{format_solar_date, shichen};
use crate::domain::{BaziAnalysis, BirthInput, CalendarType, NameDetail, NameListResponse};
use crate::validation::response_schema_json;

/// 只输出 JSON 的通用约束
pub const JSON_INSTRUCTION: &str = "You must output valid JSON only. Do not include any markdown formatting (like ```json), comments, or extra text.";

const NAMING_MASTER: &str = "You are a professional Chinese Naming Master with deep knowledge of Shijing, Chuci, Tang Poems, Song Lyrics, and classical Chinese literature.";

/// 一次请求的 system + user 两段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

fn name_length_desc(len: u8) -> &'static str {
    match len {
        1 => "一个字（不含姓氏）",
        3 => "三个字（不含姓氏）",
        _ => "两个字（不含姓氏）",
    }
}

/// 出生时间描述：HH:mm 附时辰；未填写则为「不详」
fn birth_time_desc(info: &BirthInput) -> String {
    if !info.has_birth_time() {
        return "不详".to_string();
    }
    match shichen(&info.birth_time) {
        Some(period) => format!("{} {}", info.birth_time.trim(), period),
        None => info.birth_time.trim().to_string(),
    }
}

fn birth_date_desc(info: &BirthInput) -> String {
    match info.calendar_type {
        CalendarType::Solar => format!("公历 {}", format_solar_date(&info.birth_date)),
        CalendarType::Lunar => {
            let leap = if info.is_leap_month.unwrap_or(false) {
                "（闰月）"
            } else {
                ""
            };
            format!("农历 {}{}", info.birth_date.trim(), leap)
        }
    }
}

fn baby_info_block(info: &BirthInput) -> String {
    format!(
        "Baby Info:\nSurname: {}\nGender: {}\nBirth: {} {}\nBirth City: {}",
        info.last_name.trim(),
        info.gender.label_zh(),
        birth_date_desc(info),
        birth_time_desc(info),
        if info.birth_city.trim().is_empty() {
            "未知"
        } else {
            info.birth_city.trim()
        }
    )
}

/// 八字分析提示词
pub fn bazi_analysis_prompt(info: &BirthInput) -> PromptPair {
    let system = format!(
        "You are an expert in traditional Chinese Bazi (Four Pillars of Destiny) and Wuxing (Five Elements).\n{}\nYour task is to analyze the birth chart based on the provided birth information and recommend naming styles.",
        JSON_INSTRUCTION
    );

    let user = format!(
        "Please analyze the Bazi for a {} born on the following date.\n{}\n\n\
         Return a JSON object matching this JSON Schema:\n{}\n\n\
         Notes:\n\
         - wuxing counts are the number of each element among the 8 characters (0-8); values are strengths (0-100).\n\
         - For suggestedStyles: generate exactly 3 creative naming styles tailored to this baby's Bazi and xiyong elements. \
         Each style should be distinct in aesthetic. Choose colorTheme based on the style's mood.",
        info.gender.as_str(),
        baby_info_block(info),
        response_schema_json::<BaziAnalysis>()
    );

    PromptPair { system, user }
}

/// 取名列表提示词（1 个精选完整详情 + 5 个摘要）
pub fn name_list_prompt(info: &BirthInput, bazi_summary: &str, style: &str) -> PromptPair {
    let len = info.name_length();
    let total = NameListResponse::SUMMARY_COUNT + 1;

    let system = format!(
        "{}\n{}\nYou need to generate {} names for a {} based on their Bazi and the user's preference.\n\
         IMPORTANT: Each name must be exactly {} Chinese character(s) long (excluding surname). Do not generate names of other lengths.\n\
         The first (featured) name must include full character analysis. The remaining {} names only need summary information.",
        NAMING_MASTER,
        JSON_INSTRUCTION,
        total,
        info.gender.as_str(),
        len,
        NameListResponse::SUMMARY_COUNT
    );

    let user = format!(
        "{}\nBazi Summary: {}\nStyle Preference: {}\nRequired name length: {}\n\n\
         Generate {} unique Chinese names, each exactly {} character(s) (excluding surname).\n\
         Return a JSON object matching this JSON Schema:\n{}\n\n\
         IMPORTANT:\n\
         - \"featured\" must contain ONE name with COMPLETE character analysis including kangxi and etymology.\n\
         - \"others\" must contain exactly {} names with ONLY summary fields (no \"characters\" array).\n\
         - All names must be unique and distinct.",
        baby_info_block(info),
        bazi_summary,
        style,
        name_length_desc(len),
        total,
        len,
        response_schema_json::<NameListResponse>(),
        NameListResponse::SUMMARY_COUNT
    );

    PromptPair { system, user }
}

/// 单个名字的逐字详情提示词
pub fn name_detail_prompt(name: &str, info: &BirthInput, bazi_summary: &str) -> PromptPair {
    let system = format!(
        "You are a professional Chinese Naming Master with deep knowledge of classical Chinese literature, Kangxi Dictionary, and Chinese character etymology.\n{}\nGenerate detailed character analysis for the given name.",
        JSON_INSTRUCTION
    );

    let user = format!(
        "Name to analyze: {}\n{}\nBazi Summary: {}\n\n\
         This name was already recommended for this baby. Now provide the complete character-level analysis \
         (one entry in \"characters\" per character, with kangxi and etymology).\n\
         Return a JSON object matching this JSON Schema:\n{}",
        name,
        baby_info_block(info),
        bazi_summary,
        response_schema_json::<NameDetail>()
    );

    PromptPair { system, user }
}
