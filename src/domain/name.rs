//! 名字候选与逐字详解
//!
//! 两类数据：
//! - 模型契约（NameDetail / NameSummary / NameListResponse）：字段与提示词约定一致
//! - 会话内存储的 NameCandidate：在契约字段之上增加 id、锁定状态、风格等客户端字段

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 音韵分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneticQuality {
    /// 声调组合，如 仄平
    pub tone: String,
    /// 声母组合，如 mz
    pub initials: String,
    /// 音韵评分（0-100）
    pub score: f64,
    /// 音韵分析（中文）
    pub analysis: String,
}

/// 康熙字典记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KangxiRecord {
    /// 康熙字典笔画数
    pub strokes: u32,
    /// 康熙字典页码，如 第523页
    pub page: String,
    /// 康熙字典原文，格式：'【字】《说文》...'（50-120 字）
    pub original: String,
}

/// 字源演变
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Etymology {
    /// 甲骨文字形描述（20-40 字）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle: Option<String>,
    /// 金文字形描述（20-40 字）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bronze: Option<String>,
    /// 小篆字形描述（20-40 字）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seal: Option<String>,
    /// 字形演变简述（20-50 字）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<String>,
}

/// 单字详解
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDetail {
    /// 单个汉字
    #[serde(rename = "char")]
    pub character: String,
    /// 带声调拼音
    pub pinyin: String,
    /// 该字五行
    pub wuxing: String,
    /// 核心含义（10-20 字）
    pub meaning: String,
    /// 字形结构、文化内涵、经典用例（60-100 字）
    pub explanation: String,
    /// 具体出处，如 《诗经·大雅·文王》
    pub source: String,
    pub kangxi: KangxiRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etymology: Option<Etymology>,
}

/// 完整名字详情（精选名与按需详情共用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NameDetail {
    /// 名（不含姓氏）
    pub name: String,
    /// 空格分隔拼音，如 mù zé
    pub pinyin: String,
    /// 逐字详解（含康熙字典与字源）
    pub characters: Vec<CharacterDetail>,
    /// 整体寓意
    pub meaning: String,
    /// 典籍出处，如 《诗经·关雎》
    pub source: String,
    /// 名字五行，如 水木
    pub wuxing: String,
    /// 与八字喜用神的契合说明
    pub bazi_match: String,
    /// 综合评分（0-100）
    pub score: f64,
    /// 重名度：极低/低/较低/中/较高/高
    pub uniqueness: String,
    /// 估计重名人数，如 1000+
    pub uniqueness_count: String,
    pub yinyun: PhoneticQuality,
    /// 针对该宝宝的个性化寓意
    pub personalized_meaning: String,
    /// 以下为客户端字段，不出现在给模型的 schema 中
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub is_locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub series_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub style: Option<String>,
}

/// 摘要名字（不含逐字详解）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NameSummary {
    pub name: String,
    pub pinyin: String,
    pub meaning: String,
    pub source: String,
    pub wuxing: String,
    pub bazi_match: String,
    pub score: f64,
    pub uniqueness: String,
    pub uniqueness_count: String,
    pub yinyun: PhoneticQuality,
    pub personalized_meaning: String,
}

/// 取名第一步的响应：1 个精选（完整详情）+ 5 个摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NameListResponse {
    /// 首选推荐，必须包含完整逐字分析
    pub featured: NameDetail,
    /// 恰好 5 个仅含摘要字段的名字
    pub others: Vec<NameSummary>,
}

impl NameListResponse {
    pub const SUMMARY_COUNT: usize = 5;
}

/// 会话中保存的名字候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCandidate {
    pub id: String,
    pub name: String,
    pub pinyin: String,
    /// 摘要名在加载详情前为空
    #[serde(default)]
    pub characters: Vec<CharacterDetail>,
    pub meaning: String,
    pub source: String,
    pub wuxing: String,
    pub bazi_match: String,
    pub score: f64,
    pub uniqueness: String,
    pub uniqueness_count: String,
    pub yinyun: PhoneticQuality,
    pub personalized_meaning: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub has_full_detail: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
}

impl NameCandidate {
    /// 精选名：完整详情，永远免费
    pub fn featured(detail: NameDetail, id: String, last_name: &str, style: &str) -> Self {
        Self {
            id,
            name: detail.name,
            pinyin: detail.pinyin,
            characters: detail.characters,
            meaning: detail.meaning,
            source: detail.source,
            wuxing: detail.wuxing,
            bazi_match: detail.bazi_match,
            score: detail.score,
            uniqueness: detail.uniqueness,
            uniqueness_count: detail.uniqueness_count,
            yinyun: detail.yinyun,
            personalized_meaning: detail.personalized_meaning,
            last_name: last_name.to_string(),
            has_full_detail: true,
            is_locked: false,
            style: style.to_string(),
            series_id: detail.series_id,
        }
    }

    /// 摘要名：无逐字详解，是否锁定由解锁状态决定
    pub fn summary(
        summary: NameSummary,
        id: String,
        last_name: &str,
        style: &str,
        locked: bool,
    ) -> Self {
        Self {
            id,
            name: summary.name,
            pinyin: summary.pinyin,
            characters: Vec::new(),
            meaning: summary.meaning,
            source: summary.source,
            wuxing: summary.wuxing,
            bazi_match: summary.bazi_match,
            score: summary.score,
            uniqueness: summary.uniqueness,
            uniqueness_count: summary.uniqueness_count,
            yinyun: summary.yinyun,
            personalized_meaning: summary.personalized_meaning,
            last_name: last_name.to_string(),
            has_full_detail: false,
            is_locked: locked,
            style: style.to_string(),
            series_id: None,
        }
    }

    /// 姓 + 名
    pub fn full_name(&self) -> String {
        format!("{}{}", self.last_name, self.name)
    }

    pub fn has_complete_detail(&self) -> bool {
        self.has_full_detail && !self.characters.is_empty()
    }

    /// 合并按需加载的详情：逐字数据整体替换；寓意类文本仅在新值非空时覆盖；
    /// id、锁定状态、风格、姓氏等客户端字段保持不变。
    pub fn merge_detail(&mut self, detail: NameDetail) {
        self.characters = detail.characters;
        self.has_full_detail = true;
        overwrite_if_present(&mut self.meaning, detail.meaning);
        overwrite_if_present(&mut self.bazi_match, detail.bazi_match);
        overwrite_if_present(&mut self.personalized_meaning, detail.personalized_meaning);
    }
}

fn overwrite_if_present(field: &mut String, value: String) {
    if !value.trim().is_empty() {
        *field = value;
    }
}
