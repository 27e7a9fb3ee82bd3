//! 八字分析结果（模型返回的 JSON 契约）
//!
//! 字段名与提示词中约定的结构逐一对应；字段上的文档注释会经 schemars 生成为 JSON Schema 的 description，
//! 注入提示词指导模型输出。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 四柱：天干地支、五行、藏干、纳音、本命生肖
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FourPillars {
    /// 年柱，如 丙午
    pub year_pillar: String,
    /// 月柱
    pub month_pillar: String,
    /// 日柱
    pub day_pillar: String,
    /// 时柱
    pub hour_pillar: String,
    /// 年柱五行，如 火
    pub year_wuxing: String,
    pub month_wuxing: String,
    pub day_wuxing: String,
    pub hour_wuxing: String,
    /// 年柱藏干，如 己丁
    pub year_canggan: String,
    pub month_canggan: String,
    pub day_canggan: String,
    pub hour_canggan: String,
    /// 年柱纳音，如 炉中火
    pub year_nayin: String,
    pub month_nayin: String,
    pub day_nayin: String,
    pub hour_nayin: String,
    /// 本命生肖，如 龙
    pub benming: String,
}

/// 五行统计：八字中各元素个数、强度、喜忌与日主旺衰
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WuxingTally {
    /// 金在八个干支位中的个数（0-8）
    pub gold: u32,
    pub wood: u32,
    pub water: u32,
    pub fire: u32,
    pub earth: u32,
    /// 金的综合强度（0-100）
    pub gold_value: f64,
    pub wood_value: f64,
    pub water_value: f64,
    pub fire_value: f64,
    pub earth_value: f64,
    /// 喜用神五行，如 ["火","土"]
    pub xiyong: Vec<String>,
    /// 忌用神五行
    pub jiyong: Vec<String>,
    /// 日主天干，如 戊
    pub rizhu: String,
    /// 日主五行，如 土
    pub rizhu_wuxing: String,
    /// 与日主同类（生扶）的五行
    pub tonglei: Vec<String>,
    /// 与日主异类（克泄耗）的五行
    pub yilei: Vec<String>,
    /// 同类综合得分（0-100）
    pub tonglei_score: f64,
    /// 异类综合得分（0-100）
    pub yilei_score: f64,
    /// 旺衰判断：身旺 / 身弱 / 身强 / 中和 等
    pub wangshuai: String,
}

impl WuxingTally {
    /// 五行个数之和；正常八字应为 8
    pub fn element_total(&self) -> u32 {
        self.gold + self.wood + self.water + self.fire + self.earth
    }

    fn values(&self) -> [f64; 7] {
        [
            self.gold_value,
            self.wood_value,
            self.water_value,
            self.fire_value,
            self.earth_value,
            self.tonglei_score,
            self.yilei_score,
        ]
    }
}

/// 推荐风格的配色主题（固定枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    Emerald,
    Blue,
    Amber,
    Purple,
    Rose,
    Cyan,
}

/// 模型根据八字推荐的取名风格
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StyleSuggestion {
    /// 唯一标识，如 shici_yayun
    pub id: String,
    /// 风格名（4-6 字），如 诗意天成
    pub title: String,
    /// 简短描述（20 字内）
    pub desc: String,
    /// 详细描述（40 字内）
    pub long_desc: String,
    pub color_theme: ColorTheme,
    /// 为何适合该八字（30 字内）
    pub rationale: String,
}

/// 八字分析（每个会话至多一份，生成后视为持久缓存）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BaziAnalysis {
    pub bazi: FourPillars,
    pub wuxing: WuxingTally,
    /// 八字简评（中文，约 100 字）
    pub analysis: String,
    /// 取名建议（中文，约 50 字）
    pub suggestion: String,
    /// 恰好 3 个个性化取名风格
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_styles: Option<Vec<StyleSuggestion>>,
}

impl BaziAnalysis {
    pub const MAX_SUGGESTED_STYLES: usize = 3;

    /// 年、月、日、时四柱
    pub fn pillars(&self) -> [&str; 4] {
        [
            self.bazi.year_pillar.as_str(),
            self.bazi.month_pillar.as_str(),
            self.bazi.day_pillar.as_str(),
            self.bazi.hour_pillar.as_str(),
        ]
    }

    pub fn suggested_styles(&self) -> &[StyleSuggestion] {
        self.suggested_styles.as_deref().unwrap_or_default()
    }

    /// 取名提示词中使用的喜忌 / 日主摘要
    pub fn summary(&self) -> String {
        let w = &self.wuxing;
        format!(
            "喜用神：{}；忌用神：{}；日主：{}（{}）；{}",
            w.xiyong.join("，"),
            w.jiyong.join("，"),
            w.rizhu,
            w.rizhu_wuxing,
            w.wangshuai
        )
    }

    /// 反序列化之后的语义校验（类型层面无法表达的约束）
    pub fn check(&self) -> Result<(), String> {
        let styles = self.suggested_styles().len();
        if styles > Self::MAX_SUGGESTED_STYLES {
            return Err(format!(
                "suggestedStyles 最多 {} 个，实际 {}",
                Self::MAX_SUGGESTED_STYLES,
                styles
            ));
        }
        if self
            .wuxing
            .values()
            .iter()
            .any(|v| !v.is_finite() || *v < 0.0)
        {
            return Err("wuxing 强度分值必须为非负数".to_string());
        }
        Ok(())
    }
}
