//! 会话记录：一次取名流程的持久化单元

use serde::{Deserialize, Serialize};

use super::{BaziAnalysis, BirthInput, NameCandidate};

/// 宝宝取名会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub baby_info: BirthInput,
    /// 毫秒时间戳
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bazi_analysis: Option<BaziAnalysis>,
    #[serde(default)]
    pub names: Vec<NameCandidate>,
    /// 已解锁的风格系列 id，或哨兵值 "all"
    #[serde(default)]
    pub unlocked_series: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_name_id: Option<String>,
}

impl Session {
    pub fn new(id: String, baby_info: BirthInput, now: i64) -> Self {
        Self {
            id,
            baby_info,
            created_at: now,
            updated_at: now,
            style_preference: None,
            bazi_analysis: None,
            names: Vec::new(),
            unlocked_series: Vec::new(),
            selected_name_id: None,
        }
    }

    pub fn find_name(&self, name_id: &str) -> Option<&NameCandidate> {
        self.names.iter().find(|n| n.id == name_id)
    }

    pub fn names_in_style<'a>(&'a self, style: &'a str) -> impl Iterator<Item = &'a NameCandidate> {
        self.names.iter().filter(move |n| n.style == style)
    }

    /// 用新批次替换同风格的旧批次，其它风格的名字保持原顺序
    pub fn names_with_batch(&self, style: &str, batch: &[NameCandidate]) -> Vec<NameCandidate> {
        self.names
            .iter()
            .filter(|n| n.style != style)
            .chain(batch.iter())
            .cloned()
            .collect()
    }

    /// 用合并后的候选替换同 id 的条目
    pub fn names_with_replaced(&self, candidate: &NameCandidate) -> Vec<NameCandidate> {
        self.names
            .iter()
            .map(|n| {
                if n.id == candidate.id {
                    candidate.clone()
                } else {
                    n.clone()
                }
            })
            .collect()
    }

    /// 合并更新并打上新的更新时间；这是会话字段唯一的写入途径
    pub fn apply(&mut self, patch: SessionPatch, now: i64) {
        if let Some(style) = patch.style_preference {
            self.style_preference = Some(style);
        }
        if let Some(analysis) = patch.bazi_analysis {
            self.bazi_analysis = Some(analysis);
        }
        if let Some(names) = patch.names {
            self.names = names;
        }
        if let Some(unlocked) = patch.unlocked_series {
            self.unlocked_series = unlocked;
        }
        if let Some(selected) = patch.selected_name_id {
            self.selected_name_id = Some(selected);
        }
        self.updated_at = now.max(self.updated_at);
    }
}

/// 会话部分更新；None 表示不修改该字段
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub style_preference: Option<String>,
    pub bazi_analysis: Option<BaziAnalysis>,
    pub names: Option<Vec<NameCandidate>>,
    pub unlocked_series: Option<Vec<String>>,
    pub selected_name_id: Option<String>,
}

impl SessionPatch {
    pub fn analysis(analysis: BaziAnalysis) -> Self {
        Self {
            bazi_analysis: Some(analysis),
            ..Default::default()
        }
    }

    pub fn names(names: Vec<NameCandidate>) -> Self {
        Self {
            names: Some(names),
            ..Default::default()
        }
    }
}
