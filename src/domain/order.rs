//! 解锁订单（模拟支付，无真实支付渠道）

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub session_id: String,
    /// 解锁的风格系列，或 "all"
    pub series_id: String,
    /// 金额（分）
    pub amount_fen: u64,
    pub status: OrderStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
}

impl Order {
    pub fn is_settled(&self) -> bool {
        self.status != OrderStatus::Pending
    }
}
