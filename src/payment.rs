//! 解锁订单与模拟支付
//!
//! 没有真实支付渠道：下单得到 pending 订单，显式调用 `complete_payment` 即视为支付成功，
//! 随后把订单的风格系列加入会话的已解锁集合，并解锁该系列下已生成的名字。

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::core::unlock::{is_unlocked, unlock_status, UnlockStatus};
use crate::domain::{now_millis, Order, OrderStatus, Session, SessionPatch};
use crate::session::{SessionError, SessionService};
use crate::storage::{KeyValueStore, StorageError};

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("订单金额必须大于 0")]
    InvalidAmount,

    #[error("Order {id} is already {status:?}")]
    AlreadySettled { id: String, status: OrderStatus },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 订单存储类型
pub type OrderStore = dyn KeyValueStore<Order>;

#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<OrderStore>,
    sessions: SessionService,
}

impl PaymentService {
    pub fn new(orders: Arc<OrderStore>, sessions: SessionService) -> Self {
        Self { orders, sessions }
    }

    /// 为某会话的某个风格系列（或 `all`）下单
    pub async fn create_order(
        &self,
        session_id: &str,
        series_id: &str,
        amount_fen: u64,
    ) -> Result<Order, PaymentError> {
        if amount_fen == 0 {
            return Err(PaymentError::InvalidAmount);
        }
        if self.sessions.get(session_id).await?.is_none() {
            return Err(PaymentError::SessionNotFound(session_id.to_string()));
        }

        let order = Order {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            series_id: series_id.to_string(),
            amount_fen,
            status: OrderStatus::Pending,
            created_at: now_millis(),
            paid_at: None,
        };
        self.orders.put(order.clone()).await?;
        tracing::info!(order_id = %order.id, series = %series_id, amount_fen, "Order created");
        Ok(order)
    }

    /// 支付成功：先解锁对应系列，再把订单置为 paid
    ///
    /// 解锁失败时订单保持 pending，可再次完成或标记失败。
    pub async fn complete_payment(&self, order_id: &str) -> Result<Order, PaymentError> {
        let mut order = self.pending_order(order_id).await?;

        let series = order.series_id.clone();
        self.sessions
            .update_with(&order.session_id, |session| Ok(unlock_patch(session, &series)))
            .await?;

        order.status = OrderStatus::Paid;
        order.paid_at = Some(now_millis());
        self.orders.put(order.clone()).await?;

        tracing::info!(order_id = %order.id, series = %order.series_id, "Payment completed, series unlocked");
        Ok(order)
    }

    pub async fn fail_payment(&self, order_id: &str) -> Result<Order, PaymentError> {
        let mut order = self.pending_order(order_id).await?;
        order.status = OrderStatus::Failed;
        self.orders.put(order.clone()).await?;
        tracing::warn!(order_id = %order.id, "Payment failed");
        Ok(order)
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>, PaymentError> {
        Ok(self.orders.get(order_id).await?)
    }

    /// 全部订单，最新在前
    pub async fn list_orders(&self) -> Result<Vec<Order>, PaymentError> {
        let mut orders = self.orders.list_all().await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    pub async fn orders_for_session(&self, session_id: &str) -> Result<Vec<Order>, PaymentError> {
        let mut orders = self.list_orders().await?;
        orders.retain(|o| o.session_id == session_id);
        Ok(orders)
    }

    pub async fn check_unlock_status(
        &self,
        session_id: &str,
        series_id: &str,
    ) -> Result<UnlockStatus, PaymentError> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| PaymentError::SessionNotFound(session_id.to_string()))?;
        Ok(unlock_status(session.unlocked_series.as_slice(), series_id))
    }

    async fn pending_order(&self, order_id: &str) -> Result<Order, PaymentError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| PaymentError::OrderNotFound(order_id.to_string()))?;
        if order.is_settled() {
            return Err(PaymentError::AlreadySettled {
                id: order.id,
                status: order.status,
            });
        }
        Ok(order)
    }
}

/// 系列加入已解锁集合（去重），并解锁该系列下的名字（`all` 则全部）
fn unlock_patch(session: &Session, series: &str) -> SessionPatch {
    let mut unlocked = session.unlocked_series.clone();
    if !unlocked.iter().any(|s| s == series) {
        unlocked.push(series.to_string());
    }

    let names = session
        .names
        .iter()
        .cloned()
        .map(|mut n| {
            if is_unlocked(&[series], &n.style) {
                n.is_locked = false;
            }
            n
        })
        .collect();

    SessionPatch {
        unlocked_series: Some(unlocked),
        names: Some(names),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unlock::ALL_SERIES;
    use crate::domain::{
        BirthInput, CalendarType, Gender, NameCandidate, NameSummary, PhoneticQuality,
    };
    use crate::storage::MemoryStore;

    fn info() -> BirthInput {
        BirthInput {
            last_name: "陈".to_string(),
            gender: Gender::Girl,
            birth_date: "2024-01-08".to_string(),
            birth_time: String::new(),
            birth_city: String::new(),
            calendar_type: CalendarType::Solar,
            is_leap_month: None,
            name_length: None,
        }
    }

    fn locked_name(id: &str, style: &str) -> NameCandidate {
        let summary = NameSummary {
            name: "若溪".to_string(),
            pinyin: "ruò xī".to_string(),
            meaning: "如溪水般清澈".to_string(),
            source: "《楚辞》".to_string(),
            wuxing: "木水".to_string(),
            bazi_match: "补水".to_string(),
            score: 90.0,
            uniqueness: "低".to_string(),
            uniqueness_count: "300+".to_string(),
            yinyun: PhoneticQuality {
                tone: "仄平".to_string(),
                initials: "rx".to_string(),
                score: 88.0,
                analysis: "音韵流畅".to_string(),
            },
            personalized_meaning: "灵动温婉".to_string(),
        };
        NameCandidate::summary(summary, id.to_string(), "陈", style, true)
    }

    async fn setup() -> (PaymentService, SessionService, Session) {
        let sessions = SessionService::new(Arc::new(MemoryStore::<Session>::new()));
        let payments = PaymentService::new(Arc::new(MemoryStore::<Order>::new()), sessions.clone());
        let session = sessions.create(info()).await.unwrap();
        let session = sessions
            .update(
                &session.id,
                SessionPatch::names(vec![locked_name("n1", "A"), locked_name("n2", "B")]),
            )
            .await
            .unwrap();
        (payments, sessions, session)
    }

    #[tokio::test]
    async fn test_complete_payment_unlocks_series() {
        let (payments, sessions, session) = setup().await;
        let order = payments.create_order(&session.id, "A", 990).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(
            payments.check_unlock_status(&session.id, "A").await.unwrap(),
            UnlockStatus::Locked
        );

        let paid = payments.complete_payment(&order.id).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert!(paid.paid_at.is_some());

        let stored = sessions.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.unlocked_series, vec!["A".to_string()]);
        assert!(!stored.find_name("n1").unwrap().is_locked);
        assert!(stored.find_name("n2").unwrap().is_locked);
        assert_eq!(
            payments.check_unlock_status(&session.id, "A").await.unwrap(),
            UnlockStatus::Unlocked
        );

        let again = payments.complete_payment(&order.id).await.unwrap_err();
        assert!(matches!(again, PaymentError::AlreadySettled { .. }));
    }

    #[tokio::test]
    async fn test_all_series_unlocks_everything_once() {
        let (payments, sessions, session) = setup().await;
        let first = payments.create_order(&session.id, ALL_SERIES, 2990).await.unwrap();
        payments.complete_payment(&first.id).await.unwrap();
        let second = payments.create_order(&session.id, ALL_SERIES, 2990).await.unwrap();
        payments.complete_payment(&second.id).await.unwrap();

        let stored = sessions.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.unlocked_series, vec![ALL_SERIES.to_string()]);
        assert!(stored.names.iter().all(|n| !n.is_locked));
    }

    #[tokio::test]
    async fn test_failed_payment_keeps_lock() {
        let (payments, sessions, session) = setup().await;
        let order = payments.create_order(&session.id, "B", 990).await.unwrap();
        let failed = payments.fail_payment(&order.id).await.unwrap();
        assert_eq!(failed.status, OrderStatus::Failed);

        let stored = sessions.get(&session.id).await.unwrap().unwrap();
        assert!(stored.unlocked_series.is_empty());
        assert!(stored.find_name("n2").unwrap().is_locked);
    }

    #[tokio::test]
    async fn test_unlock_failure_keeps_order_pending() {
        let (payments, sessions, session) = setup().await;
        let order = payments.create_order(&session.id, "A", 990).await.unwrap();
        sessions.delete(&session.id).await.unwrap();

        let err = payments.complete_payment(&order.id).await.unwrap_err();
        assert!(matches!(err, PaymentError::Session(SessionError::NotFound(_))));

        let stored = payments.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert!(stored.paid_at.is_none());

        let failed = payments.fail_payment(&order.id).await.unwrap();
        assert_eq!(failed.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_order_validation_and_listing() {
        let (payments, _, session) = setup().await;
        assert!(matches!(
            payments.create_order(&session.id, "A", 0).await.unwrap_err(),
            PaymentError::InvalidAmount
        ));
        assert!(matches!(
            payments.create_order("missing", "A", 100).await.unwrap_err(),
            PaymentError::SessionNotFound(_)
        ));
        assert!(matches!(
            payments.complete_payment("missing").await.unwrap_err(),
            PaymentError::OrderNotFound(_)
        ));

        let first = payments.create_order(&session.id, "A", 100).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = payments.create_order(&session.id, "B", 100).await.unwrap();

        let ids: Vec<String> = payments
            .list_orders()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);
        assert_eq!(payments.orders_for_session(&session.id).await.unwrap().len(), 2);
        assert!(payments.orders_for_session("other").await.unwrap().is_empty());
        assert_eq!(payments.get_order(&first.id).await.unwrap(), Some(first));
    }
}
