//! 会话服务：创建、读取、合并更新、删除、列表
//!
//! `update` / `update_with` 是会话字段在创建之后唯一的写入途径：读取 → 合并 → 更新时间戳 → 持久化。
//! 写入经由同一把锁串行化，基于当前快照计算补丁不会丢失并发写入。

pub mod favorites;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{now_millis, BirthInput, InputError, Session, SessionPatch};
use crate::storage::{KeyValueStore, StorageError};

pub use favorites::FavoritesService;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Name not found in session: {0}")]
    NameNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// 会话存储类型
pub type SessionStore = dyn KeyValueStore<Session>;

#[derive(Clone)]
pub struct SessionService {
    store: Arc<SessionStore>,
    write_lock: Arc<Mutex<()>>,
}

impl SessionService {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 校验出生信息并创建新会话
    pub async fn create(&self, info: BirthInput) -> Result<Session, SessionError> {
        info.validate()?;
        let session = Session::new(Uuid::new_v4().to_string(), info, now_millis());
        self.store.put(session.clone()).await?;
        tracing::info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Session>, SessionError> {
        Ok(self.store.get(id).await?)
    }

    /// 合并更新；会话不存在时报错
    pub async fn update(&self, id: &str, patch: SessionPatch) -> Result<Session, SessionError> {
        self.update_with(id, |_| Ok(patch)).await
    }

    /// 基于最新快照计算补丁再合并（读-改-写在锁内完成）
    pub async fn update_with<F>(&self, id: &str, build: F) -> Result<Session, SessionError>
    where
        F: FnOnce(&Session) -> Result<SessionPatch, SessionError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut session = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let patch = build(&session)?;
        session.apply(patch, now_millis());
        self.store.put(session.clone()).await?;
        tracing::debug!(session_id = %id, updated_at = session.updated_at, "Session updated");
        Ok(session)
    }

    pub async fn delete(&self, id: &str) -> Result<(), SessionError> {
        self.store.delete(id).await?;
        tracing::info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// 按创建时间倒序
    pub async fn list(&self) -> Result<Vec<Session>, SessionError> {
        let mut sessions = self.store.list_all().await?;
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    pub async fn set_style_preference(
        &self,
        id: &str,
        style: &str,
    ) -> Result<Session, SessionError> {
        self.update(
            id,
            SessionPatch {
                style_preference: Some(style.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// 标记最终选定的名字（必须属于该会话）
    pub async fn select_name(&self, id: &str, name_id: &str) -> Result<Session, SessionError> {
        self.update_with(id, |session| {
            if session.find_name(name_id).is_none() {
                return Err(SessionError::NameNotFound(name_id.to_string()));
            }
            Ok(SessionPatch {
                selected_name_id: Some(name_id.to_string()),
                ..Default::default()
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CalendarType, Gender};
    use crate::storage::MemoryStore;

    fn info(last_name: &str) -> BirthInput {
        BirthInput {
            last_name: last_name.to_string(),
            gender: Gender::Girl,
            birth_date: "2023-11-02".to_string(),
            birth_time: String::new(),
            birth_city: String::new(),
            calendar_type: CalendarType::Lunar,
            is_leap_month: Some(false),
            name_length: None,
        }
    }

    fn service() -> SessionService {
        SessionService::new(Arc::new(MemoryStore::<Session>::new()))
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let err = service().create(info("")).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidInput(InputError::EmptySurname)));
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let svc = service();
        let session = svc.create(info("李")).await.unwrap();
        assert!(session.unlocked_series.is_empty());

        let updated = svc.set_style_preference(&session.id, "诗词雅韵").await.unwrap();
        assert_eq!(updated.style_preference.as_deref(), Some("诗词雅韵"));
        assert!(updated.updated_at >= session.updated_at);
        assert_eq!(updated.created_at, session.created_at);

        let missing = svc.update("nope", SessionPatch::default()).await.unwrap_err();
        assert!(matches!(missing, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_select_name_requires_existing_candidate() {
        let svc = service();
        let session = svc.create(info("李")).await.unwrap();
        let err = svc.select_name(&session.id, "name-x").await.unwrap_err();
        assert!(matches!(err, SessionError::NameNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_delete() {
        let svc = service();
        let first = svc.create(info("张")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = svc.create(info("赵")).await.unwrap();

        let ids: Vec<String> = svc.list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        svc.delete(&first.id).await.unwrap();
        assert!(svc.get(&first.id).await.unwrap().is_none());
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }
}
