//! 收藏夹：按名字 id 保存的名字快照

use std::sync::Arc;

use crate::domain::NameCandidate;
use crate::storage::{KeyValueStore, StorageError};

#[derive(Clone)]
pub struct FavoritesService {
    store: Arc<dyn KeyValueStore<NameCandidate>>,
}

impl FavoritesService {
    pub fn new(store: Arc<dyn KeyValueStore<NameCandidate>>) -> Self {
        Self { store }
    }

    /// 收藏（保存当前快照）；没有 id 的名字不可收藏
    pub async fn add(&self, name: &NameCandidate) -> Result<(), StorageError> {
        self.store.put(name.clone()).await
    }

    pub async fn remove(&self, name_id: &str) -> Result<(), StorageError> {
        self.store.delete(name_id).await
    }

    pub async fn is_favorite(&self, name_id: &str) -> Result<bool, StorageError> {
        Ok(self.store.get(name_id).await?.is_some())
    }

    pub async fn list(&self) -> Result<Vec<NameCandidate>, StorageError> {
        self.store.list_all().await
    }
}
