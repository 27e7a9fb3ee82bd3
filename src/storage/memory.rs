//! 内存存储（测试与一次性运行）

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, Keyed, StorageError};

#[derive(Debug)]
pub struct MemoryStore<V> {
    items: RwLock<HashMap<String, V>>,
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> KeyValueStore<V> for MemoryStore<V>
where
    V: Keyed + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<Option<V>, StorageError> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn put(&self, value: V) -> Result<(), StorageError> {
        if value.key().is_empty() {
            return Err(StorageError::MissingKey);
        }
        self.items
            .write()
            .await
            .insert(value.key().to_string(), value);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.items.write().await.remove(id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<V>, StorageError> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: u32,
    }

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.id
        }
    }

    fn item(id: &str, value: u32) -> Item {
        Item {
            id: id.to_string(),
            value,
        }
    }

    #[tokio::test]
    async fn test_put_get_overwrite_delete() {
        let store: MemoryStore<Item> = MemoryStore::new();
        store.put(item("a", 1)).await.unwrap();
        store.put(item("a", 2)).await.unwrap();
        store.put(item("b", 3)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(item("a", 2)));
        assert_eq!(store.len().await, 2);

        store.delete("a").await.unwrap();
        store.delete("missing").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.list_all().await.unwrap(), vec![item("b", 3)]);
    }

    #[tokio::test]
    async fn test_rejects_empty_key() {
        let store: MemoryStore<Item> = MemoryStore::new();
        let err = store.put(item("", 1)).await.unwrap_err();
        assert!(matches!(err, StorageError::MissingKey));
        assert!(store.is_empty().await);
    }
}
