//! JSON 文件存储
//!
//! 每个集合一个文件（如 data/sessions.json），内容为 id -> 记录 的对象。
//! 写入先落临时文件再 rename，进程中断时不会留下半截 JSON。

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;

use super::{KeyValueStore, Keyed, StorageError};

pub struct JsonFileStore<V> {
    path: PathBuf,
    /// 串行化读-改-写
    lock: Mutex<()>,
    _marker: PhantomData<fn() -> V>,
}

impl<V> JsonFileStore<V> {
    /// 在 data_dir 下打开名为 collection 的集合（文件不存在时视为空集合）
    pub fn new(data_dir: impl AsRef<Path>, collection: &str) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", collection)),
            lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<V> JsonFileStore<V>
where
    V: Serialize + DeserializeOwned,
{
    async fn load(&self) -> Result<BTreeMap<String, V>, StorageError> {
        match fs::read_to_string(&self.path).await {
            Ok(data) if data.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, items: &BTreeMap<String, V>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(items)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl<V> KeyValueStore<V> for JsonFileStore<V>
where
    V: Keyed + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<Option<V>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(id))
    }

    async fn put(&self, value: V) -> Result<(), StorageError> {
        if value.key().is_empty() {
            return Err(StorageError::MissingKey);
        }
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        items.insert(value.key().to_string(), value);
        self.save(&items).await
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        if items.remove(id).is_some() {
            self.save(&items).await?;
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<V>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, Order};

    fn order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            session_id: "s1".to_string(),
            series_id: "all".to_string(),
            amount_fen: 990,
            status: OrderStatus::Pending,
            created_at: 1,
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store: JsonFileStore<Order> = JsonFileStore::new(dir.path(), "orders");
        assert!(store.list_all().await.unwrap().is_empty());

        store.put(order("o1")).await.unwrap();
        store.put(order("o2")).await.unwrap();

        let reopened: JsonFileStore<Order> = JsonFileStore::new(dir.path(), "orders");
        assert_eq!(reopened.get("o1").await.unwrap(), Some(order("o1")));
        assert_eq!(reopened.list_all().await.unwrap().len(), 2);

        reopened.delete("o1").await.unwrap();
        assert_eq!(store.get("o1").await.unwrap(), None);
        assert!(!dir.path().join("orders.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("orders.json"), "{not json").unwrap();
        let store: JsonFileStore<Order> = JsonFileStore::new(dir.path(), "orders");
        assert!(matches!(
            store.get("o1").await.unwrap_err(),
            StorageError::Serde(_)
        ));
    }
}
