//! 本地键值存储抽象层
//!
//! 会话、收藏、订单三个集合共用同一接口，支持内存和 JSON 文件两种实现

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{NameCandidate, Order, Session};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Record has no id")]
    MissingKey,
}

/// 可按 id 存取的记录
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Session {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for NameCandidate {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Order {
    fn key(&self) -> &str {
        &self.id
    }
}

/// 键值存储接口
#[async_trait]
pub trait KeyValueStore<V>: Send + Sync
where
    V: Keyed + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<Option<V>, StorageError>;

    /// 按 value.key() 写入（存在则覆盖）
    async fn put(&self, value: V) -> Result<(), StorageError>;

    /// 删除；不存在时静默成功
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// 全部记录（顺序不保证）
    async fn list_all(&self) -> Result<Vec<V>, StorageError>;
}
