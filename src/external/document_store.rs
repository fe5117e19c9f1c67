use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::AppResult;
use crate::models::PrizeDocument;
use crate::utils::{Listener, ListenerRegistry, Subscription};

/// 外部文档存储: 整体读取 / 整体覆盖 / 变更订阅
///
/// 写入要么完整可见要么不可见，订阅者总是收到完整文档。
pub trait DocumentStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, AppResult<Option<PrizeDocument>>>;

    fn set<'a>(&'a self, key: &'a str, document: &'a PrizeDocument) -> BoxFuture<'a, AppResult<()>>;

    fn subscribe(&self, key: &str, on_change: Listener<PrizeDocument>) -> Subscription;
}

/// 按键划分的订阅注册表（进程内推送）
#[derive(Clone, Default)]
pub struct KeyedListeners {
    registries: Arc<Mutex<HashMap<String, ListenerRegistry<PrizeDocument>>>>,
}

impl KeyedListeners {
    pub fn subscribe(&self, key: &str, on_change: Listener<PrizeDocument>) -> Subscription {
        let registry = {
            let mut map = self.registries.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.to_string()).or_default().clone()
        };
        registry.register(on_change)
    }

    pub fn notify(&self, key: &str, document: &PrizeDocument) {
        let registry = {
            let map = self.registries.lock().unwrap_or_else(PoisonError::into_inner);
            map.get(key).cloned()
        };
        if let Some(registry) = registry {
            registry.notify(document);
        }
    }
}

/// 进程内文档存储（本地开发 / 测试）
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, PrizeDocument>>>,
    listeners: KeyedListeners,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(key: &str, document: PrizeDocument) -> Self {
        let store = Self::default();
        store
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), document);
        store
    }

    /// 同步读取，便于测试断言
    pub fn peek(&self, key: &str) -> Option<PrizeDocument> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, AppResult<Option<PrizeDocument>>> {
        Box::pin(async move { Ok(self.peek(key)) })
    }

    fn set<'a>(&'a self, key: &'a str, document: &'a PrizeDocument) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            self.documents
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.to_string(), document.clone());
            self.listeners.notify(key, document);
            Ok(())
        })
    }

    fn subscribe(&self, key: &str, on_change: Listener<PrizeDocument>) -> Subscription {
        self.listeners.subscribe(key, on_change)
    }
}
