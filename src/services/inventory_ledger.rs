use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::error::{AppError, AppResult};
use crate::external::DocumentStore;
use crate::models::{
    DisplayMode, DrawMode, DrawOutcome, DrawnPrize, Prize, PrizeDocument, PrizePatch,
    SettingsPatch,
};
use crate::services::DrawEngine;
use crate::utils::{Listener, ListenerRegistry, Subscription};

/// 一次抽奖在账本中的结果
#[derive(Debug, Clone)]
pub struct LedgerDraw {
    pub mode: DrawMode,
    pub outcome: DrawOutcome,
    /// 与 outcome 同序
    pub items: Vec<DrawnPrize>,
    pub display_mode: DisplayMode,
    pub total_remaining: u64,
}

/// 奖池账本: 唯一持有奖池，负责与外部存储之间的加载、订阅与提交
///
/// 所有写操作经 `write_gate` 串行化；内存状态的读写锁从不跨越 await。
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn DocumentStore>,
    key: String,
    max_prizes: usize,
    state: Arc<RwLock<PrizeDocument>>,
    write_gate: Arc<tokio::sync::Mutex<()>>,
    listeners: ListenerRegistry<PrizeDocument>,
    store_subscription: Arc<Mutex<Option<Subscription>>>,
    /// 正在写入外部存储的文档，用于识别自身写入的回声
    pending_write: Arc<Mutex<Option<PrizeDocument>>>,
}

impl InventoryLedger {
    pub fn new(store: Arc<dyn DocumentStore>, key: impl Into<String>, max_prizes: usize) -> Self {
        Self {
            store,
            key: key.into(),
            max_prizes,
            state: Arc::new(RwLock::new(PrizeDocument::default())),
            write_gate: Arc::new(tokio::sync::Mutex::new(())),
            listeners: ListenerRegistry::new(),
            store_subscription: Arc::new(Mutex::new(None)),
            pending_write: Arc::new(Mutex::new(None)),
        }
    }

    pub fn max_prizes(&self) -> usize {
        self.max_prizes
    }

    pub fn snapshot(&self) -> PrizeDocument {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write_state(&self, document: PrizeDocument) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = document;
    }

    fn publish(&self, document: PrizeDocument) {
        self.write_state(document.clone());
        self.listeners.notify(&document);
    }

    fn set_pending(&self, document: Option<PrizeDocument>) {
        *self
            .pending_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = document;
    }

    /// 写入外部存储；成功前不改动内存状态，写入期间的回声被忽略
    async fn persist_locked(&self, document: &PrizeDocument) -> AppResult<()> {
        self.set_pending(Some(document.clone()));
        let result = self.store.set(&self.key, document).await;
        self.set_pending(None);
        result.map_err(|e| match e {
            AppError::PersistenceFailure(_) => e,
            other => AppError::PersistenceFailure(other.to_string()),
        })
    }

    /// 从外部存储加载；文档不存在视为空奖池
    pub async fn load_initial(&self) -> AppResult<PrizeDocument> {
        let _gate = self.write_gate.lock().await;
        let document = match self.store.get(&self.key).await? {
            Some(mut doc) => {
                if doc.prizes.normalize() {
                    log::warn!("Prize document {} was inconsistent and has been normalized", self.key);
                }
                doc
            }
            None => {
                log::info!("Prize document {} not found, starting with an empty pool", self.key);
                PrizeDocument::default()
            }
        };
        log::info!(
            "Prize pool loaded: {} lines, {} remaining",
            document.prizes.len(),
            document.prizes.total_remaining()
        );
        self.publish(document.clone());
        Ok(document)
    }

    /// 订阅外部存储推送；推送的文档整体替换本地状态（后写者胜）
    pub fn attach_remote_updates(&self) {
        let state = self.state.clone();
        let listeners = self.listeners.clone();
        let pending_write = self.pending_write.clone();
        let key = self.key.clone();
        let subscription = self.store.subscribe(
            &self.key,
            Arc::new(move |incoming: &PrizeDocument| {
                let mut document = incoming.clone();
                document.prizes.normalize();
                let is_echo = pending_write
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .as_ref()
                    .is_some_and(|pending| *pending == document);
                if is_echo {
                    return;
                }
                {
                    let mut current = state.write().unwrap_or_else(PoisonError::into_inner);
                    if *current == document {
                        return;
                    }
                    *current = document.clone();
                }
                log::info!(
                    "Prize document {key} replaced by remote update ({} remaining)",
                    document.prizes.total_remaining()
                );
                listeners.notify(&document);
            }),
        );
        *self
            .store_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(subscription);
    }

    pub fn detach_remote_updates(&self) {
        let subscription = self
            .store_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    /// 注册本地状态变更回调
    pub fn subscribe(&self, on_change: Listener<PrizeDocument>) -> Subscription {
        self.listeners.register(on_change)
    }

    /// 对当前快照抽样并按模式提交
    pub async fn draw(&self, count: u32, mode: DrawMode) -> AppResult<LedgerDraw> {
        let _gate = self.write_gate.lock().await;
        let snapshot = self.snapshot();
        if snapshot.is_closed {
            return Err(AppError::DrawClosed);
        }

        let proposal = DrawEngine::draw(&snapshot.prizes, count)?;
        let items = proposal
            .outcome
            .ranks
            .iter()
            .map(|&rank| {
                snapshot
                    .prizes
                    .get(rank)
                    .map(DrawnPrize::from)
                    .ok_or_else(|| AppError::InternalError(format!("Drawn rank {rank} missing")))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let after = self
            .apply_draw_locked(&snapshot, &proposal.outcome, mode)
            .await?;

        Ok(LedgerDraw {
            mode,
            outcome: proposal.outcome,
            items,
            display_mode: snapshot.display_mode,
            total_remaining: after.prizes.total_remaining(),
        })
    }

    /// 彩排: 原样返回，不持久化；正式: 扣减并持久化，写入成功后才更新内存状态
    pub async fn apply_draw(&self, outcome: &DrawOutcome, mode: DrawMode) -> AppResult<PrizeDocument> {
        let _gate = self.write_gate.lock().await;
        let before = self.snapshot();
        self.apply_draw_locked(&before, outcome, mode).await
    }

    async fn apply_draw_locked(
        &self,
        before: &PrizeDocument,
        outcome: &DrawOutcome,
        mode: DrawMode,
    ) -> AppResult<PrizeDocument> {
        if mode == DrawMode::Rehearsal {
            log::info!("Rehearsal draw of {} items, inventory untouched", outcome.len());
            return Ok(before.clone());
        }

        let mut next = before.clone();
        for &rank in &outcome.ranks {
            next.prizes.decrement(rank)?;
        }

        if let Err(e) = self.persist_locked(&next).await {
            log::error!("Live draw persistence failed, pool left unchanged: {e}");
            return Err(e);
        }

        log::info!(
            "Live draw committed: {:?}, {} remaining",
            outcome.ranks,
            next.prizes.total_remaining()
        );
        self.publish(next.clone());
        Ok(next)
    }

    /// 管理端本地修改（需 `save` 才会持久化）
    async fn edit<T>(&self, f: impl FnOnce(&mut PrizeDocument) -> AppResult<T>) -> AppResult<T> {
        let _gate = self.write_gate.lock().await;
        let mut document = self.snapshot();
        let out = f(&mut document)?;
        self.publish(document);
        Ok(out)
    }

    pub async fn add_line(&self) -> AppResult<Prize> {
        let max = self.max_prizes;
        self.edit(|doc| doc.add_line(max)).await
    }

    pub async fn remove_line(&self, rank: u32) -> AppResult<Prize> {
        self.edit(|doc| doc.remove_line(rank)).await
    }

    pub async fn update_line(&self, rank: u32, patch: PrizePatch) -> AppResult<Prize> {
        self.edit(|doc| doc.update_line(rank, patch)).await
    }

    pub async fn apply_settings(&self, patch: SettingsPatch) -> AppResult<PrizeDocument> {
        self.edit(|doc| {
            doc.apply_settings(patch)?;
            Ok(doc.clone())
        })
        .await
    }

    /// 锁定状态本身在锁定期间始终可切换
    pub async fn set_locked(&self, locked: bool) -> AppResult<PrizeDocument> {
        self.edit(|doc| {
            doc.is_locked = locked;
            Ok(doc.clone())
        })
        .await
    }

    pub async fn toggle_locked(&self) -> AppResult<PrizeDocument> {
        self.edit(|doc| {
            doc.is_locked = !doc.is_locked;
            Ok(doc.clone())
        })
        .await
    }

    /// 截止 / 重新开放即时生效并持久化
    pub async fn set_closed(&self, closed: bool) -> AppResult<PrizeDocument> {
        let _gate = self.write_gate.lock().await;
        let mut document = self.snapshot();
        document.is_closed = closed;
        self.commit_locked(document).await
    }

    pub async fn toggle_closed(&self) -> AppResult<PrizeDocument> {
        let _gate = self.write_gate.lock().await;
        let mut document = self.snapshot();
        document.is_closed = !document.is_closed;
        self.commit_locked(document).await
    }

    /// 提交操作员给出的整份配置，整体覆盖远端文档
    pub async fn commit(&self, document: PrizeDocument) -> AppResult<PrizeDocument> {
        let _gate = self.write_gate.lock().await;
        self.commit_locked(document).await
    }

    /// 提交当前内存中的配置
    pub async fn save(&self) -> AppResult<PrizeDocument> {
        let _gate = self.write_gate.lock().await;
        let document = self.snapshot();
        self.commit_locked(document).await
    }

    async fn commit_locked(&self, document: PrizeDocument) -> AppResult<PrizeDocument> {
        document.prizes.validate(self.max_prizes)?;
        if let Err(e) = self.persist_locked(&document).await {
            log::error!("Prize document commit failed: {e}");
            return Err(e);
        }
        log::info!(
            "Prize document committed: {} lines, locked={}, closed={}, rehearsal={}",
            document.prizes.len(),
            document.is_locked,
            document.is_closed,
            document.is_test_mode
        );
        self.publish(document.clone());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemoryDocumentStore;
    use crate::models::PrizePool;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const KEY: &str = "settings/prizes";

    /// 可切换写入失败的存储
    struct FlakyStore {
        inner: MemoryDocumentStore,
        fail_writes: AtomicBool,
    }

    impl DocumentStore for FlakyStore {
        fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, AppResult<Option<PrizeDocument>>> {
            self.inner.get(key)
        }

        fn set<'a>(
            &'a self,
            key: &'a str,
            document: &'a PrizeDocument,
        ) -> BoxFuture<'a, AppResult<()>> {
            if self.fail_writes.load(Ordering::SeqCst) {
                Box::pin(async { Err(AppError::PersistenceFailure("store offline".into())) })
            } else {
                self.inner.set(key, document)
            }
        }

        fn subscribe(&self, key: &str, on_change: Listener<PrizeDocument>) -> Subscription {
            self.inner.subscribe(key, on_change)
        }
    }

    fn line(rank: u32, quantity: u32, remaining: u32) -> Prize {
        Prize {
            rank,
            name: format!("Prize {rank}"),
            quantity,
            remaining,
            requires_shipping: rank == 1,
        }
    }

    fn document(lines: Vec<Prize>) -> PrizeDocument {
        PrizeDocument {
            prizes: PrizePool::new(lines),
            ..Default::default()
        }
    }

    fn remaining(doc: &PrizeDocument) -> Vec<u32> {
        doc.prizes.prizes().iter().map(|p| p.remaining).collect()
    }

    async fn ledger_with(doc: PrizeDocument) -> (InventoryLedger, MemoryDocumentStore) {
        let store = MemoryDocumentStore::with_document(KEY, doc);
        let ledger = InventoryLedger::new(Arc::new(store.clone()), KEY, 100);
        ledger.load_initial().await.unwrap();
        (ledger, store)
    }

    #[tokio::test]
    async fn test_load_absent_document_is_empty_pool() {
        let ledger = InventoryLedger::new(Arc::new(MemoryDocumentStore::new()), KEY, 100);
        let doc = ledger.load_initial().await.unwrap();
        assert!(doc.prizes.is_empty());
        assert_eq!(doc, PrizeDocument::default());
    }

    #[tokio::test]
    async fn test_load_normalizes_inconsistent_document() {
        let (ledger, _) = ledger_with(document(vec![line(2, 1, 1), line(5, 2, 9)])).await;
        let doc = ledger.snapshot();
        assert!(doc.prizes.validate(100).is_ok());
        assert_eq!(remaining(&doc), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_live_draws_decrement_and_persist() {
        let (ledger, store) =
            ledger_with(document(vec![line(1, 2, 2), line(2, 5, 5), line(3, 10, 10)])).await;
        let quantity_before = ledger.snapshot().prizes.total_quantity();

        let mut drawn = 0;
        for count in [1, 3, 4] {
            let result = ledger.draw(count, DrawMode::Live).await.unwrap();
            assert_eq!(result.outcome.len(), count as usize);
            assert_eq!(result.items.len(), count as usize);
            drawn += count as u64;
        }

        let doc = ledger.snapshot();
        assert_eq!(doc.prizes.total_remaining(), 17 - drawn);
        assert_eq!(doc.prizes.total_quantity(), quantity_before);
        assert_eq!(store.peek(KEY), Some(doc));
    }

    #[tokio::test]
    async fn test_rehearsal_draws_leave_inventory_identical() {
        let original = document(vec![line(1, 2, 2), line(2, 5, 3)]);
        let (ledger, store) = ledger_with(original.clone()).await;

        for _ in 0..10 {
            let result = ledger.draw(5, DrawMode::Rehearsal).await.unwrap();
            assert_eq!(result.outcome.len(), 5);
            assert_eq!(result.total_remaining, 5);
        }

        assert_eq!(remaining(&ledger.snapshot()), vec![2, 3]);
        assert_eq!(store.peek(KEY), Some(original));
    }

    #[tokio::test]
    async fn test_only_available_rank_is_drawn() {
        let (ledger, _) = ledger_with(document(vec![line(1, 2, 2), line(2, 3, 0)])).await;
        let result = ledger.draw(2, DrawMode::Live).await.unwrap();
        assert_eq!(result.outcome.ranks, vec![1, 1]);
        assert_eq!(remaining(&ledger.snapshot()), vec![0, 0]);
        assert_eq!(result.total_remaining, 0);
    }

    #[tokio::test]
    async fn test_insufficient_inventory_has_no_side_effects() {
        let original = document(vec![line(1, 1, 1), line(2, 1, 1)]);
        let (ledger, store) = ledger_with(original.clone()).await;

        let err = ledger.draw(3, DrawMode::Live).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientInventory { .. }));
        assert_eq!(ledger.snapshot(), original);
        assert_eq!(store.peek(KEY), Some(original));
    }

    #[tokio::test]
    async fn test_persistence_failure_rolls_back() {
        let original = document(vec![line(1, 3, 3)]);
        let store = Arc::new(FlakyStore {
            inner: MemoryDocumentStore::with_document(KEY, original.clone()),
            fail_writes: AtomicBool::new(false),
        });
        let ledger = InventoryLedger::new(store.clone(), KEY, 100);
        ledger.load_initial().await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = ledger.draw(2, DrawMode::Live).await.unwrap_err();
        assert!(matches!(err, AppError::PersistenceFailure(_)));
        assert_eq!(ledger.snapshot(), original);

        // 用户重试
        store.fail_writes.store(false, Ordering::SeqCst);
        ledger.draw(2, DrawMode::Live).await.unwrap();
        assert_eq!(remaining(&ledger.snapshot()), vec![1]);
    }

    #[tokio::test]
    async fn test_closed_event_rejects_draw() {
        let mut doc = document(vec![line(1, 3, 3)]);
        doc.is_closed = true;
        let (ledger, _) = ledger_with(doc).await;
        assert!(matches!(
            ledger.draw(1, DrawMode::Live).await,
            Err(AppError::DrawClosed)
        ));
    }

    #[tokio::test]
    async fn test_remote_update_replaces_pool_wholesale() {
        let (ledger, store) = ledger_with(document(vec![line(1, 3, 3), line(2, 4, 4)])).await;
        ledger.attach_remote_updates();

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let sub = ledger.subscribe(Arc::new(move |_: &PrizeDocument| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let remote = document(vec![line(1, 9, 7)]);
        store.set(KEY, &remote).await.unwrap();
        assert_eq!(ledger.snapshot(), remote);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        // 自身提交的回声不会重复通知
        ledger.draw(1, DrawMode::Live).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        sub.unsubscribe();
        ledger.detach_remote_updates();
        store.set(KEY, &document(vec![])).await.unwrap();
        assert_eq!(remaining(&ledger.snapshot()), vec![6]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    fn counting_subscriber(ledger: &InventoryLedger) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        let sub = ledger.subscribe(Arc::new(move |_: &PrizeDocument| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        }));
        (hits, sub)
    }

    #[tokio::test]
    async fn test_commit_notifies_listeners_once() {
        let (ledger, store) = ledger_with(document(vec![line(1, 2, 2)])).await;
        ledger.attach_remote_updates();
        let (hits, _sub) = counting_subscriber(&ledger);

        ledger.set_closed(true).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        ledger.add_line().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        ledger.save().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        let mut next = ledger.snapshot();
        next.notice_message = "See you next year".into();
        ledger.commit(next.clone()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert_eq!(store.peek(KEY), Some(next));
    }

    #[tokio::test]
    async fn test_failed_commit_does_not_notify() {
        let original = document(vec![line(1, 3, 3)]);
        let store = Arc::new(FlakyStore {
            inner: MemoryDocumentStore::with_document(KEY, original.clone()),
            fail_writes: AtomicBool::new(true),
        });
        let ledger = InventoryLedger::new(store.clone(), KEY, 100);
        ledger.load_initial().await.unwrap();
        ledger.attach_remote_updates();
        let (hits, _sub) = counting_subscriber(&ledger);

        assert!(matches!(
            ledger.set_closed(true).await,
            Err(AppError::PersistenceFailure(_))
        ));
        assert!(ledger.draw(1, DrawMode::Live).await.is_err());
        assert_eq!(ledger.snapshot(), original);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    /// 写入挂起直到放行，随后失败
    struct StalledStore {
        inner: MemoryDocumentStore,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    impl DocumentStore for StalledStore {
        fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, AppResult<Option<PrizeDocument>>> {
            self.inner.get(key)
        }

        fn set<'a>(
            &'a self,
            _key: &'a str,
            _document: &'a PrizeDocument,
        ) -> BoxFuture<'a, AppResult<()>> {
            Box::pin(async move {
                self.entered.notify_one();
                self.release.notified().await;
                Err(AppError::PersistenceFailure("store offline".into()))
            })
        }

        fn subscribe(&self, key: &str, on_change: Listener<PrizeDocument>) -> Subscription {
            self.inner.subscribe(key, on_change)
        }
    }

    #[tokio::test]
    async fn test_unconfirmed_draw_is_not_visible() {
        let original = document(vec![line(1, 3, 3)]);
        let store = Arc::new(StalledStore {
            inner: MemoryDocumentStore::with_document(KEY, original.clone()),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let ledger = InventoryLedger::new(store.clone(), KEY, 100);
        ledger.load_initial().await.unwrap();

        let drawing = ledger.clone();
        let handle = tokio::spawn(async move { drawing.draw(2, DrawMode::Live).await });

        store.entered.notified().await;
        assert_eq!(ledger.snapshot(), original);

        store.release.notify_one();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(AppError::PersistenceFailure(_))));
        assert_eq!(ledger.snapshot(), original);
    }

    #[tokio::test]
    async fn test_toggles_flip_current_flags() {
        let (ledger, store) = ledger_with(document(vec![line(1, 1, 1)])).await;

        assert!(ledger.toggle_locked().await.unwrap().is_locked);
        assert!(!ledger.toggle_locked().await.unwrap().is_locked);

        let (a, b) = tokio::join!(ledger.toggle_closed(), ledger.toggle_closed());
        assert_ne!(a.unwrap().is_closed, b.unwrap().is_closed);
        assert!(!ledger.snapshot().is_closed);
        assert!(!store.peek(KEY).unwrap().is_closed);
    }

    #[tokio::test]
    async fn test_admin_edits_are_local_until_saved() {
        let (ledger, store) = ledger_with(document(vec![line(1, 1, 1)])).await;

        let added = ledger.add_line().await.unwrap();
        assert_eq!(added.rank, 2);
        ledger
            .update_line(
                2,
                PrizePatch {
                    name: Some("Mug".into()),
                    quantity: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.peek(KEY).unwrap().prizes.len(), 1);

        let saved = ledger.save().await.unwrap();
        assert_eq!(saved.prizes.len(), 2);
        assert_eq!(store.peek(KEY), Some(saved));
    }

    #[tokio::test]
    async fn test_locked_pool_rejects_edits() {
        let (ledger, _) = ledger_with(document(vec![line(1, 1, 1), line(2, 2, 2)])).await;
        ledger.set_locked(true).await.unwrap();
        let before = ledger.snapshot();

        assert!(matches!(ledger.add_line().await, Err(AppError::PoolLocked)));
        assert!(matches!(ledger.remove_line(1).await, Err(AppError::PoolLocked)));
        assert_eq!(ledger.snapshot(), before);

        ledger.set_locked(false).await.unwrap();
        ledger.remove_line(1).await.unwrap();
        assert_eq!(ledger.snapshot().prizes.prizes()[0].rank, 1);
    }

    #[tokio::test]
    async fn test_commit_rejects_invalid_document() {
        let original = document(vec![line(1, 1, 1)]);
        let (ledger, store) = ledger_with(original.clone()).await;

        let invalid = document(vec![line(1, 1, 5)]);
        assert!(matches!(
            ledger.commit(invalid).await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(ledger.snapshot(), original);
        assert_eq!(store.peek(KEY), Some(original));
    }

    #[tokio::test]
    async fn test_close_persists_immediately() {
        let (ledger, store) = ledger_with(document(vec![line(1, 1, 1)])).await;
        ledger.set_closed(true).await.unwrap();
        assert!(store.peek(KEY).unwrap().is_closed);
        assert!(ledger.snapshot().is_closed);
    }
}
