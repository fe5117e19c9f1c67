use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{DisplayMode, DrawnPrize, RevealState, RevealSummaryEntry, RevealView};
use crate::services::{RevealEffect, RevealPolicy, RevealSequencer};
use crate::utils::{Listener, ListenerRegistry, Subscription};

struct RevealSession {
    sequencer: RevealSequencer,
    celebrations: u32,
    last_active: DateTime<Utc>,
}

/// 揭晓会话托管: 每次抽奖一个会话，由观众操作推进
#[derive(Clone)]
pub struct RevealService {
    policy: RevealPolicy,
    sessions: Arc<Mutex<HashMap<Uuid, RevealSession>>>,
    completions: ListenerRegistry<Uuid>,
}

impl RevealService {
    pub fn new(policy: RevealPolicy) -> Self {
        Self {
            policy,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            completions: ListenerRegistry::new(),
        }
    }

    /// 会话结束（Done）时回调
    pub fn on_complete(&self, listener: Listener<Uuid>) -> Subscription {
        self.completions.register(listener)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn start_session(
        &self,
        items: Vec<DrawnPrize>,
        display_mode: DisplayMode,
    ) -> AppResult<RevealView> {
        let id = Uuid::new_v4();
        let mut sequencer = RevealSequencer::new(self.policy.clone(), display_mode);
        let effects = sequencer.start(items)?;

        self.sessions.lock().await.insert(
            id,
            RevealSession {
                sequencer,
                celebrations: 0,
                last_active: Utc::now(),
            },
        );
        log::info!("Reveal session {id} started");

        self.run_effects(id, effects).await?;
        self.view(id).await
    }

    pub async fn view(&self, id: Uuid) -> AppResult<RevealView> {
        self.with_session(id, |s| Ok(s.sequencer.view(id, s.celebrations)))
            .await
    }

    /// 点击揭晓高等级: 触发庆祝效果，等待固定延迟后标记为已揭晓
    pub async fn disclose(&self, id: Uuid, index: usize) -> AppResult<RevealView> {
        let effects = self
            .with_session(id, |s| s.sequencer.disclose(index))
            .await?;
        self.run_effects(id, effects).await?;
        self.view(id).await
    }

    pub async fn show_summary(&self, id: Uuid) -> AppResult<RevealView> {
        let effects = self.with_session(id, |s| s.sequencer.show_summary()).await?;
        self.run_effects(id, effects).await?;
        self.view(id).await
    }

    pub async fn open_shipping(&self, id: Uuid) -> AppResult<RevealView> {
        let effects = self
            .with_session(id, |s| s.sequencer.open_shipping())
            .await?;
        self.run_effects(id, effects).await?;
        self.view(id).await
    }

    pub async fn close_shipping(&self, id: Uuid) -> AppResult<RevealView> {
        self.with_session(id, |s| s.sequencer.close_shipping())
            .await?;
        self.view(id).await
    }

    /// 取出需要配送的汇总条目并关闭表单，检查与状态切换在同一把锁内完成
    ///
    /// 同一会话只有一次提交能取到条目。
    pub async fn claim_shipping_entries(&self, id: Uuid) -> AppResult<Vec<RevealSummaryEntry>> {
        self.with_session(id, |s| {
            if s.sequencer.state() != RevealState::ShippingCollection {
                return Err(AppError::InvalidTransition(
                    "Shipping form is not open for this session".to_string(),
                ));
            }
            let entries = s.sequencer.shipping_entries();
            s.sequencer.close_shipping()?;
            Ok(entries)
        })
        .await
    }

    /// 进入 Done 并移除会话
    pub async fn finish(&self, id: Uuid) -> AppResult<RevealView> {
        let (view, effects) = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| not_found(id))?;
            let effects = session.sequencer.finish()?;
            let view = session.sequencer.view(id, session.celebrations);
            sessions.remove(&id);
            (view, effects)
        };
        self.run_effects(id, effects).await?;
        Ok(view)
    }

    /// 丢弃会话（不回滚已提交的库存）
    pub async fn cancel(&self, id: Uuid) -> AppResult<()> {
        match self.sessions.lock().await.remove(&id) {
            Some(_) => {
                log::info!("Reveal session {id} cancelled");
                Ok(())
            }
            None => Err(not_found(id)),
        }
    }

    /// 清理闲置会话，返回清理数量
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.last_active >= cutoff);
        before - sessions.len()
    }

    async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut RevealSession) -> AppResult<T>,
    ) -> AppResult<T> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        session.last_active = Utc::now();
        f(session)
    }

    /// 执行副作用；等待延迟期间不持有会话锁
    async fn run_effects(&self, id: Uuid, effects: Vec<RevealEffect>) -> AppResult<()> {
        let mut queue: VecDeque<RevealEffect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            match effect {
                RevealEffect::Disclosed { index } => {
                    log::debug!("Reveal session {id}: item {index} disclosed");
                }
                RevealEffect::Celebrate { index, rank } => {
                    log::info!("Reveal session {id}: celebrating rank {rank} at item {index}");
                    if let Err(e) = self
                        .with_session(id, |s| {
                            s.celebrations += 1;
                            Ok(())
                        })
                        .await
                    {
                        log::warn!("Celebration for session {id} not recorded: {e}");
                    }
                }
                RevealEffect::ScheduleDisclosure { index, delay } => {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    match self
                        .with_session(id, |s| Ok(s.sequencer.complete_disclosure(index)))
                        .await
                    {
                        Ok(more) => queue.extend(more),
                        Err(AppError::NotFound(_)) => {
                            log::debug!("Reveal session {id} ended before item {index} was disclosed");
                        }
                        Err(e) => return Err(e),
                    }
                }
                RevealEffect::SummaryReady { needs_shipping } => {
                    log::info!("Reveal session {id}: summary ready, needs shipping: {needs_shipping}");
                }
                RevealEffect::ShippingRequested { prizes } => {
                    log::info!(
                        "Reveal session {id}: collecting shipping for {} prize lines",
                        prizes.len()
                    );
                }
                RevealEffect::Completed => {
                    log::info!("Reveal session {id} completed");
                    self.completions.notify(&id);
                }
            }
        }
        Ok(())
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Reveal session {id} not found"))
}
