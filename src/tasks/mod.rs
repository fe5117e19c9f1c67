//! Background scheduled tasks for the application.
//!
//! Call `spawn_all` once during startup to launch them.

use crate::services::RevealService;

const SWEEP_INTERVAL_SECS: u64 = 300;

/// Spawn all background tasks.
///
/// Detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(reveal_service: RevealService, session_ttl_minutes: i64) {
    // 闲置揭晓会话清理（每 5 分钟）；清理等同于取消，不影响库存
    {
        let svc = reveal_service.clone();
        let ttl = chrono::Duration::minutes(session_ttl_minutes.max(1));
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let purged = svc.purge_expired(ttl).await;
                if purged > 0 {
                    log::info!("Idle reveal sessions purged: {purged}");
                }
            }
        });
    }
}
