use std::sync::Arc;

use chrono::Utc;

use crate::error::{AppError, AppResult};
use crate::external::ShippingSink;
use crate::models::{ShippingPrize, ShippingRecord, ShippingRecordResponse, SubmitShippingRequest};
use crate::services::RevealService;
use crate::utils::{normalize_phone, validate_contact_phone};

#[derive(Clone)]
pub struct ShippingService {
    sink: Arc<dyn ShippingSink>,
    reveal: RevealService,
}

impl ShippingService {
    pub fn new(sink: Arc<dyn ShippingSink>, reveal: RevealService) -> Self {
        Self { sink, reveal }
    }

    /// 提交配送信息:
    /// 1. 必须同意收集个人信息
    /// 2. 姓名、电话必填，电话格式校验
    /// 3. 奖品取自会话汇总中需要配送的条目，同时表单关闭、会话回到汇总
    /// 4. 写入失败则重新打开表单
    pub async fn submit(&self, request: SubmitShippingRequest) -> AppResult<ShippingRecordResponse> {
        if !request.agreed {
            return Err(AppError::ValidationError(
                "Consent to collect personal information is required".to_string(),
            ));
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        if request.phone.trim().is_empty() {
            return Err(AppError::ValidationError("Phone is required".to_string()));
        }
        validate_contact_phone(&request.phone)?;

        let prizes: Vec<ShippingPrize> = self
            .reveal
            .claim_shipping_entries(request.session_id)
            .await?
            .into_iter()
            .map(|e| ShippingPrize {
                rank: e.rank,
                name: e.name,
                count: e.count,
            })
            .collect();

        let record = ShippingRecord {
            name: name.to_string(),
            phone: normalize_phone(&request.phone),
            address: request.address.trim().to_string(),
            prizes,
            created_at: Utc::now(),
        };
        let id = match self.sink.append(&record).await {
            Ok(id) => id,
            Err(e) => {
                // 写入失败时重新打开表单，允许重试
                if let Err(reopen) = self.reveal.open_shipping(request.session_id).await {
                    log::warn!(
                        "Shipping form for session {} not reopened: {reopen}",
                        request.session_id
                    );
                }
                return Err(e);
            }
        };
        log::info!(
            "Shipping record {id} stored for session {} ({} prize lines)",
            request.session_id,
            record.prizes.len()
        );

        Ok(ShippingRecordResponse::from_record(id, record))
    }

    pub async fn list(&self) -> AppResult<Vec<ShippingRecordResponse>> {
        self.sink.list().await
    }

    pub async fn purge(&self) -> AppResult<u64> {
        let removed = self.sink.purge().await?;
        log::info!("Purged {removed} shipping records");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MemoryShippingSink;
    use crate::models::{DisplayMode, DrawnPrize, RevealState};
    use crate::services::RevealPolicy;
    use futures_util::future::BoxFuture;
    use uuid::Uuid;

    fn setup() -> (ShippingService, RevealService, MemoryShippingSink) {
        let reveal = RevealService::new(RevealPolicy {
            high_ranks: vec![1],
            high_rank_delay: std::time::Duration::ZERO,
        });
        let sink = MemoryShippingSink::new();
        (
            ShippingService::new(Arc::new(sink.clone()), reveal.clone()),
            reveal,
            sink,
        )
    }

    async fn session_in_shipping(reveal: &RevealService) -> Uuid {
        let items = vec![
            DrawnPrize {
                rank: 1,
                name: "Bike".into(),
                requires_shipping: true,
            },
            DrawnPrize {
                rank: 3,
                name: "Sticker".into(),
                requires_shipping: false,
            },
        ];
        let id = reveal
            .start_session(items, DisplayMode::Both)
            .await
            .unwrap()
            .session_id;
        reveal.show_summary(id).await.unwrap();
        reveal.open_shipping(id).await.unwrap();
        id
    }

    fn request(session_id: Uuid) -> SubmitShippingRequest {
        SubmitShippingRequest {
            session_id,
            name: "Kim".into(),
            phone: "+82 10-1234-5678".into(),
            address: "Seoul".into(),
            agreed: true,
        }
    }

    #[tokio::test]
    async fn test_submit_records_only_shipping_prizes() {
        let (svc, reveal, sink) = setup();
        let id = session_in_shipping(&reveal).await;

        let record = svc.submit(request(id)).await.unwrap();
        assert_eq!(record.prizes.len(), 1);
        assert_eq!(record.prizes[0].name, "Bike");
        assert_eq!(record.phone, "+821012345678");
        assert_eq!(sink.len(), 1);
        assert_eq!(reveal.view(id).await.unwrap().state, RevealState::Summary);
    }

    #[tokio::test]
    async fn test_submit_requires_consent_and_valid_phone() {
        let (svc, reveal, sink) = setup();
        let id = session_in_shipping(&reveal).await;

        let mut req = request(id);
        req.agreed = false;
        assert!(matches!(
            svc.submit(req).await,
            Err(AppError::ValidationError(_))
        ));

        let mut req = request(id);
        req.phone = "12ab".into();
        assert!(svc.submit(req).await.is_err());

        let mut req = request(id);
        req.name = "  ".into();
        assert!(svc.submit(req).await.is_err());

        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_submit_outside_shipping_state_rejected() {
        let (svc, reveal, sink) = setup();
        let id = session_in_shipping(&reveal).await;
        reveal.close_shipping(id).await.unwrap();

        assert!(matches!(
            svc.submit(request(id)).await,
            Err(AppError::InvalidTransition(_))
        ));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_store_one_record() {
        let (svc, reveal, sink) = setup();
        let id = session_in_shipping(&reveal).await;

        let (a, b) = tokio::join!(svc.submit(request(id)), svc.submit(request(id)));
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(sink.len(), 1);
    }

    struct OfflineSink;

    impl ShippingSink for OfflineSink {
        fn append<'a>(&'a self, _record: &'a ShippingRecord) -> BoxFuture<'a, AppResult<i64>> {
            Box::pin(async { Err(AppError::PersistenceFailure("connection refused".into())) })
        }

        fn list(&self) -> BoxFuture<'_, AppResult<Vec<ShippingRecordResponse>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn purge(&self) -> BoxFuture<'_, AppResult<u64>> {
            Box::pin(async { Ok(0) })
        }
    }

    #[tokio::test]
    async fn test_failed_append_reopens_form() {
        let (_, reveal, _) = setup();
        let svc = ShippingService::new(Arc::new(OfflineSink), reveal.clone());
        let id = session_in_shipping(&reveal).await;

        assert!(svc.submit(request(id)).await.is_err());
        assert_eq!(
            reveal.view(id).await.unwrap().state,
            RevealState::ShippingCollection
        );
    }

    #[tokio::test]
    async fn test_list_and_purge() {
        let (svc, reveal, _) = setup();
        let id = session_in_shipping(&reveal).await;
        svc.submit(request(id)).await.unwrap();
        assert_eq!(svc.list().await.unwrap().len(), 1);
        assert_eq!(svc.purge().await.unwrap(), 1);
        assert!(svc.list().await.unwrap().is_empty());
    }
}
