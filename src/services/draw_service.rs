use crate::error::{AppError, AppResult};
use crate::models::{DrawMode, DrawRequest, DrawResponse, DrawStatusResponse};
use crate::services::{InventoryLedger, RevealService};

/// 剩余数量低于该值时提示
const LOW_STOCK_THRESHOLD: u64 = 50;

#[derive(Clone)]
pub struct DrawService {
    ledger: InventoryLedger,
    reveal: RevealService,
    max_draw_count: u32,
}

impl DrawService {
    pub fn new(ledger: InventoryLedger, reveal: RevealService, max_draw_count: u32) -> Self {
        Self {
            ledger,
            reveal,
            max_draw_count,
        }
    }

    /// 抽奖:
    /// 1. 校验数量
    /// 2. 未指定模式时跟随文档的彩排开关
    /// 3. 由账本抽样并按模式提交
    /// 4. 创建揭晓会话
    pub async fn draw(&self, request: DrawRequest) -> AppResult<DrawResponse> {
        if request.count == 0 || request.count > self.max_draw_count {
            return Err(AppError::ValidationError(format!(
                "Draw count must be between 1 and {}",
                self.max_draw_count
            )));
        }

        let mode = request
            .mode
            .unwrap_or_else(|| DrawMode::from_test_mode(self.ledger.snapshot().is_test_mode));

        let result = self.ledger.draw(request.count, mode).await?;
        log::info!(
            "Draw of {} in {:?} mode: {:?}",
            request.count,
            result.mode,
            result.outcome.ranks
        );

        let reveal = self
            .reveal
            .start_session(result.items, result.display_mode)
            .await?;

        Ok(DrawResponse {
            session_id: reveal.session_id,
            mode: result.mode,
            outcome: result.outcome,
            total_remaining: result.total_remaining,
            reveal,
        })
    }

    pub fn status(&self) -> DrawStatusResponse {
        let doc = self.ledger.snapshot();
        let total_quantity = doc.prizes.total_quantity();
        let total_remaining = doc.prizes.total_remaining();
        let is_finished = total_remaining == 0;

        DrawStatusResponse {
            prizes: doc.prizes.prizes().to_vec(),
            display_mode: doc.display_mode,
            is_closed: doc.is_closed,
            is_test_mode: doc.is_test_mode,
            notice_message: doc.notice_message,
            theme_color: doc.theme_color,
            total_quantity,
            total_remaining,
            is_finished,
            is_unavailable: is_finished || doc.is_closed,
            low_stock_warning: total_remaining > 0 && total_remaining <= LOW_STOCK_THRESHOLD,
        }
    }
}
