use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{DisplayMode, Prize, RevealView};

/// 抽奖模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    /// 彩排: 不扣减、不持久化
    Rehearsal,
    /// 正式: 扣减库存并持久化
    Live,
}

impl DrawMode {
    pub fn from_test_mode(is_test_mode: bool) -> Self {
        if is_test_mode {
            DrawMode::Rehearsal
        } else {
            DrawMode::Live
        }
    }
}

/// 一次抽奖的结果: 按抽取顺序排列的等级（即揭晓顺序，不排序）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawOutcome {
    pub ranks: Vec<u32>,
}

impl DrawOutcome {
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// 某等级在结果中出现的次数
    pub fn count_of(&self, rank: u32) -> usize {
        self.ranks.iter().filter(|&&r| r == rank).count()
    }
}

/// 抽中的奖品（由抽样时的同一份快照解析）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawnPrize {
    pub rank: u32,
    pub name: String,
    pub requires_shipping: bool,
}

impl From<&Prize> for DrawnPrize {
    fn from(p: &Prize) -> Self {
        DrawnPrize {
            rank: p.rank,
            name: p.name.clone(),
            requires_shipping: p.requires_shipping,
        }
    }
}

/// 抽奖请求
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    /// 抽取数量 (1..=100)
    pub count: u32,
    /// 不传时跟随配置文档的 isTestMode
    pub mode: Option<DrawMode>,
}

/// 抽奖响应
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawResponse {
    /// 揭晓会话ID
    pub session_id: Uuid,
    pub mode: DrawMode,
    /// 抽取顺序
    #[schema(value_type = Vec<u32>)]
    pub outcome: DrawOutcome,
    /// 抽奖后的剩余总数
    pub total_remaining: u64,
    /// 初始揭晓视图（普通等级已自动揭晓）
    pub reveal: RevealView,
}

/// 抽奖页状态
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawStatusResponse {
    pub prizes: Vec<Prize>,
    pub display_mode: DisplayMode,
    pub is_closed: bool,
    pub is_test_mode: bool,
    pub notice_message: String,
    pub theme_color: String,
    pub total_quantity: u64,
    pub total_remaining: u64,
    /// 剩余为 0
    pub is_finished: bool,
    /// 已售罄或已截止
    pub is_unavailable: bool,
    /// 剩余不多时提示
    pub low_stock_warning: bool,
}
