use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// 揭晓流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RevealState {
    Idle,
    Revealing,
    Summary,
    ShippingCollection,
    Done,
}

/// 汇总: 按 (rank, name) 分组计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealSummaryEntry {
    pub rank: u32,
    pub name: String,
    pub count: u32,
    pub requires_shipping: bool,
    /// 按展示方式渲染的文案
    pub label: String,
}

/// 单个结果的揭晓状态
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealItemView {
    pub index: usize,
    /// 是否为需要点击揭晓的高等级
    pub high: bool,
    pub revealed: bool,
    /// 已点击、等待延迟结束
    pub pending: bool,
    /// 未揭晓时隐藏
    pub rank: Option<u32>,
    pub label: Option<String>,
}

/// 揭晓会话视图
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealView {
    pub session_id: Uuid,
    pub state: RevealState,
    pub items: Vec<RevealItemView>,
    /// 进入 Summary 后才有
    pub summary: Option<Vec<RevealSummaryEntry>>,
    pub needs_shipping: bool,
    /// 已触发的庆祝效果次数
    pub celebrations: u32,
}
