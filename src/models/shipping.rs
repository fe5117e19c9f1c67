use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::shipping_record_entity;

/// 需要配送的奖品条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ShippingPrize {
    pub rank: u32,
    pub name: String,
    pub count: u32,
}

/// 配送信息记录（只追加）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRecord {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub prizes: Vec<ShippingPrize>,
    pub created_at: DateTime<Utc>,
}

/// 提交配送信息
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitShippingRequest {
    pub session_id: Uuid,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    /// 同意收集个人信息
    #[serde(default)]
    pub agreed: bool,
}

/// 管理端查看的配送记录
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRecordResponse {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    pub prizes: Vec<ShippingPrize>,
    pub created_at: DateTime<Utc>,
}

impl ShippingRecordResponse {
    pub fn from_record(id: i64, record: ShippingRecord) -> Self {
        ShippingRecordResponse {
            id,
            name: record.name,
            phone: record.phone,
            address: record.address,
            prizes: record.prizes,
            created_at: record.created_at,
        }
    }
}

impl TryFrom<shipping_record_entity::Model> for ShippingRecordResponse {
    type Error = serde_json::Error;

    fn try_from(m: shipping_record_entity::Model) -> Result<Self, Self::Error> {
        Ok(ShippingRecordResponse {
            id: m.id,
            name: m.name,
            phone: m.phone,
            address: m.address,
            prizes: serde_json::from_value(m.prizes)?,
            created_at: m.created_at,
        })
    }
}
