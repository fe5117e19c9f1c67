use futures_util::future::BoxFuture;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::{Arc, Mutex, PoisonError};

use crate::entities::shipping_record_entity as shipping_records;
use crate::error::{AppError, AppResult};
use crate::models::{ShippingRecord, ShippingRecordResponse};

/// 配送信息落地（只追加）；list / purge 仅供管理端使用
pub trait ShippingSink: Send + Sync {
    /// 返回记录ID
    fn append<'a>(&'a self, record: &'a ShippingRecord) -> BoxFuture<'a, AppResult<i64>>;

    /// 最新在前
    fn list(&self) -> BoxFuture<'_, AppResult<Vec<ShippingRecordResponse>>>;

    /// 返回删除条数
    fn purge(&self) -> BoxFuture<'_, AppResult<u64>>;
}

#[derive(Clone, Default)]
pub struct MemoryShippingSink {
    records: Arc<Mutex<Vec<ShippingRecord>>>,
}

impl MemoryShippingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ShippingSink for MemoryShippingSink {
    fn append<'a>(&'a self, record: &'a ShippingRecord) -> BoxFuture<'a, AppResult<i64>> {
        Box::pin(async move {
            let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            records.push(record.clone());
            Ok(records.len() as i64)
        })
    }

    fn list(&self) -> BoxFuture<'_, AppResult<Vec<ShippingRecordResponse>>> {
        Box::pin(async move {
            let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(records
                .iter()
                .enumerate()
                .rev()
                .map(|(i, r)| ShippingRecordResponse::from_record(i as i64 + 1, r.clone()))
                .collect())
        })
    }

    fn purge(&self) -> BoxFuture<'_, AppResult<u64>> {
        Box::pin(async move {
            let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
            let n = records.len() as u64;
            records.clear();
            Ok(n)
        })
    }
}

#[derive(Clone)]
pub struct DatabaseShippingSink {
    pool: DatabaseConnection,
}

impl DatabaseShippingSink {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

impl ShippingSink for DatabaseShippingSink {
    fn append<'a>(&'a self, record: &'a ShippingRecord) -> BoxFuture<'a, AppResult<i64>> {
        Box::pin(async move {
            let model = shipping_records::ActiveModel {
                name: Set(record.name.clone()),
                phone: Set(record.phone.clone()),
                address: Set(record.address.clone()),
                prizes: Set(serde_json::to_value(&record.prizes)?),
                created_at: Set(record.created_at),
                ..Default::default()
            };
            let inserted = shipping_records::Entity::insert(model)
                .exec(&self.pool)
                .await
                .map_err(|e| AppError::PersistenceFailure(format!("append shipping record: {e}")))?;
            Ok(inserted.last_insert_id)
        })
    }

    fn list(&self) -> BoxFuture<'_, AppResult<Vec<ShippingRecordResponse>>> {
        Box::pin(async move {
            let rows = shipping_records::Entity::find()
                .order_by_desc(shipping_records::Column::CreatedAt)
                .all(&self.pool)
                .await?;
            rows.into_iter()
                .map(|m| ShippingRecordResponse::try_from(m).map_err(AppError::from))
                .collect()
        })
    }

    fn purge(&self) -> BoxFuture<'_, AppResult<u64>> {
        Box::pin(async move {
            let result = shipping_records::Entity::delete_many()
                .exec(&self.pool)
                .await?;
            Ok(result.rows_affected)
        })
    }
}
