use chrono::Utc;
use futures_util::future::BoxFuture;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use super::document_store::{DocumentStore, KeyedListeners};
use crate::entities::document_entity as documents;
use crate::error::{AppError, AppResult};
use crate::models::PrizeDocument;
use crate::utils::{Listener, Subscription};

/// 基于 Postgres 的文档存储
///
/// 单行 upsert 保证整体写入；订阅只覆盖本进程内的写入。
#[derive(Clone)]
pub struct DatabaseDocumentStore {
    pool: DatabaseConnection,
    listeners: KeyedListeners,
}

impl DatabaseDocumentStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self {
            pool,
            listeners: KeyedListeners::default(),
        }
    }
}

impl DocumentStore for DatabaseDocumentStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, AppResult<Option<PrizeDocument>>> {
        Box::pin(async move {
            let row = documents::Entity::find_by_id(key.to_string())
                .one(&self.pool)
                .await
                .map_err(|e| AppError::PersistenceFailure(format!("load {key}: {e}")))?;
            match row {
                Some(m) => Ok(Some(serde_json::from_value(m.body)?)),
                None => Ok(None),
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, document: &'a PrizeDocument) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            let body = serde_json::to_value(document)?;
            let model = documents::ActiveModel {
                doc_key: Set(key.to_string()),
                body: Set(body),
                updated_at: Set(Utc::now()),
            };
            documents::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(documents::Column::DocKey)
                        .update_columns([documents::Column::Body, documents::Column::UpdatedAt])
                        .to_owned(),
                )
                .exec(&self.pool)
                .await
                .map_err(|e| AppError::PersistenceFailure(format!("save {key}: {e}")))?;

            self.listeners.notify(key, document);
            Ok(())
        })
    }

    fn subscribe(&self, key: &str, on_change: Listener<PrizeDocument>) -> Subscription {
        self.listeners.subscribe(key, on_change)
    }
}
