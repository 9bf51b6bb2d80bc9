use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{Collection, Database};

use crate::{
    error::StoreError,
    models::{Alert, AlertPatch},
};

pub const ALERTS_COLLECTION: &str = "price_alerts";

/// System of record for alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Alert>, StoreError>;

    async fn find_for_user(&self, id: &ObjectId, user_id: &str) -> Result<Option<Alert>, StoreError>;

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError>;

    /// Applies `patch` and returns the updated row. With `require_active` the
    /// write only lands if the row is still active; otherwise
    /// `StoreError::NotFoundOrStale`.
    async fn update(
        &self,
        id: &ObjectId,
        patch: &AlertPatch,
        require_active: bool,
    ) -> Result<Alert, StoreError>;

    /// Returns false when nothing matched.
    async fn delete_for_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct MongoAlertStore {
    alerts: Collection<Alert>,
}

impl MongoAlertStore {
    pub fn new(db: &Database) -> Self {
        Self {
            alerts: db.collection::<Alert>(ALERTS_COLLECTION),
        }
    }

    async fn collect(
        &self,
        filter: Document,
        opts: Option<FindOptions>,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut cursor = self.alerts.find(filter, opts).await?;

        let mut items: Vec<Alert> = Vec::new();
        while let Some(res) = cursor.next().await {
            items.push(res?);
        }
        Ok(items)
    }
}

fn opt_bson<T: Into<Bson>>(v: Option<T>) -> Bson {
    v.map(Into::into).unwrap_or(Bson::Null)
}

fn set_document(patch: &AlertPatch) -> Document {
    let mut set = doc! { "updated_at": patch.updated_at };

    if let Some(v) = patch.target_price {
        set.insert("target_price", v);
    }
    if let Some(v) = patch.direction {
        set.insert("direction", v.as_str());
    }
    if let Some(v) = &patch.comment {
        set.insert("comment", opt_bson(v.clone()));
    }
    if let Some(v) = patch.expires_at {
        set.insert("expires_at", opt_bson(v));
    }
    if let Some(v) = patch.active {
        set.insert("active", v);
    }
    if let Some(v) = patch.triggered_at {
        set.insert("triggered_at", opt_bson(v));
    }
    if let Some(v) = patch.last_checked_price {
        set.insert("last_checked_price", v);
    }

    set
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn list_active(&self) -> Result<Vec<Alert>, StoreError> {
        self.collect(doc! { "active": true }, None).await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Alert>, StoreError> {
        let find_opts = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        self.collect(doc! { "user_id": user_id }, Some(find_opts)).await
    }

    async fn find_for_user(&self, id: &ObjectId, user_id: &str) -> Result<Option<Alert>, StoreError> {
        let found = self
            .alerts
            .find_one(doc! { "_id": *id, "user_id": user_id }, None)
            .await?;
        Ok(found)
    }

    async fn insert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.alerts.insert_one(alert, None).await?;
        Ok(())
    }

    async fn update(
        &self,
        id: &ObjectId,
        patch: &AlertPatch,
        require_active: bool,
    ) -> Result<Alert, StoreError> {
        let mut filter = doc! { "_id": *id };
        if require_active {
            filter.insert("active", true);
        }

        let opts = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.alerts
            .find_one_and_update(filter, doc! { "$set": set_document(patch) }, opts)
            .await?
            .ok_or(StoreError::NotFoundOrStale)
    }

    async fn delete_for_user(&self, id: &ObjectId, user_id: &str) -> Result<bool, StoreError> {
        let res = self
            .alerts
            .delete_one(doc! { "_id": *id, "user_id": user_id }, None)
            .await?;
        Ok(res.deleted_count > 0)
    }
}
