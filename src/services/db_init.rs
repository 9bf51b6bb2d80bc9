use mongodb::{
    bson::doc,
    options::IndexOptions,
    Database, IndexModel,
};

use super::{alert_store::ALERTS_COLLECTION, directory::SUBSCRIPTIONS_COLLECTION};

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // alerts: the scan reads every active row
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS_COLLECTION);
        let model = IndexModel::builder()
            .keys(doc! { "active": 1, "company_symbol": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alerts: owner listing, newest first
    {
        let col = db.collection::<mongodb::bson::Document>(ALERTS_COLLECTION);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // push_subscriptions: upserts are keyed by endpoint
    {
        let col = db.collection::<mongodb::bson::Document>(SUBSCRIPTIONS_COLLECTION);
        let model = IndexModel::builder()
            .keys(doc! { "endpoint": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // push_subscriptions: fan-out lookup by owner
    {
        let col = db.collection::<mongodb::bson::Document>(SUBSCRIPTIONS_COLLECTION);
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}
