use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};

use crate::{
    error::DirectoryError,
    models::{PushSubscription, User, UserContact},
};

pub const USERS_COLLECTION: &str = "users";
pub const SUBSCRIPTIONS_COLLECTION: &str = "push_subscriptions";

/// Who to notify, and where.
#[async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    /// Unknown users resolve to an empty contact.
    async fn get_contact(&self, user_id: &str) -> Result<UserContact, DirectoryError>;

    async fn list_push_subscriptions(
        &self,
        user_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, Vec<PushSubscription>>, DirectoryError>;

    /// Upsert keyed by endpoint; a browser re-subscribing moves the row to
    /// the new owner.
    async fn save_subscription(&self, sub: &PushSubscription) -> Result<(), DirectoryError>;

    async fn remove_subscription(&self, user_id: &str, endpoint: &str) -> Result<(), DirectoryError>;
}

#[derive(Clone)]
pub struct MongoDirectory {
    users: Collection<User>,
    subscriptions: Collection<PushSubscription>,
}

impl MongoDirectory {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection::<User>(USERS_COLLECTION),
            subscriptions: db.collection::<PushSubscription>(SUBSCRIPTIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl SubscriptionDirectory for MongoDirectory {
    async fn get_contact(&self, user_id: &str) -> Result<UserContact, DirectoryError> {
        let user = self.users.find_one(doc! { "_id": user_id }, None).await?;
        Ok(user.map(UserContact::from).unwrap_or_default())
    }

    async fn list_push_subscriptions(
        &self,
        user_ids: &BTreeSet<String>,
    ) -> Result<HashMap<String, Vec<PushSubscription>>, DirectoryError> {
        let mut by_user: HashMap<String, Vec<PushSubscription>> = HashMap::new();
        if user_ids.is_empty() {
            return Ok(by_user);
        }

        let ids: Vec<&str> = user_ids.iter().map(String::as_str).collect();
        let mut cursor = self
            .subscriptions
            .find(doc! { "user_id": { "$in": ids } }, None)
            .await?;

        while let Some(item) = cursor.next().await {
            let sub = item?;
            by_user.entry(sub.user_id.clone()).or_default().push(sub);
        }

        Ok(by_user)
    }

    async fn save_subscription(&self, sub: &PushSubscription) -> Result<(), DirectoryError> {
        self.subscriptions
            .update_one(
                doc! { "endpoint": &sub.endpoint },
                doc! {
                    "$set": {
                        "user_id": &sub.user_id,
                        "p256dh": &sub.p256dh,
                        "auth": &sub.auth,
                        "user_agent": sub.user_agent.clone(),
                        "updated_at": sub.updated_at,
                    }
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    async fn remove_subscription(&self, user_id: &str, endpoint: &str) -> Result<(), DirectoryError> {
        self.subscriptions
            .delete_one(doc! { "user_id": user_id, "endpoint": endpoint }, None)
            .await?;
        Ok(())
    }
}
