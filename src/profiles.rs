use clickhouse::Client;

use crate::models::{UserProfile, UserProfileRow};

/// User-profile lookups against ClickHouse's `users` table (C3). Grounded
/// on `_get_user_profile` in `operators.py`.
#[derive(Clone)]
pub struct ProfileStore {
    client: Client,
}

impl ProfileStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(&self, user_id: u64) -> anyhow::Result<Option<UserProfile>> {
        let row = self
            .client
            .query(
                "SELECT user_id, age, profession, interests FROM users WHERE user_id = ? LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional::<UserProfileRow>()
            .await?;

        Ok(row.map(UserProfile::from))
    }
}
