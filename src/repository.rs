use crate::models::UserProfile;
use async_trait::async_trait;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use uuid::Uuid;

/// ProfileRepository
///
/// The persistence contract the session resolvers depend on. Only role lookup
/// lives here; every other table of the hosted backend is out of reach of the gate.
///
/// **Send + Sync + async_trait** keep `Arc<dyn ProfileRepository>` shareable
/// across Axum's task boundaries.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetches the profile row for an authenticated user id. `Ok(None)` means
    /// the user exists in auth but has no profile yet.
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the profile lookup.
pub type RepositoryState = Arc<dyn ProfileRepository>;

/// PostgresRepository
///
/// Reads `public.profiles` through the pooled connection.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as::<_, UserProfile>(
            r#"SELECT id, email, role FROM public.profiles WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("get_profile error: {:?}", e);
            e
        })
    }
}

/// InMemoryProfileRepository
///
/// A fixed set of profiles held in memory. Used by the test suites and handy
/// for running the gate without a database.
#[derive(Default, Clone)]
pub struct InMemoryProfileRepository {
    profiles: HashMap<Uuid, UserProfile>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profiles.insert(profile.id, profile);
        self
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        Ok(self.profiles.get(&id).cloned())
    }
}
