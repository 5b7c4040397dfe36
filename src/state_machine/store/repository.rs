use std::collections::HashMap;
use std::marker::PhantomData;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::state_machine::core::Aggregate;

// ============================================================================
// Aggregate Repository - Persistence Boundary
// ============================================================================
//
// Responsibilities:
// 1. Load an aggregate by identity (state label + scalar fields + children)
// 2. Persist a changed aggregate as one atomic write
// 3. Ensure optimistic concurrency control
//
// Durable backends live outside this crate. The in-memory implementation
// below keeps the same contract and is what the service and tests run on.
//
// ============================================================================

#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Load an aggregate, `None` when it was never saved
    async fn load(&self, aggregate_id: Uuid) -> Result<Option<A>>;

    /// Persist the aggregate. The aggregate's current version is the
    /// expected stored version; on success the new version is written back
    /// into the aggregate and returned.
    async fn save(&self, aggregate: &mut A) -> Result<i64>;

    /// Check if aggregate exists
    async fn exists(&self, aggregate_id: Uuid) -> Result<bool> {
        Ok(self.load(aggregate_id).await?.is_some())
    }

    /// Identities of every aggregate whose state label equals `state`
    async fn ids_in_state(&self, state: &str) -> Result<Vec<Uuid>>;
}

/// Stored row: state label column plus a JSON snapshot of the aggregate
#[derive(Debug, Clone)]
struct StoredAggregate {
    version: i64,
    state: String,
    snapshot: String,
    updated_at: DateTime<Utc>,
}

pub struct InMemoryRepository<A> {
    aggregate_type_name: String,  // e.g., "Order"
    rows: RwLock<HashMap<Uuid, StoredAggregate>>,
    _phantom: PhantomData<fn() -> A>,
}

impl<A> InMemoryRepository<A> {
    pub fn new(aggregate_type_name: &str) -> Self {
        Self {
            aggregate_type_name: aggregate_type_name.to_string(),
            rows: RwLock::new(HashMap::new()),
            _phantom: PhantomData,
        }
    }

    /// Number of stored aggregates
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Last write time for an aggregate
    pub async fn updated_at(&self, aggregate_id: Uuid) -> Option<DateTime<Utc>> {
        self.rows.read().await.get(&aggregate_id).map(|row| row.updated_at)
    }
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: Aggregate + Serialize + DeserializeOwned,
{
    async fn load(&self, aggregate_id: Uuid) -> Result<Option<A>> {
        let rows = self.rows.read().await;

        let Some(row) = rows.get(&aggregate_id) else {
            tracing::debug!(
                aggregate_id = %aggregate_id,
                aggregate_type = %self.aggregate_type_name,
                "Aggregate not found"
            );
            return Ok(None);
        };

        let mut aggregate: A = serde_json::from_str(&row.snapshot).with_context(|| {
            format!("Failed to decode {} snapshot {}", self.aggregate_type_name, aggregate_id)
        })?;
        aggregate.set_version(row.version);

        tracing::debug!(
            aggregate_id = %aggregate_id,
            version = row.version,
            state = %row.state,
            "Loaded aggregate"
        );

        Ok(Some(aggregate))
    }

    async fn save(&self, aggregate: &mut A) -> Result<i64> {
        let aggregate_id = aggregate.aggregate_id();
        let expected_version = aggregate.version();

        let mut rows = self.rows.write().await;

        // Check optimistic concurrency
        let current_version = rows.get(&aggregate_id).map(|row| row.version).unwrap_or(0);
        if current_version != expected_version {
            bail!(
                "Concurrency conflict: expected version {}, but current is {}",
                expected_version,
                current_version
            );
        }

        let new_version = expected_version + 1;
        aggregate.set_version(new_version);

        let snapshot = match serde_json::to_string(&*aggregate) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                aggregate.set_version(expected_version);
                return Err(e).context("Failed to encode aggregate snapshot");
            }
        };

        let state = aggregate.current_state().to_string();
        rows.insert(
            aggregate_id,
            StoredAggregate {
                version: new_version,
                state: state.clone(),
                snapshot,
                updated_at: Utc::now(),
            },
        );

        tracing::info!(
            aggregate_id = %aggregate_id,
            aggregate_type = %self.aggregate_type_name,
            new_version = new_version,
            state = %state,
            "✅ Persisted aggregate"
        );

        Ok(new_version)
    }

    async fn ids_in_state(&self, state: &str) -> Result<Vec<Uuid>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|(_, row)| row.state == state)
            .map(|(id, _)| *id)
            .collect())
    }
}
