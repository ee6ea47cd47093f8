use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::checkin::{error::LookupError, repos::ParticipantDirectory};
use crate::model::participant::{LocalityCode, Participant};

const MAX_ENTRIES: u64 = 100_000;

/// Memoizes directory lookups for a short TTL.
///
/// Only positive answers are cached: a participant registered a minute ago
/// must be found on their first scan.
pub struct CachedDirectory {
    inner: Arc<dyn ParticipantDirectory>,
    participants: Cache<String, Participant>,
    enrollments: Cache<(u64, u32), ()>,
    localities: Cache<String, LocalityCode>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn ParticipantDirectory>, ttl: Duration) -> Self {
        fn build<K, V>(ttl: Duration) -> Cache<K, V>
        where
            K: std::hash::Hash + Eq + Send + Sync + 'static,
            V: Clone + Send + Sync + 'static,
        {
            Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(ttl)
                .build()
        }

        Self {
            inner,
            participants: build(ttl),
            enrollments: build(ttl),
            localities: build(ttl),
        }
    }
}

#[async_trait::async_trait]
impl ParticipantDirectory for CachedDirectory {
    async fn find_by_scan_code(&self, scan_code: &str) -> anyhow::Result<Option<Participant>> {
        if let Some(hit) = self.participants.get(scan_code).await {
            return Ok(Some(hit));
        }
        let found = self.inner.find_by_scan_code(scan_code).await?;
        if let Some(participant) = &found {
            self.participants
                .insert(scan_code.to_string(), participant.clone())
                .await;
        }
        Ok(found)
    }

    async fn is_enrolled(&self, participant_id: u64, event_type_id: u32) -> anyhow::Result<bool> {
        let key = (participant_id, event_type_id);
        if self.enrollments.contains_key(&key) {
            return Ok(true);
        }
        let enrolled = self.inner.is_enrolled(participant_id, event_type_id).await?;
        if enrolled {
            self.enrollments.insert(key, ()).await;
        }
        Ok(enrolled)
    }

    async fn resolve_locality(&self, device_id: &str) -> Result<LocalityCode, LookupError> {
        if let Some(hit) = self.localities.get(device_id).await {
            return Ok(hit);
        }
        let code = self.inner.resolve_locality(device_id).await?;
        log::debug!("Caching locality {} for device {}", code, device_id);
        self.localities
            .insert(device_id.to_string(), code.clone())
            .await;
        Ok(code)
    }
}
