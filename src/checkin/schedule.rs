use chrono::NaiveDate;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::error::ScheduleError;
use crate::model::{participant::LocalityCode, prayer::DailySchedule};

/// Source of daily prayer times for a locality.
#[async_trait::async_trait]
pub trait ScheduleProvider: Send + Sync {
    async fn daily_schedule(
        &self,
        locality: &LocalityCode,
        date: NaiveDate,
    ) -> Result<DailySchedule, ScheduleError>;
}

#[derive(Deserialize)]
struct ScheduleEnvelope {
    data: ScheduleData,
}

#[derive(Deserialize)]
struct ScheduleData {
    jadwal: DailySchedule,
}

/// Client for the myquran.com prayer schedule API.
pub struct MyQuranClient {
    client: Client,
    base_url: String,
}

impl MyQuranClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn schedule_url(&self, locality: &LocalityCode, date: NaiveDate) -> String {
        format!(
            "{}/sholat/jadwal/{}/{}",
            self.base_url,
            locality,
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait::async_trait]
impl ScheduleProvider for MyQuranClient {
    async fn daily_schedule(
        &self,
        locality: &LocalityCode,
        date: NaiveDate,
    ) -> Result<DailySchedule, ScheduleError> {
        let url = self.schedule_url(locality, date);
        debug!(url = %url, "Fetching prayer schedule");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScheduleError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let envelope: ScheduleEnvelope = serde_json::from_slice(&body)?;
        Ok(envelope.data.jadwal)
    }
}

type ScheduleKey = (LocalityCode, NaiveDate);

/// Memoizes daily schedules per (locality, date).
///
/// Entries expire after `ttl`. The first lookup for a later local date drops
/// every entry, so nothing fetched for yesterday outlives midnight. Concurrent
/// misses on one key share a single provider call.
pub struct ScheduleCache {
    provider: Arc<dyn ScheduleProvider>,
    entries: Cache<ScheduleKey, Arc<DailySchedule>>,
    current_date: Mutex<Option<NaiveDate>>,
}

impl ScheduleCache {
    pub fn new(provider: Arc<dyn ScheduleProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            entries: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
            current_date: Mutex::new(None),
        }
    }

    pub async fn get(
        &self,
        locality: &LocalityCode,
        date: NaiveDate,
    ) -> Result<Arc<DailySchedule>, Arc<ScheduleError>> {
        self.roll_over(date);

        let provider = self.provider.clone();
        let owned = locality.clone();
        self.entries
            .try_get_with((locality.clone(), date), async move {
                let schedule = provider.daily_schedule(&owned, date).await?;
                if schedule.is_empty() {
                    warn!(locality = %owned, %date, "Provider returned an empty prayer schedule");
                }
                info!(locality = %owned, %date, entries = schedule.len(), "Prayer schedule cached");
                Ok::<_, ScheduleError>(Arc::new(schedule))
            })
            .await
    }

    fn roll_over(&self, date: NaiveDate) {
        let mut current = self
            .current_date
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match *current {
            Some(cached) if cached >= date => {}
            Some(cached) => {
                info!(from = %cached, to = %date, "Local date changed, dropping cached schedules");
                self.entries.invalidate_all();
                *current = Some(date);
            }
            None => *current = Some(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::inmemory::StaticScheduleProvider;
    use futures::future::join_all;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn jkt() -> LocalityCode {
        LocalityCode::from("1301".to_string())
    }

    #[test]
    fn builds_provider_url() {
        let client = MyQuranClient::new("https://api.myquran.com/v2/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.schedule_url(&jkt(), date(20)),
            "https://api.myquran.com/v2/sholat/jadwal/1301/2025-03-20"
        );
    }

    #[test]
    fn decodes_provider_envelope() {
        let body = r#"{
            "status": true,
            "data": {
                "id": 1301,
                "lokasi": "KOTA JAKARTA",
                "jadwal": {
                    "tanggal": "Kamis, 20/03/2025",
                    "imsak": "04:35",
                    "subuh": "04:45",
                    "terbit": "05:58",
                    "dzuhur": "12:05",
                    "ashar": "15:20",
                    "maghrib": "18:02",
                    "isya": "19:15",
                    "date": "2025-03-20"
                }
            }
        }"#;
        let envelope: ScheduleEnvelope = serde_json::from_str(body).unwrap();
        let names: Vec<&str> = envelope.data.jadwal.iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec!["tanggal", "imsak", "subuh", "terbit", "dzuhur", "ashar", "maghrib", "isya", "date"]
        );
    }

    #[actix_web::test]
    async fn same_key_within_ttl_fetches_once() {
        let provider = Arc::new(StaticScheduleProvider::jakarta());
        let cache = ScheduleCache::new(provider.clone(), Duration::from_secs(6 * 3600));

        cache.get(&jkt(), date(20)).await.unwrap();
        cache.get(&jkt(), date(20)).await.unwrap();

        assert_eq!(provider.fetches(), 1);
    }

    #[actix_web::test]
    async fn concurrent_misses_share_one_fetch() {
        let provider = Arc::new(StaticScheduleProvider::jakarta().with_delay(Duration::from_millis(30)));
        let cache = ScheduleCache::new(provider.clone(), Duration::from_secs(6 * 3600));

        let locality = jkt();
        let results = join_all((0..8).map(|_| cache.get(&locality, date(20)))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(provider.fetches(), 1);
    }

    #[actix_web::test]
    async fn date_rollover_drops_every_entry() {
        let provider = Arc::new(StaticScheduleProvider::jakarta());
        let cache = ScheduleCache::new(provider.clone(), Duration::from_secs(6 * 3600));
        let other = LocalityCode::from("1609".to_string());

        cache.get(&jkt(), date(20)).await.unwrap();
        cache.get(&other, date(20)).await.unwrap();
        assert_eq!(provider.fetches(), 2);

        cache.get(&jkt(), date(21)).await.unwrap();
        assert_eq!(provider.fetches(), 3);

        // yesterday's entry was dropped with the rest
        cache.get(&other, date(20)).await.unwrap();
        assert_eq!(provider.fetches(), 4);
    }

    #[actix_web::test]
    async fn failures_are_not_cached() {
        let provider = Arc::new(StaticScheduleProvider::jakarta());
        let cache = ScheduleCache::new(provider.clone(), Duration::from_secs(6 * 3600));

        provider.set_failing(true);
        assert!(cache.get(&jkt(), date(20)).await.is_err());

        provider.set_failing(false);
        assert!(cache.get(&jkt(), date(20)).await.is_ok());
        assert_eq!(provider.fetches(), 2);
    }

    #[actix_web::test]
    async fn empty_schedule_is_still_cached() {
        let provider = Arc::new(StaticScheduleProvider::new(DailySchedule::new(vec![])));
        let cache = ScheduleCache::new(provider.clone(), Duration::from_secs(6 * 3600));

        assert!(cache.get(&jkt(), date(20)).await.unwrap().is_empty());
        assert!(cache.get(&jkt(), date(20)).await.unwrap().is_empty());
        assert_eq!(provider.fetches(), 1);
    }
}
