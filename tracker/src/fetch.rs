use serde::Deserialize;

/// The punishment statistics endpoint polled by the delivery loop.
pub const DEFAULT_STATS_URL: &str = "https://api.plancke.io/hypixel/v1/punishmentStats";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to stats endpoint failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("stats response missing record")]
    MissingRecord,
}

#[derive(Debug, Deserialize)]
struct PunishmentStats {
    #[serde(default)]
    record: Option<PunishmentRecord>,
}

#[derive(Debug, Deserialize)]
struct PunishmentRecord {
    watchdog_total: u64,
    staff_total: u64,
}

/// One GET per call, no internal retry; the caller's tick cadence is the
/// retry policy. The reqwest client is shared and long-lived.
#[derive(Clone)]
pub struct StatsFetcher {
    client: reqwest::Client,
    url: String,
}

impl StatsFetcher {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub async fn fetch(&self) -> Result<(u64, u64), FetchError> {
        let stats: PunishmentStats = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let record = stats.record.ok_or(FetchError::MissingRecord)?;
        Ok((record.watchdog_total, record.staff_total))
    }
}
