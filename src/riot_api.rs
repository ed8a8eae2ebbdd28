use crate::error::FetchError;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use std::collections::VecDeque;
use std::env;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

const BASE_URL: &str = "https://europe.api.riotgames.com";
/// Request budget per two-minute window of a development API key.
pub const DEFAULT_MAX_REQS_PER_2MIN: usize = 80;
const DEFAULT_MAX_REQS_PER_SEC: usize = 20;
const TWO_MINUTES: Duration = Duration::from_secs(120);
const ONE_SECOND: Duration = Duration::from_secs(1);

fn build_headers() -> Result<HeaderMap, FetchError> {
    let api_key = env::var("RIOT_API_KEY").map_err(|_| FetchError::MissingApiKey)?;

    let mut headers = HeaderMap::new();
    headers.insert("X-Riot-Token", HeaderValue::from_str(&api_key)?);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Ok(headers)
}

/// Match-v5 client returning raw match payloads for ingestion.
pub struct RiotClient {
    client: Client,
    headers: HeaderMap,
    base_url: String,
    limiter: Mutex<RateLimiter>,
}

impl RiotClient {
    pub fn new_with_max(max_reqs_per_2min: usize) -> Result<Self, FetchError> {
        Ok(Self {
            client: Client::new(),
            headers: build_headers()?,
            base_url: BASE_URL.to_string(),
            limiter: Mutex::new(RateLimiter::new(
                max_reqs_per_2min,
                DEFAULT_MAX_REQS_PER_SEC,
            )),
        })
    }

    pub async fn get_match_ids_by_puuid(
        &self,
        puuid: &str,
        count: usize,
    ) -> Result<Vec<String>, FetchError> {
        let url = format!(
            "{}/lol/match/v5/matches/by-puuid/{}/ids?start=0&count={}",
            self.base_url, puuid, count
        );

        let response = self.request_with_retry(&url).await?;
        Ok(response.json().await?)
    }

    /// The body is returned untouched so it can go through the ingestion
    /// decoder like any other payload.
    pub async fn get_match_payload(&self, match_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/lol/match/v5/matches/{}", self.base_url, match_id);

        let response = self.request_with_retry(&url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn request_with_retry(&self, url: &str) -> Result<Response, FetchError> {
        const MAX_ATTEMPTS: usize = 2;
        let mut attempt = 0;

        loop {
            attempt += 1;

            self.limiter.lock().await.wait().await;

            debug!(url, attempt, "GET");
            let response = self
                .client
                .get(url)
                .headers(self.headers.clone())
                .send()
                .await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= MAX_ATTEMPTS {
                    return Err(FetchError::RateLimited {
                        url: url.to_string(),
                    });
                }

                let backoff = parse_retry_after(&response).unwrap_or(Duration::from_secs(10));
                warn!(url, backoff_secs = backoff.as_secs(), "rate limited, backing off");
                sleep(backoff).await;
                continue;
            }

            if !response.status().is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: response.status(),
                });
            }

            return Ok(response);
        }
    }
}

/// Sliding-window limiter over a per-second and a per-two-minute budget.
pub struct RateLimiter {
    max_reqs_per_2min: usize,
    max_reqs_per_sec: usize,
    timestamps_2min: VecDeque<Instant>,
    timestamps_1s: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_reqs_per_2min: usize, max_reqs_per_sec: usize) -> Self {
        Self {
            max_reqs_per_2min: max_reqs_per_2min.max(1),
            max_reqs_per_sec: max_reqs_per_sec.max(1),
            timestamps_2min: VecDeque::new(),
            timestamps_1s: VecDeque::new(),
        }
    }

    pub async fn wait(&mut self) {
        while let Some(duration) = self.delay_needed(Instant::now()) {
            sleep(duration).await;
        }

        let timestamp = Instant::now();
        self.timestamps_1s.push_back(timestamp);
        self.timestamps_2min.push_back(timestamp);
    }

    fn delay_needed(&mut self, now: Instant) -> Option<Duration> {
        self.prune(now);

        let window_wait = |timestamps: &VecDeque<Instant>, max: usize, window: Duration| {
            if timestamps.len() < max {
                return None;
            }
            timestamps
                .front()
                .map(|oldest| now.duration_since(*oldest))
                .filter(|elapsed| *elapsed < window)
                .map(|elapsed| window - elapsed)
        };

        window_wait(&self.timestamps_1s, self.max_reqs_per_sec, ONE_SECOND).or_else(|| {
            window_wait(&self.timestamps_2min, self.max_reqs_per_2min, TWO_MINUTES)
        })
    }

    fn prune(&mut self, now: Instant) {
        prune_window(&mut self.timestamps_1s, now, ONE_SECOND);
        prune_window(&mut self.timestamps_2min, now, TWO_MINUTES);
    }
}

fn prune_window(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = timestamps.front() {
        if now.duration_since(*front) > window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
