//! HTTP liveness probe against the public room-status endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Error, Result};

use super::LiveProbe;

const ROOM_INFO_URL: &str = "https://www.tiktok.com/api-live/user/room/";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

// Room status codes as reported by the endpoint.
const STATUS_LIVE: u64 = 2;

pub struct HttpLiveProbe {
    client: Client,
}

impl HttpLiveProbe {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .build()
            .map_err(|e| Error::probe(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LiveProbe for HttpLiveProbe {
    async fn is_live(&self, name: &str, session_id: Option<&str>) -> Result<bool> {
        let mut request = self.client.get(ROOM_INFO_URL).query(&[
            ("aid", "1988"),
            ("sourceType", "54"),
            ("uniqueId", name),
        ]);
        if let Some(session_id) = session_id {
            request = request.header("Cookie", format!("sessionid={session_id}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::probe(format!("room status request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::probe(format!(
                "room status request returned HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::probe(format!("room status body is not JSON: {e}")))?;

        // Absent user data means the account exists but has no live room.
        let room_status = body
            .pointer("/data/user/status")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(room_status == STATUS_LIVE)
    }
}
