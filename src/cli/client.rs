//! HTTP client for the running Mount Radio service.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{ServiceStatus, SettingsView};

pub struct RadioClient {
    client: reqwest::Client,
    base_url: String,
}

impl RadioClient {
    pub fn new(port: u16) -> Self {
        Self::with_base_url(format!("http://127.0.0.1:{}", port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn status(&self) -> Result<ServiceStatus> {
        let json = self.get("/status").await?;
        serde_json::from_value(json).context("Unexpected status response")
    }

    pub async fn settings(&self) -> Result<SettingsView> {
        let json = self.get("/settings").await?;
        serde_json::from_value(json).context("Unexpected settings response")
    }

    pub async fn set_stream_url(&self, url: &str) -> Result<SettingsView> {
        let response = self
            .client
            .put(self.url("/settings"))
            .json(&json!({ "stream_url": url }))
            .send()
            .await
            .context("Failed to connect to Mount Radio service. Is it running?")?;
        let json = Self::read(response).await?;
        serde_json::from_value(json).context("Unexpected settings response")
    }

    pub async fn toggle(&self) -> Result<Value> {
        self.post("/toggle", &json!({})).await
    }

    pub async fn set_volume(&self, value: &str) -> Result<Value> {
        self.post("/volume", &json!({ "value": value })).await
    }

    pub async fn toggle_auto_start(&self) -> Result<Value> {
        self.post("/auto-start", &json!({})).await
    }

    pub async fn toggle_auto_stop(&self) -> Result<Value> {
        self.post("/auto-stop", &json!({})).await
    }

    pub async fn report_condition(&self, flag: &str, value: bool) -> Result<Value> {
        self.post("/condition", &json!({ "flag": flag, "value": value }))
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .context("Failed to connect to Mount Radio service. Is it running?")?;
        Self::read(response).await
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .context("Failed to connect to Mount Radio service. Is it running?")?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let json: Value = response
            .json()
            .await
            .context("Failed to parse service response")?;

        if !status.is_success() {
            bail!("{}", message_of(&json).unwrap_or("Unknown error"));
        }
        Ok(json)
    }
}

/// The human-readable `message` field of a service response.
pub fn message_of(json: &Value) -> Option<&str> {
    json.get("message").and_then(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let client = RadioClient::new(4000);
        assert_eq!(client.base_url(), "http://127.0.0.1:4000");
        assert_eq!(client.url("/status"), "http://127.0.0.1:4000/status");
    }

    #[test]
    fn test_message_of() {
        let json = json!({ "success": true, "message": "Radio playback started." });
        assert_eq!(message_of(&json), Some("Radio playback started."));
        assert_eq!(message_of(&json!({ "success": true })), None);
    }
}
