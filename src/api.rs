use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use std::error::Error;

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(25))
            .build()
            .unwrap_or_default();

        Self { client }
    }

    /// Best-effort display-name lookup against the Steam store. Unknown
    /// apps and odd payloads yield "Unknown Game"; transport errors bubble
    /// up so the caller can log them.
    pub async fn get_game_name(&self, app_id: &str) -> Result<String, Box<dyn Error>> {
        let url = format!(
            "https://store.steampowered.com/api/appdetails?appids={}",
            app_id
        );
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Ok("Unknown Game".to_string());
        }

        // Shape: {"1593500": {"success": true, "data": {"name": "..."}}}
        let root: Value = resp.json().await?;
        Ok(name_from_appdetails(&root, app_id).unwrap_or_else(|| "Unknown Game".to_string()))
    }
}

fn name_from_appdetails(root: &Value, app_id: &str) -> Option<String> {
    let app_data = root.get(app_id)?;
    if app_data.get("success").and_then(|v| v.as_bool()) != Some(true) {
        return None;
    }
    app_data
        .get("data")
        .and_then(|d| d.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string)
}
