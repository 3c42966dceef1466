//! Model discovery against the local server.

use anyhow::{Context, Result};

use super::client::ModelSettings;
use super::types::ModelList;

/// Model ids served by `GET {base_url}/v1/models`.
pub async fn list_models(settings: &ModelSettings) -> Result<Vec<String>> {
    let url = settings.url("/v1/models");
    let response = reqwest::get(&url)
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("{} returned HTTP {}: {}", url, status.as_u16(), body);
    }

    let list: ModelList = response
        .json()
        .await
        .with_context(|| format!("Unexpected response from {}", url))?;
    Ok(list.data.into_iter().map(|m| m.id).collect())
}
