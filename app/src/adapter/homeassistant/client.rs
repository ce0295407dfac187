use std::time::Duration;

use anyhow::Context;
use infrastructure::HttpClientConfig;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;

use super::EntityState;

#[derive(Debug, Clone)]
pub struct HaHttpClient {
    client: ClientWithMiddleware,
    base_url: String,
}

impl HaHttpClient {
    pub fn new(url: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = HttpClientConfig::new(Some(token.to_owned()))
            .with_timeout(timeout)
            .new_tracing_client()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_owned(),
        })
    }
}

impl HaHttpClient {
    pub async fn get_current_state(&self) -> anyhow::Result<Vec<EntityState>> {
        let response = self
            .client
            .get(format!("{}/api/states", self.base_url))
            .send()
            .await
            .context("Error requesting HA states")?
            .error_for_status()
            .context("HA rejected states request")?;

        response
            .json::<Vec<EntityState>>()
            .await
            .context("Error getting all states")
    }

    #[tracing::instrument(skip(self))]
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
    ) -> anyhow::Result<()> {
        let url = format!("{}/api/services/{}/{}", self.base_url, domain, service);

        tracing::info!("Calling HA service {}: {:?}", url, serde_json::to_string(&service_data)?);

        let response = self
            .client
            .post(url)
            .json(&service_data)
            .send()
            .await
            .with_context(|| format!("Error calling HA service {}.{}", domain, service))?;

        let status = response.status();
        let body = if status.is_success() {
            String::new()
        } else {
            response.text().await.unwrap_or_default()
        };

        ensure_service_success(domain, service, status, &body)?;

        tracing::debug!("HA service {}.{} returned {}", domain, service, status);
        Ok(())
    }
}

fn ensure_service_success(domain: &str, service: &str, status: StatusCode, body: &str) -> anyhow::Result<()> {
    if !status.is_success() {
        anyhow::bail!("HA service {}.{} failed with {}: {}", domain, service, status, body);
    }
    Ok(())
}
