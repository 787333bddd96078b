use crate::application::ports::connectivity_probe::ConnectivityProbe;
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Treats the backend as reachable when its health endpoint answers 2xx.
pub struct HttpHealthProbe {
    url: String,
    http: reqwest::Client,
}

impl HttpHealthProbe {
    pub fn new(config: &RemoteConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            url: health_url(&config.base_url, &config.health_path),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn health_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        path.trim().trim_start_matches('/')
    )
}

#[async_trait]
impl ConnectivityProbe for HttpHealthProbe {
    async fn is_reachable(&self) -> bool {
        match self.http.get(&self.url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                if !ok {
                    tracing::debug!(
                        target: "sync::connectivity",
                        url = %self.url,
                        status = %resp.status(),
                        "health check returned non-success status"
                    );
                }
                ok
            }
            Err(err) => {
                tracing::debug!(
                    target: "sync::connectivity",
                    url = %self.url,
                    error = %err,
                    "health check failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_health_path() {
        assert_eq!(
            health_url("http://localhost:3000/api/", "/health"),
            "http://localhost:3000/api/health"
        );
        assert_eq!(
            health_url("http://localhost:3000", "status"),
            "http://localhost:3000/status"
        );
    }

    #[tokio::test]
    async fn unreachable_host_reports_offline() {
        let config = RemoteConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_token: None,
            request_timeout: 1,
            health_path: "/health".into(),
        };
        let probe = HttpHealthProbe::new(&config).unwrap();
        assert!(!probe.is_reachable().await);
    }
}
