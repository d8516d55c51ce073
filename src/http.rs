//! Direct HTTP calls to the API for operations the CLI lacks
//!
//! Uses ureq for synchronous requests. Responses are reported as an
//! [`Invocation`] so the same assertions apply as for CLI calls.

use crate::config::HarnessConfig;
use crate::invoke::Invocation;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;

const JSONAPI: &str = "application/vnd.api+json";

pub struct DirectClient {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl DirectClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(str::to_string),
            agent,
        }
    }

    /// Client for the configured service; needs XBE_BASE_URL
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let Some(ref base_url) = config.base_url else {
            bail!("No API base URL configured.\nSet XBE_BASE_URL to make direct API calls");
        };
        Ok(Self::new(base_url, config.token.as_deref()))
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request. Any HTTP status is a result (2xx = exit 0, other
    /// statuses exit 1 with the body on stderr); only transport problems
    /// are errors.
    pub fn request(&self, method: &str, path: &str, body: Option<&Value>) -> Result<Invocation> {
        let method = method.to_ascii_uppercase();
        let url = self.url(path);
        let args = vec![method.clone(), path.to_string()];

        let mut req = self.agent.request(&method, &url).set("Accept", JSONAPI);
        if let Some(ref token) = self.token {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }

        let response = match body {
            Some(body) => req
                .set("Content-Type", JSONAPI)
                .send_string(&body.to_string()),
            None => req.call(),
        };

        match response {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .with_context(|| format!("Failed to read response from {} {}", method, url))?;
                Ok(Invocation::new(args, 0, &text, ""))
            }
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                let stderr = format!("{}\n{} {} failed: {}", text.trim(), method, path, code);
                Ok(Invocation::new(args, 1, "", stderr.trim_start()))
            }
            Err(e) => Err(e).with_context(|| format!("Failed to reach {} {}", method, url)),
        }
    }

    pub fn get(&self, path: &str) -> Result<Invocation> {
        self.request("GET", path, None)
    }

    pub fn delete(&self, path: &str) -> Result<Invocation> {
        self.request("DELETE", path, None)
    }
}
