mod credentials;

pub(crate) use credentials::Credentials;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;

use crate::models::{parse_ts, QuotaSample};

/// Adapter for the ISP's Chaos API. The rest of the crate only sees the
/// `QuotaSample` it produces, never the transport or the payload shape.
pub(crate) struct ChaosClient {
    base_url: String,
    agent: ureq::Agent,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(default)]
    broadband: Vec<BroadbandLine>,
}

/// One broadband line as reported by `GET /info`. Counters come over the
/// wire as decimal strings.
#[derive(Debug, Deserialize)]
struct BroadbandLine {
    #[serde(rename = "quota-time")]
    quota_time: String,
    #[serde(rename = "quota-left")]
    quota_left: String,
    #[serde(rename = "quota-monthly")]
    quota_monthly: String,
}

impl ChaosClient {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Fetch the account's line info and reduce it to a quota sample.
    pub(crate) fn fetch_quota(&self, credentials: &Credentials) -> Result<QuotaSample> {
        let url = format!("{}/info", self.base_url);
        let auth = format!(
            "Basic {}",
            BASE64.encode(format!("{}:{}", credentials.user, credentials.password))
        );

        let mut response = match self
            .agent
            .get(&url)
            .header("Authorization", &auth)
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(401)) => {
                anyhow::bail!("Chaos API rejected the credentials (HTTP 401)")
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Chaos API request failed: {url}"));
            }
        };

        let info: InfoResponse = response
            .body_mut()
            .read_json()
            .context("Chaos API returned an unreadable body")?;
        parse_line_info(&info)
    }
}

/// Reduce a parsed response to the single quota sample it carries.
/// Separate from the transport so it is testable without a network.
fn parse_line_info(info: &InfoResponse) -> Result<QuotaSample> {
    let line = match info.broadband.as_slice() {
        [line] => line,
        lines => anyhow::bail!(
            "Expected exactly one broadband line in the response, got {}",
            lines.len()
        ),
    };

    let timestamp = parse_ts(&line.quota_time)
        .with_context(|| format!("Bad quota-time in response: {:?}", line.quota_time))?;
    let remaining: i64 = line
        .quota_left
        .parse()
        .with_context(|| format!("Bad quota-left in response: {:?}", line.quota_left))?;
    let total: i64 = line
        .quota_monthly
        .parse()
        .with_context(|| format!("Bad quota-monthly in response: {:?}", line.quota_monthly))?;

    Ok(QuotaSample {
        timestamp,
        remaining,
        total,
    })
}
