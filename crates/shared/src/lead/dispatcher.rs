use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;

use super::record::CollectedRecord;

pub const CAPTURED_AT_PARAM: &str = "captured_at";
/// Keys checked, in order, for a follow-up link in an awaited webhook body.
pub const REDIRECT_KEYS: [&str; 5] = [
    "redirectUrl",
    "redirect_url",
    "interviewUrl",
    "interview_url",
    "url",
];
const MAX_LOGGED_BODY_CHARS: usize = 512;

pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;

/// Receives a completed record once per completing turn. Returns a redirect
/// link when the downstream collaborator supplied one.
pub trait LeadNotifier: Send + Sync {
    fn notify<'a>(&'a self, record: &'a CollectedRecord) -> NotifyFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    FireAndForget,
    AwaitRedirect,
}

impl DispatchMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FireAndForget => "fire_and_forget",
            Self::AwaitRedirect => "await_redirect",
        }
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fire_and_forget" | "async" => Ok(Self::FireAndForget),
            "await_redirect" | "await" => Ok(Self::AwaitRedirect),
            _ => Err(format!(
                "LEAD_DISPATCH_MODE must be one of fire_and_forget, await_redirect; got '{raw}'"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub mode: DispatchMode,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid webhook url: {0}")]
    InvalidUrl(String),
    #[error("webhook request failed: {0}")]
    Transport(String),
    #[error("webhook responded with status {status}")]
    Status { status: u16 },
    #[error("failed to build webhook http client: {0}")]
    HttpClient(String),
}

/// Appends every record field plus a capture timestamp to the webhook URL.
pub fn build_webhook_url(
    base: &str,
    record: &CollectedRecord,
    captured_at: DateTime<Utc>,
) -> Result<Url, DispatchError> {
    let mut url = Url::parse(base).map_err(|err| DispatchError::InvalidUrl(err.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        for (name, value) in record.iter() {
            query.append_pair(name, value);
        }
        query.append_pair(
            CAPTURED_AT_PARAM,
            &captured_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
    }
    Ok(url)
}

pub fn redirect_from_body(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    REDIRECT_KEYS.iter().find_map(|key| {
        parsed
            .get(*key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
    })
}

#[derive(Debug)]
struct DispatchJob {
    url: Url,
}

/// Hands fire-and-forget deliveries to a background worker.
///
/// The worker owns failure handling: every delivery outcome is logged there
/// and nothing flows back to the enqueuing request.
#[derive(Clone)]
pub struct DispatchQueue {
    sender: mpsc::UnboundedSender<DispatchJob>,
}

impl DispatchQueue {
    pub fn spawn(client: reqwest::Client) -> (Self, tokio::task::JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<DispatchJob>();
        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let client = client.clone();
                tokio::spawn(async move {
                    match deliver(&client, &job.url).await {
                        Ok((status, body)) => info!(
                            status,
                            body = %truncate_for_log(&body),
                            "lead webhook delivered"
                        ),
                        Err(err) => warn!("lead webhook delivery failed (silent): {err}"),
                    }
                });
            }
            info!("lead webhook queue closed");
        });

        (Self { sender }, worker)
    }

    fn enqueue(&self, url: Url) {
        if self.sender.send(DispatchJob { url }).is_err() {
            warn!("lead webhook queue is closed; dropping delivery");
        }
    }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
    client: reqwest::Client,
    config: WebhookConfig,
    queue: DispatchQueue,
}

impl WebhookDispatcher {
    /// Must be called inside a tokio runtime; the delivery worker is spawned here.
    pub fn new(config: WebhookConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| DispatchError::HttpClient(err.to_string()))?;
        let (queue, _worker) = DispatchQueue::spawn(client.clone());

        Ok(Self {
            client,
            config,
            queue,
        })
    }

    pub fn mode(&self) -> DispatchMode {
        self.config.mode
    }

    pub async fn dispatch(&self, record: &CollectedRecord) -> Option<String> {
        let Some(base) = self.config.url.as_deref() else {
            info!("lead webhook url not configured; skipping dispatch");
            return None;
        };

        let url = match build_webhook_url(base, record, Utc::now()) {
            Ok(url) => url,
            Err(err) => {
                warn!("lead webhook skipped: {err}");
                return None;
            }
        };

        info!(
            mode = self.config.mode.as_str(),
            field_count = record.len(),
            "all lead fields collected; dispatching webhook"
        );

        match self.config.mode {
            DispatchMode::FireAndForget => {
                self.queue.enqueue(url);
                None
            }
            DispatchMode::AwaitRedirect => self.dispatch_awaited(&url).await,
        }
    }

    async fn dispatch_awaited(&self, url: &Url) -> Option<String> {
        match deliver(&self.client, url).await {
            Ok((status, body)) => {
                let redirect = redirect_from_body(&body);
                if redirect.is_none() {
                    warn!(
                        status,
                        body = %truncate_for_log(&body),
                        "lead webhook response carried no redirect link"
                    );
                }
                redirect
            }
            Err(err) => {
                warn!("lead webhook failed; continuing without redirect: {err}");
                None
            }
        }
    }
}

impl LeadNotifier for WebhookDispatcher {
    fn notify<'a>(&'a self, record: &'a CollectedRecord) -> NotifyFuture<'a> {
        Box::pin(self.dispatch(record))
    }
}

async fn deliver(client: &reqwest::Client, url: &Url) -> Result<(u16, String), DispatchError> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| DispatchError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DispatchError::Status {
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|err| DispatchError::Transport(err.to_string()))?;
    Ok((status.as_u16(), body))
}

fn truncate_for_log(body: &str) -> String {
    body.chars().take(MAX_LOGGED_BODY_CHARS).collect()
}
