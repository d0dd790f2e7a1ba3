//! Alert pipeline: extract, enrich, render, deliver.
//!
//! A run moves through [`Stage`]s in order. Every transition is timed on a
//! monotonic clock so the response can show where latency was spent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::alert::AlertEvent;
use crate::analysis::AnalysisClient;
use crate::config::{Config, StatusIcons};
use crate::slack::{render_message, SlackClient};

/// Status returned when Slack could not be reached at all.
const STATUS_BAD_GATEWAY: u16 = 502;
/// Status returned when no webhook is configured.
const STATUS_INTERNAL_ERROR: u16 = 500;

/// Stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    FetchingAnalysis,
    Rendering,
    Delivering,
    Done,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::FetchingAnalysis => "fetching_analysis",
            Self::Rendering => "rendering",
            Self::Delivering => "delivering",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the current stage and how long each one took.
struct StageClock {
    stage: Stage,
    started: Instant,
    entered: Instant,
}

impl StageClock {
    fn start() -> Self {
        let now = Instant::now();
        Self {
            stage: Stage::Extracting,
            started: now,
            entered: now,
        }
    }

    /// Move to `next`, returning the time spent in the current stage.
    fn advance(&mut self, next: Stage) -> Duration {
        let now = Instant::now();
        let spent = now.duration_since(self.entered);
        debug!(from = %self.stage, to = %next, elapsed_ms = spent.as_millis(), "Pipeline stage");
        self.stage = next;
        self.entered = now;
        spent
    }

    fn total(&self) -> Duration {
        self.started.elapsed()
    }
}

/// JSON body returned to Pingdom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    /// `OK` when Slack accepted the message, `NOK` otherwise
    pub status: String,
    pub status_code: u16,
    /// Seconds spent fetching root cause analysis
    pub analysis_time: f64,
    /// Seconds spent extracting the alert and rendering the message
    pub process_time: f64,
    /// Seconds spent posting to Slack
    pub slack_time: f64,
    pub total_time: f64,
    /// Slack's raw answer when delivery failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Per-stage durations of one run.
#[derive(Debug, Clone, Copy, Default)]
struct Timings {
    analysis: Duration,
    process: Duration,
    slack: Duration,
    total: Duration,
}

impl PipelineResponse {
    fn new(status_code: u16, timings: Timings, content: Option<String>) -> Self {
        let status = if status_code == 200 { "OK" } else { "NOK" };
        Self {
            status: status.to_string(),
            status_code,
            analysis_time: timings.analysis.as_secs_f64(),
            process_time: timings.process.as_secs_f64(),
            slack_time: timings.slack.as_secs_f64(),
            total_time: timings.total.as_secs_f64(),
            content,
        }
    }
}

/// Turns Pingdom webhook calls into Slack messages.
#[derive(Debug, Clone)]
pub struct Pipeline {
    icons: StatusIcons,
    analysis: AnalysisClient,
    /// Absent when no webhook is configured
    slack: Option<SlackClient>,
}

impl Pipeline {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let timeout = config.http_timeout();
        Ok(Self {
            icons: config.icons(),
            analysis: AnalysisClient::new(
                config.pingdom_api_url.clone(),
                config.pingdom_token().map(str::to_string),
                timeout,
            )?,
            slack: config
                .slack_webhook()
                .map(|url| SlackClient::new(url, timeout))
                .transpose()?,
        })
    }

    /// Run the pipeline for one webhook call posted to `channel`.
    pub async fn run(&self, channel: &str, body: &[u8]) -> PipelineResponse {
        let mut clock = StageClock::start();
        let channel = channel_name(channel);

        let Some(slack) = &self.slack else {
            error!(channel = %channel, "SLACK_WEBHOOK not set, dropping alert");
            let timings = Timings {
                total: clock.total(),
                ..Timings::default()
            };
            return PipelineResponse::new(
                STATUS_INTERNAL_ERROR,
                timings,
                Some("Slack webhook is not configured".to_string()),
            );
        };

        let alert = AlertEvent::from_slice(body);
        info!(
            channel = %channel,
            check_id = ?alert.check_id,
            check_name = ?alert.check_name,
            state = %alert.current_state,
            "Received Pingdom alert"
        );
        let extract_time = clock.advance(Stage::FetchingAnalysis);

        let analysis = if alert.current_state.is_down() {
            self.analysis
                .fetch(alert.check_id, alert.state_changed_timestamp)
                .await
        } else {
            None
        };
        let analysis_time = clock.advance(Stage::Rendering);

        let message = render_message(&channel, &alert, analysis.as_ref(), &self.icons);
        let render_time = clock.advance(Stage::Delivering);

        let delivery = slack.post(&message).await;
        let slack_time = clock.advance(Stage::Done);

        let timings = Timings {
            analysis: analysis_time,
            process: extract_time + render_time,
            slack: slack_time,
            total: clock.total(),
        };

        match delivery {
            Ok(outcome) if outcome.success => {
                info!(channel = %channel, total_ms = timings.total.as_millis(), "Alert delivered");
                PipelineResponse::new(outcome.status, timings, None)
            }
            Ok(outcome) => {
                error!(channel = %channel, status = outcome.status, "Slack rejected the alert");
                PipelineResponse::new(outcome.status, timings, outcome.body)
            }
            Err(e) => {
                error!(channel = %channel, error = %e, "Failed to reach Slack");
                PipelineResponse::new(STATUS_BAD_GATEWAY, timings, Some(e.to_string()))
            }
        }
    }
}

/// Slack channel name for a path segment.
fn channel_name(channel: &str) -> String {
    let channel = channel.trim();
    if channel.starts_with('#') || channel.starts_with('@') {
        channel.to_string()
    } else {
        format!("#{channel}")
    }
}
