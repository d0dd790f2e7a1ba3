//! Relay Pingdom alerts to Slack.
//!
//! Pingdom posts a webhook for every state change of a check. This crate turns
//! that payload into a Block Kit message and posts it to a Slack incoming
//! webhook. DOWN alerts are enriched with Pingdom's root cause analysis.
//!
//! # Pipeline
//!
//! - [`AlertEvent`] extracts the payload field by field, tolerating gaps
//! - [`AnalysisClient`] looks up the analysis of a downtime (DOWN only)
//! - [`render_message`] lays out the Slack blocks
//! - [`SlackClient`] posts the message and classifies the answer
//! - [`Pipeline`] runs the steps in order and times each one
//!
//! # Configuration
//!
//! See [`Config`]. `SLACK_WEBHOOK` and `PINGDOM_TOKEN` are required for a
//! healthy service; without them it still starts and reports degraded health.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod alert;
pub mod analysis;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod slack;

pub use alert::{AlertEvent, CheckState};
pub use analysis::{AnalysisClient, AnalysisResult};
pub use config::{Config, StatusIcons};
pub use error::{AnalysisError, DeliveryError};
pub use pipeline::{Pipeline, PipelineResponse, Stage};
pub use slack::{render_message, DeliveryOutcome, SlackClient, SlackMessage};
