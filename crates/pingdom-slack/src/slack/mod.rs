//! Slack incoming-webhook messages.

pub mod client;
pub mod render;

pub use client::{DeliveryOutcome, SlackClient};
pub use render::render_message;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A message ready to be posted to a Slack incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackMessage {
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
    pub blocks: Vec<Block>,
    pub attachments: Vec<Attachment>,
}

/// One Block Kit block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Section with a single text
    SectionText(Text),
    /// Section with a grid of fields
    SectionFields(Vec<Text>),
    Divider,
    /// Small, muted text elements
    Context(Vec<Text>),
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Self::SectionText(Text::mrkdwn(text))
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            Self::SectionText(text) => {
                map.serialize_entry("type", "section")?;
                map.serialize_entry("text", text)?;
            }
            Self::SectionFields(fields) => {
                map.serialize_entry("type", "section")?;
                map.serialize_entry("fields", fields)?;
            }
            Self::Divider => {
                map.serialize_entry("type", "divider")?;
            }
            Self::Context(elements) => {
                map.serialize_entry("type", "context")?;
                map.serialize_entry("elements", elements)?;
            }
        }
        map.end()
    }
}

/// A Slack text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl Text {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            kind: "mrkdwn",
            text: text.into(),
        }
    }
}

/// Legacy attachment, used only for the color bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub color: String,
}
