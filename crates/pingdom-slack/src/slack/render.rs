//! Layout of the Slack message for a Pingdom alert.
//!
//! Rendering is a pure function of its inputs: the same alert and analysis
//! always produce the same message.

use chrono::DateTime;

use super::{Attachment, Block, SlackMessage, Text};
use crate::alert::{AlertEvent, CheckState};
use crate::analysis::{AnalysisResult, AnalysisTask, EntryValue};
use crate::config::StatusIcons;

/// Display name of the bot posting the message.
pub const USERNAME: &str = "Pingdom";

/// Notice rendered when a DOWN alert has no analysis.
pub const NO_ANALYSIS_NOTICE: &str =
    ":warning: Pingdom could not fetch analysis for this downtime.";

const RCA_REFERENCE: &str = "*Downtime and Root Cause Analysis*\n\
    <https://my.pingdom.com/app/reports/uptime|Pingdom uptime reports>";

const ORDINALS: [&str; 10] = [
    ":one:",
    ":two:",
    ":three:",
    ":four:",
    ":five:",
    ":six:",
    ":seven:",
    ":eight:",
    ":nine:",
    ":keycap_ten:",
];

const NEUTRAL_COLOR: &str = "#0000FF";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Slack rejects messages with more blocks than this.
const MAX_BLOCKS: usize = 50;
/// Slack accepts at most 10 fields per section.
const MAX_FIELDS_PER_SECTION: usize = 10;
/// Slack rejects section texts longer than this.
const MAX_SECTION_TEXT: usize = 3000;
/// Slack rejects field texts longer than this.
const MAX_FIELD_TEXT: usize = 2000;

const ENTRY_TIMESTAMP: &str = "timestamp";
const ENTRY_RAW_RESPONSE: &str = "raw_response";
const ENTRY_COMMUNICATION_LOG: &str = "communication_log";

/// Build the Slack message for an alert and its optional analysis.
pub fn render_message(
    channel: &str,
    alert: &AlertEvent,
    analysis: Option<&AnalysisResult>,
    icons: &StatusIcons,
) -> SlackMessage {
    let state = &alert.current_state;
    let icon = status_icon(state, icons);
    let name = non_empty(alert.check_name.as_deref()).unwrap_or("Unknown check");

    let mut blocks = vec![Block::text(format!("{icon} *{name}* is *{state}* {icon}"))];

    if let Some(target) = alert.target() {
        blocks.push(Block::text(format!("URL: {target}")));
    }

    let mut context = Vec::new();
    if let Some(description) = non_empty(alert.long_description.as_deref()) {
        context.push(Text::mrkdwn(description));
    }
    if let Some(changed) = non_empty(alert.state_changed_utc_time.as_deref()) {
        context.push(Text::mrkdwn(format!("State changed: {changed}")));
    }
    if !context.is_empty() {
        blocks.push(Block::Context(context));
    }

    blocks.extend(field_sections(&alert_fields(alert)));

    if let Some(message) = non_empty(alert.custom_message.as_deref()) {
        blocks.push(Block::text(format!("*Custom Message*\n{message}")));
    }

    if state.is_down() {
        blocks.push(Block::Divider);
        blocks.push(Block::text(RCA_REFERENCE));
    }

    match analysis {
        Some(analysis) => push_tasks(&mut blocks, analysis),
        None if state.is_down() => blocks.push(Block::text(NO_ANALYSIS_NOTICE)),
        None => {}
    }

    SlackMessage {
        channel: channel.to_string(),
        username: USERNAME.to_string(),
        icon_emoji: icon.to_string(),
        blocks,
        attachments: vec![Attachment {
            fallback: format!("{name} is {state}"),
            color: color(state).to_string(),
        }],
    }
}

fn status_icon<'a>(state: &CheckState, icons: &'a StatusIcons) -> &'a str {
    match state {
        CheckState::Up => icons.up.as_str(),
        CheckState::Down => icons.down.as_str(),
        CheckState::Other(_) | CheckState::Unknown => icons.unknown.as_str(),
    }
}

/// Attachment color bar for a state.
pub fn color(state: &CheckState) -> &'static str {
    match state {
        CheckState::Down => "danger",
        CheckState::Up => "good",
        CheckState::Other(_) | CheckState::Unknown => NEUTRAL_COLOR,
    }
}

fn thumbs(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => ":+1:",
        Some(false) => ":-1:",
        None => ":shrug:",
    }
}

fn field(label: &str, value: &str) -> Text {
    Text::mrkdwn(truncate(format!("*{label}*\n{value}"), MAX_FIELD_TEXT))
}

fn alert_fields(alert: &AlertEvent) -> Vec<Text> {
    let params = &alert.check_params;
    let mut fields = Vec::new();

    if let Some(check_type) = non_empty(alert.check_type.as_deref()) {
        fields.push(field("Check Type", check_type));
    }
    if let Some(importance) = non_empty(alert.importance_level.as_deref()) {
        fields.push(field("Importance", importance));
    }
    fields.push(field("Basic Auth", thumbs(params.basic_auth)));
    fields.push(field("Verify Certificate", thumbs(params.verify_certificate)));
    if let Some(threshold) = params.responsetime_threshold {
        fields.push(field("Response Time Threshold", &format!("{threshold} ms")));
    }

    let tags: Vec<String> = alert
        .tags
        .iter()
        .filter(|tag| !tag.is_empty())
        .map(|tag| format!("`{tag}`"))
        .collect();
    if !tags.is_empty() {
        fields.push(field("Tags", &tags.join(" ")));
    }

    if let Some(content) = non_empty(params.shouldcontain.as_deref()) {
        fields.push(field("Should Contain", &format!("`{content}`")));
    }
    if let Some(content) = non_empty(params.shouldnotcontain.as_deref()) {
        fields.push(field("Should Not Contain", &format!("`{content}`")));
    }
    if let Some(location) = non_empty(alert.first_probe.as_deref()) {
        fields.push(field("First Probe", location));
    }
    if let Some(location) = non_empty(alert.second_probe.as_deref()) {
        fields.push(field("Second Probe", location));
    }

    fields
}

fn field_sections(fields: &[Text]) -> Vec<Block> {
    fields
        .chunks(MAX_FIELDS_PER_SECTION)
        .map(|chunk| Block::SectionFields(chunk.to_vec()))
        .collect()
}

fn ordinal(index: usize) -> String {
    ORDINALS
        .get(index)
        .map_or_else(|| format!("*#{}*", index + 1), |icon| (*icon).to_string())
}

/// Append task sections while they fit in the block budget.
///
/// When a task does not fit, it and every later task are replaced by a single
/// context line, so one slot is always kept free for it.
fn push_tasks(blocks: &mut Vec<Block>, analysis: &AnalysisResult) {
    let total = analysis.tasks.len();
    for (index, task) in analysis.tasks.iter().enumerate() {
        let task = task_blocks(index, task);
        let reserve = usize::from(index + 1 < total);
        if blocks.len() + task.len() + reserve > MAX_BLOCKS {
            let hidden = total - index;
            let noun = if hidden == 1 { "task" } else { "tasks" };
            blocks.push(Block::Context(vec![Text::mrkdwn(format!(
                "{hidden} more analysis {noun} not shown"
            ))]));
            return;
        }
        blocks.extend(task);
    }
}

fn task_blocks(index: usize, task: &AnalysisTask) -> Vec<Block> {
    let kind = non_empty(task.kind.as_deref()).unwrap_or("Task");
    let mut blocks = vec![Block::text(format!("{} *{kind}*", ordinal(index)))];

    let mut fields = Vec::new();
    let mut raw_responses = Vec::new();
    for entry in task.entries.iter() {
        match entry.name.as_str() {
            ENTRY_COMMUNICATION_LOG => {}
            ENTRY_RAW_RESPONSE => raw_responses.push(code_block(&entry.value)),
            ENTRY_TIMESTAMP => fields.push(field(&entry.name, &format_timestamp(&entry.value))),
            _ => fields.push(field(&entry.name, &entry_text(&entry.value))),
        }
    }

    blocks.extend(field_sections(&fields));
    blocks.extend(raw_responses.into_iter().map(Block::text));
    blocks.push(Block::Divider);
    blocks
}

fn entry_text(value: &EntryValue) -> String {
    match value {
        EntryValue::Null => "n/a".to_string(),
        other => other.lines().join("\n"),
    }
}

/// Render an epoch-seconds value as a UTC date and time.
fn format_timestamp(value: &EntryValue) -> String {
    value
        .lines()
        .first()
        .and_then(|raw| {
            let raw = raw.trim();
            raw.parse::<i64>()
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .filter(|secs| secs.is_finite())
                        .map(|secs| secs.trunc() as i64)
                })
        })
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map_or_else(
            || "invalid timestamp".to_string(),
            |at| at.format(TIMESTAMP_FORMAT).to_string(),
        )
}

fn code_block(value: &EntryValue) -> String {
    const FENCE: &str = "```";
    let budget = MAX_SECTION_TEXT - 2 * (FENCE.len() + 1);

    let body = truncate(value.lines().join("\n"), budget);
    format!("{FENCE}\n{body}\n{FENCE}")
}

/// Cut `text` to at most `max` characters, marking the cut with an ellipsis.
fn truncate(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        return text;
    }
    let mut cut: String = text.chars().take(max - 1).collect();
    cut.push('…');
    cut
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
