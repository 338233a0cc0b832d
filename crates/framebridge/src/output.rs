use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framebridge_message::Message;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Flat view of one wire message.
#[derive(Debug, Serialize)]
pub struct MessageSummary {
    pub kind: &'static str,
    pub channel_id: String,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        let mut summary = Self {
            kind: message.kind().as_str(),
            channel_id: message.channel_id().to_string(),
            timestamp: message.timestamp(),
            request_id: message.request_id().map(str::to_string),
            action: message.action().map(str::to_string),
            height: None,
            success: None,
            error: None,
            payload: None,
        };
        match message {
            Message::Resize(m) => summary.height = Some(m.height),
            Message::Data(m) => summary.payload = Some(m.payload.clone()),
            Message::Action(m) => summary.payload = m.payload.clone(),
            Message::Request(m) => summary.payload = m.payload.clone(),
            Message::Response(m) => {
                summary.success = Some(m.success);
                summary.error = m.error.clone();
                summary.payload = m.payload.clone();
            }
        }
        summary
    }
}

impl MessageSummary {
    /// `(field, value)` pairs for the fields present on this kind.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("type", self.kind.to_string()),
            ("channelId", self.channel_id.clone()),
            ("timestamp", self.timestamp.to_string()),
        ];
        if let Some(request_id) = &self.request_id {
            fields.push(("requestId", request_id.clone()));
        }
        if let Some(action) = &self.action {
            fields.push(("action", action.clone()));
        }
        if let Some(height) = self.height {
            fields.push(("height", height.to_string()));
        }
        if let Some(success) = self.success {
            fields.push(("success", success.to_string()));
        }
        if let Some(error) = &self.error {
            fields.push(("error", error.clone()));
        }
        if let Some(payload) = &self.payload {
            fields.push(("payload", compact(payload)));
        }
        fields
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

/// Aligned `key: value` lines under a heading.
pub fn print_pairs(title: &str, pairs: &[(&str, String)]) {
    println!("{title}:");
    let width = pairs.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in pairs {
        println!("  {:<width$}  {value}", format!("{key}:"), width = width + 1);
    }
}

pub fn compact(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unprintable>".to_string())
}
