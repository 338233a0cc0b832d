//! In-process host and embed session.
//!
//! Both documents live in one process: the host mounts the frame, the embed
//! attaches with the channel id from its location, reports its content
//! height, and optionally answers one request. Every message that crosses
//! either window is tapped and reported alongside the step transcript.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use framebridge_message::{decode, generate_channel_id, with_channel_param, DEFAULT_CHANNEL_PREFIX};
use framebridge_peer::{
    handler_async, BridgeError, ContentRoot, EmbedBridge, EmbedConfig, HostBridge, HostConfig,
};
use framebridge_transport::{MessageEvent, Url, Window};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{
    bridge_error, io_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{compact, print_json, print_table, MessageSummary, OutputFormat};

/// Upper bound on waiting for a resize to reach the host.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
struct Step {
    elapsed_ms: u64,
    side: &'static str,
    event: &'static str,
    detail: String,
}

#[derive(Debug, Serialize)]
struct WireEntry {
    to: &'static str,
    origin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<MessageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    malformed: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RequestOutcome {
    Resolved { value: Value },
    Rejected { error: String },
    TimedOut { error: String },
}

impl RequestOutcome {
    fn exit_code(&self) -> i32 {
        match self {
            RequestOutcome::Resolved { .. } => SUCCESS,
            RequestOutcome::Rejected { .. } => FAILURE,
            RequestOutcome::TimedOut { .. } => TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    channel_id: String,
    frame_url: String,
    final_height: u32,
    loading: bool,
    request: RequestOutcome,
    steps: Vec<Step>,
    wire: Vec<WireEntry>,
}

struct Plan {
    host: String,
    url: String,
    height: u32,
    grow_to: Option<u32>,
    action: String,
    payload: Option<Value>,
    handler: bool,
    handler_delay: Option<Duration>,
    timeout: Duration,
}

impl Plan {
    fn from_args(args: SimulateArgs) -> CliResult<Self> {
        let payload = args
            .payload
            .as_deref()
            .map(|text| {
                serde_json::from_str::<Value>(text)
                    .map_err(|err| CliError::new(USAGE, format!("--payload is not valid JSON: {err}")))
            })
            .transpose()?;
        let handler_delay = args.handler_delay.as_deref().map(parse_duration).transpose()?;
        if args.action.trim().is_empty() {
            return Err(CliError::new(USAGE, "--action must not be empty"));
        }

        Ok(Self {
            host: args.host,
            url: args.url,
            height: args.height,
            grow_to: args.grow_to,
            action: args.action,
            payload,
            handler: !args.no_handler,
            handler_delay,
            timeout: parse_duration(&args.timeout)?,
        })
    }
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let plan = Plan::from_args(args)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("failed to start runtime", err))?;

    let report = runtime.block_on(simulate(plan))?;
    print_report(&report, format);
    Ok(report.request.exit_code())
}

async fn simulate(plan: Plan) -> CliResult<SimulationReport> {
    let mut steps = Transcript::new();

    let host_window =
        Window::open(&plan.host).map_err(|err| transport_error("invalid --host", err))?;
    let channel_id = generate_channel_id(DEFAULT_CHANNEL_PREFIX);
    let frame_url = Url::parse(host_window.location())
        .and_then(|base| base.join(plan.url.trim()))
        .map(|url| with_channel_param(&url, &channel_id))
        .map_err(|err| CliError::new(USAGE, format!("invalid --url: {err}")))?;
    let embed_window =
        Window::open(frame_url.as_str()).map_err(|err| transport_error("invalid --url", err))?;
    let tap = WireTap::start(&host_window, &embed_window);

    let host = HostBridge::mount(
        &host_window,
        Arc::new(embed_window.endpoint(&host_window)),
        HostConfig::new(plan.url.as_str())
            .with_channel_id(channel_id.as_str())
            .with_request_timeout(plan.timeout),
    )
    .map_err(|err| bridge_error("mount failed", err))?;
    steps.push(
        "host",
        "mounted",
        format!(
            "channel {} targeting {}, height {}",
            host.channel_id(),
            host.target_origin(),
            host.content_height()
        ),
    );

    let embed = EmbedBridge::attach(
        &embed_window,
        Arc::new(host_window.endpoint(&embed_window)),
        EmbedConfig::from_location(embed_window.location())
            .with_target_origin(host_window.origin().serialize())
            .with_request_timeout(plan.timeout),
    )
    .map_err(|err| bridge_error("attach failed", err))?;
    steps.push(
        "embed",
        "attached",
        format!("channel {}", embed.channel_id().unwrap_or("<unbound>")),
    );

    if plan.handler {
        embed.register_action_handler(plan.action.as_str(), echo_handler(plan.handler_delay));
        steps.push("embed", "handler registered", plan.action.clone());
    }

    let mut heights = host.watch_height();
    let mut loading = host.watch_loading();
    let root = ContentRoot::new(plan.height);
    embed.attach_content_root(root.clone());
    steps.push("embed", "content observed", format!("scroll height {}", plan.height));
    wait_for_resize(&mut loading, &mut heights, plan.height).await?;
    steps.push(
        "host",
        "resized",
        format!("height {}, loading {}", host.content_height(), host.is_loading()),
    );

    if let Some(grow_to) = plan.grow_to {
        root.set_scroll_height(grow_to);
        steps.push("embed", "content changed", format!("scroll height {grow_to}"));
        wait_for_resize(&mut loading, &mut heights, grow_to).await?;
        steps.push("host", "resized", format!("height {}", host.content_height()));
    }

    steps.push("host", "request sent", plan.action.clone());
    let request = match host.send_request(&plan.action, plan.payload.clone()).await {
        Ok(value) => {
            steps.push("host", "request resolved", compact(&value));
            RequestOutcome::Resolved { value }
        }
        Err(BridgeError::Rejected(error)) => {
            steps.push("host", "request rejected", error.clone());
            RequestOutcome::Rejected { error }
        }
        Err(err @ BridgeError::Timeout { .. }) => {
            steps.push("host", "request timed out", err.to_string());
            RequestOutcome::TimedOut {
                error: err.to_string(),
            }
        }
        Err(err) => return Err(bridge_error("request failed", err)),
    };

    let final_height = host.content_height();
    let loading = host.is_loading();
    embed.shutdown();
    let rejected = host.unmount();
    steps.push("host", "unmounted", format!("{rejected} pending request(s) rejected"));

    Ok(SimulationReport {
        channel_id,
        frame_url: frame_url.to_string(),
        final_height,
        loading,
        request,
        steps: steps.into_inner(),
        wire: tap.finish().await,
    })
}

fn echo_handler(delay: Option<Duration>) -> framebridge_peer::ActionHandler {
    handler_async(move |payload: Option<Value>| async move {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok::<Value, String>(json!({
            "echo": payload.unwrap_or(Value::Null),
            "handledBy": "embed",
        }))
    })
}

/// Wait until the host has applied at least one resize and shows `target`.
async fn wait_for_resize(
    loading: &mut watch::Receiver<bool>,
    heights: &mut watch::Receiver<u32>,
    target: u32,
) -> CliResult<()> {
    let settled = async {
        loading.wait_for(|loading| !*loading).await?;
        heights.wait_for(|height| *height == target).await.map(|_| ())
    };
    match tokio::time::timeout(SETTLE_TIMEOUT, settled).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(_)) => Err(CliError::new(FAILURE, "host layout closed before resize")),
        Err(_) => Err(CliError::new(
            TIMEOUT,
            format!("host never reported height {target}"),
        )),
    }
}

struct Transcript {
    started: Instant,
    steps: Vec<Step>,
}

impl Transcript {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            steps: Vec::new(),
        }
    }

    fn push(&mut self, side: &'static str, event: &'static str, detail: String) {
        tracing::info!(side, event, %detail, "simulation step");
        self.steps.push(Step {
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            side,
            event,
            detail,
        });
    }

    fn into_inner(self) -> Vec<Step> {
        self.steps
    }
}

/// Records every event delivered to either window.
struct WireTap {
    entries: Arc<Mutex<Vec<WireEntry>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl WireTap {
    fn start(host: &Window, embed: &Window) -> Self {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let tasks = [("host", host), ("embed", embed)]
            .into_iter()
            .map(|(to, window)| {
                let mut events = window.subscribe();
                let entries = Arc::clone(&entries);
                tokio::spawn(async move {
                    while let Ok(event) = events.recv().await {
                        let entry = WireEntry::from_event(to, &event);
                        entries
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .push(entry);
                    }
                })
            })
            .collect();
        Self { entries, tasks }
    }

    /// Let queued events drain, then stop tapping.
    async fn finish(self) -> Vec<WireEntry> {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        for task in &self.tasks {
            task.abort();
        }
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *entries)
    }
}

impl WireEntry {
    fn from_event(to: &'static str, event: &MessageEvent) -> Self {
        let (message, malformed) = match decode(&event.data) {
            Ok(message) => (Some(MessageSummary::from(&message)), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            to,
            origin: event.origin.clone(),
            message,
            malformed,
        }
    }

    fn describe(&self) -> (String, String) {
        match (&self.message, &self.malformed) {
            (Some(summary), _) => {
                let detail = summary
                    .fields()
                    .into_iter()
                    .filter(|(key, _)| !matches!(*key, "type" | "channelId" | "timestamp"))
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                (summary.kind.to_string(), detail)
            }
            (None, Some(error)) => ("malformed".to_string(), error.clone()),
            (None, None) => ("unknown".to_string(), String::new()),
        }
    }
}

fn print_report(report: &SimulationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            print_table(
                &["MS", "SIDE", "EVENT", "DETAIL"],
                report
                    .steps
                    .iter()
                    .map(|step| {
                        vec![
                            step.elapsed_ms.to_string(),
                            step.side.to_string(),
                            step.event.to_string(),
                            step.detail.clone(),
                        ]
                    })
                    .collect(),
            );
            print_table(
                &["TO", "FROM", "TYPE", "FIELDS"],
                report
                    .wire
                    .iter()
                    .map(|entry| {
                        let (kind, detail) = entry.describe();
                        vec![entry.to.to_string(), entry.origin.clone(), kind, detail]
                    })
                    .collect(),
            );
            println!("{}", outcome_line(report));
        }
        OutputFormat::Pretty => {
            println!("channel {} ({})", report.channel_id, report.frame_url);
            for step in &report.steps {
                println!(
                    "{:>5}ms [{}] {}: {}",
                    step.elapsed_ms, step.side, step.event, step.detail
                );
            }
            println!("wire:");
            for entry in &report.wire {
                let (kind, detail) = entry.describe();
                println!("  {} <- {} {kind} {detail}", entry.to, entry.origin);
            }
            println!("{}", outcome_line(report));
        }
    }
}

fn outcome_line(report: &SimulationReport) -> String {
    let request = match &report.request {
        RequestOutcome::Resolved { value } => format!("resolved {}", compact(value)),
        RequestOutcome::Rejected { error } => format!("rejected: {error}"),
        RequestOutcome::TimedOut { error } => format!("timed out: {error}"),
    };
    format!(
        "final height {}, loading {}, request {request}",
        report.final_height, report.loading
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan {
            host: "https://app.example/dashboard".to_string(),
            url: "https://widgets.example/embed".to_string(),
            height: 300,
            grow_to: Some(620),
            action: "ping".to_string(),
            payload: Some(json!({"n": 1})),
            handler: true,
            handler_delay: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn resolved_session_reports_heights_and_wire() {
        let report = simulate(plan()).await.unwrap();

        assert_eq!(report.final_height, 620);
        assert!(!report.loading);
        match &report.request {
            RequestOutcome::Resolved { value } => {
                assert_eq!(value["echo"], json!({"n": 1}));
                assert_eq!(value["handledBy"], "embed");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.request.exit_code(), SUCCESS);

        let kinds: Vec<&str> = report
            .wire
            .iter()
            .filter_map(|entry| entry.message.as_ref().map(|summary| summary.kind))
            .collect();
        assert!(kinds.contains(&"resize"));
        assert!(kinds.contains(&"request"));
        assert!(kinds.contains(&"response"));
        assert!(report
            .wire
            .iter()
            .filter_map(|entry| entry.message.as_ref())
            .all(|summary| summary.channel_id == report.channel_id));
    }

    #[tokio::test]
    async fn default_height_still_waits_for_first_resize() {
        let report = simulate(Plan {
            height: framebridge_peer::DEFAULT_HEIGHT,
            grow_to: None,
            ..plan()
        })
        .await
        .unwrap();

        let resized = report
            .steps
            .iter()
            .find(|step| step.side == "host" && step.event == "resized")
            .unwrap();
        assert_eq!(resized.detail, "height 150, loading false");
        assert!(report
            .wire
            .iter()
            .filter_map(|entry| entry.message.as_ref())
            .any(|summary| summary.kind == "resize"));
    }

    #[tokio::test]
    async fn relative_url_resolves_against_host() {
        let report = simulate(Plan {
            url: "/embed/chart".to_string(),
            grow_to: None,
            ..plan()
        })
        .await
        .unwrap();

        assert!(report
            .frame_url
            .starts_with("https://app.example/embed/chart?channelId="));
        assert_eq!(report.request.exit_code(), SUCCESS);
    }

    #[tokio::test]
    async fn missing_handler_is_rejected() {
        let report = simulate(Plan {
            handler: false,
            grow_to: None,
            ..plan()
        })
        .await
        .unwrap();

        match &report.request {
            RequestOutcome::Rejected { error } => assert_eq!(error, "unhandled action 'ping'"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.request.exit_code(), FAILURE);
        assert_eq!(report.final_height, 300);
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        let report = simulate(Plan {
            handler_delay: Some(Duration::from_millis(500)),
            timeout: Duration::from_millis(50),
            grow_to: None,
            ..plan()
        })
        .await
        .unwrap();

        assert!(matches!(report.request, RequestOutcome::TimedOut { .. }));
        assert_eq!(report.request.exit_code(), TIMEOUT);
    }

    #[test]
    fn invalid_payload_is_usage_error() {
        let args = SimulateArgs {
            host: "https://app.example".to_string(),
            url: "https://widgets.example".to_string(),
            height: 1,
            grow_to: None,
            action: "ping".to_string(),
            payload: Some("{not json".to_string()),
            no_handler: false,
            handler_delay: None,
            timeout: "1s".to_string(),
        };
        assert_eq!(Plan::from_args(args).err().map(|err| err.code), Some(USAGE));
    }
}
