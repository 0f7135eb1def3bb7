//! Subcommand implementations
//!
//! Each command takes an already-built client and the output mode, and
//! returns `anyhow::Result` so that `main` can map the underlying error kind
//! to an exit code.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use reolink_api::{CameraClient, Capabilities, CommandRequest, SnapStream};
use reolink_watch::{ActionTemplate, CancellationToken, Event, EventWatcher, KNOWN_FEATURES};
use serde_json::{json, Value};
use tracing::info;

use crate::output::{display_value, OutputMode};
use crate::UsageError;

/// `GetDevInfo` fields shown by `info`, with their labels
const INFO_FIELDS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("model", "Model"),
    ("firmVer", "Firmware"),
    ("hardVer", "Hardware"),
    ("serial", "Serial"),
    ("uid", "UID"),
    ("channelNum", "Channels"),
    ("buildDay", "Build Date"),
    ("cfgVer", "Config Version"),
    ("detail", "Detail"),
    ("exactType", "Type"),
    ("wifi", "WiFi"),
    ("IOInputNum", "IO Inputs"),
    ("IOOutputNum", "IO Outputs"),
    ("diskNum", "Disk Count"),
];

/// Run an arbitrary command and print its payload
pub fn exec(
    client: &CameraClient,
    out: OutputMode,
    command: &str,
    param: Option<&str>,
    action: u8,
) -> Result<()> {
    let params = param.map(parse_params).transpose()?;
    let request = CommandRequest::new(command)
        .with_optional_params(params)
        .with_action(action);

    let value = client.execute_request(&request)?;
    out.json(&value);
    Ok(())
}

pub fn info(client: &CameraClient, out: OutputMode) -> Result<()> {
    let info = client.device_info()?;
    let value = serde_json::to_value(&info).context("Failed to encode device info")?;

    if out.json {
        out.json(&value);
    } else {
        out.table("Device Info", &info_rows(&value));
    }
    Ok(())
}

pub fn capabilities(client: &CameraClient, out: OutputMode) -> Result<()> {
    let caps = client.capabilities()?;

    if out.json {
        out.json(caps.raw());
    } else {
        out.table("Capabilities", &capability_rows(&caps, client.channel()));
    }
    Ok(())
}

pub fn snap(
    client: &CameraClient,
    out: OutputMode,
    path: Option<PathBuf>,
    stream: SnapStream,
) -> Result<()> {
    let path = path.unwrap_or_else(default_snapshot_path);
    let image = client.snapshot(stream)?;

    std::fs::write(&path, &image)
        .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;

    if out.json {
        out.json(&json!({
            "file": path.display().to_string(),
            "size": image.len(),
            "stream": stream.as_str(),
        }));
    } else {
        out.line(&format!(
            "Saved snapshot to {} ({} bytes)",
            path.display(),
            image.len()
        ));
    }
    Ok(())
}

/// Options for the `watch` subcommand
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval: Duration,
    pub filter: Option<Vec<String>>,
    pub exec: Option<String>,
}

/// Poll for events until Ctrl-C
pub fn watch(client: &CameraClient, out: OutputMode, options: WatchOptions) -> Result<()> {
    let cancel = CancellationToken::new();
    let handler_cancel = cancel.clone();
    ctrlc::set_handler(move || handler_cancel.cancel())
        .context("Failed to install Ctrl-C handler")?;

    let mut watcher = EventWatcher::new(client)
        .with_channel(client.channel())
        .with_interval(options.interval);
    if let Some(filter) = options.filter {
        watcher = watcher.with_filter(filter);
    }
    if let Some(template) = options.exec {
        watcher = watcher.with_action(ActionTemplate::new(template));
    }

    if !out.json {
        out.line("Watching for events... (Ctrl+C to stop)\n");
    }

    let summary = watcher.run(&cancel, |event| out.stream_line(&format_event(event, out.json)))?;
    info!(
        ticks = summary.ticks,
        events = summary.events,
        skipped = summary.skipped_ticks,
        "stopped watching"
    );

    if !out.json {
        out.line("\nStopped watching.");
    }
    Ok(())
}

/// Parse `--param`, which must be a JSON object
pub fn parse_params(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| UsageError(format!("--param is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(UsageError("--param must be a JSON object".to_string()).into());
    }
    Ok(value)
}

/// Parse `--filter person,vehicle` against the known feature names
pub fn parse_filter(raw: &str) -> Result<Vec<String>> {
    let features: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_lowercase)
        .collect();

    if features.is_empty() {
        return Err(UsageError("--filter needs at least one event type".to_string()).into());
    }
    if let Some(unknown) = features.iter().find(|f| !KNOWN_FEATURES.contains(&f.as_str())) {
        return Err(UsageError(format!(
            "unknown event type '{}', expected one of: {}",
            unknown,
            KNOWN_FEATURES.join(", ")
        ))
        .into());
    }
    Ok(features)
}

pub fn format_event(event: &Event, json: bool) -> String {
    if json {
        serde_json::to_string(event).unwrap_or_default()
    } else {
        format!("[{}] {} {}", event.timestamp_rfc3339(), event.feature, event.action)
    }
}

fn info_rows(value: &Value) -> Vec<(String, String)> {
    INFO_FIELDS
        .iter()
        .filter_map(|(key, label)| {
            value
                .get(*key)
                .map(|v| (label.to_string(), display_value(v)))
        })
        .collect()
}

/// One row per ability that carries a version, device-level then channel
fn capability_rows(caps: &Capabilities, channel: u8) -> Vec<(String, String)> {
    let mut rows = Vec::new();

    let channel_abilities = caps
        .raw()
        .get("abilityChn")
        .and_then(|chn| chn.get(usize::from(channel)))
        .and_then(Value::as_object);
    let device_abilities = caps.raw().as_object();

    for abilities in [device_abilities, channel_abilities].into_iter().flatten() {
        for (name, ability) in abilities {
            if ability.get("ver").is_none() {
                continue;
            }
            let supported = if caps.supports(name, channel) { "yes" } else { "no" };
            rows.push((name.clone(), supported.to_string()));
        }
    }
    rows
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from(format!(
        "snapshot_{}.jpg",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}
