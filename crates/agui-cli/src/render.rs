// Plain-text views of a session for the console

use agui_session::SessionSnapshot;
use agui_types::{Event, EventKind, Role, ToolCallStatus};
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// One line per event: marker, type, wall-clock time and a short detail.
pub fn event_line(event: &Event) -> String {
    let mut line = format!("{} {}", event.category().marker(), event.type_name());

    let time = format_timestamp(event.timestamp);
    if !time.is_empty() {
        let _ = write!(line, " [{}]", time);
    }

    let detail = event_detail(event);
    if !detail.is_empty() {
        let _ = write!(line, " {}", detail);
    }
    line
}

/// `HH:MM:SS.mmm` (UTC) for a millisecond timestamp, empty when absent.
pub fn format_timestamp(timestamp: Option<f64>) -> String {
    timestamp
        .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms as i64))
        .map(|time| time.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_default()
}

fn event_detail(event: &Event) -> String {
    match &event.kind {
        EventKind::RunError { message, code } => format!(
            "{}: {}",
            code.as_deref().unwrap_or("ERROR"),
            message.as_deref().unwrap_or("Unknown error")
        ),
        EventKind::StepStarted { step_name } | EventKind::StepFinished { step_name } => {
            step_name.clone()
        }
        EventKind::TextMessageContent { delta, .. } => format!("{:?}", delta),
        EventKind::ToolCallStart { tool_call_name, .. } => tool_call_name.clone(),
        EventKind::ToolCallArgs { delta, .. } => delta.clone(),
        EventKind::ToolCallResult { result, .. } => result.to_string(),
        EventKind::Custom { name, .. } => name.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Conversation, steps, tool calls and state after a run.
pub fn render_snapshot(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();

    for message in &snapshot.messages {
        match (&message.role, &message.code) {
            (Role::Error, Some(code)) => {
                let _ = writeln!(out, "[error:{}] {}", code, message.content);
            }
            (role, _) => {
                let _ = writeln!(out, "[{}] {}", role, message.content);
            }
        }
    }
    if let Some(partial) = &snapshot.streaming_message {
        let _ = writeln!(out, "[{}] {}…", partial.role, partial.content);
    }

    if !snapshot.steps.is_empty() {
        let _ = writeln!(out, "\nSteps:");
        for step in &snapshot.steps {
            let mark = if step.is_running() { "→" } else { "✓" };
            let _ = writeln!(out, "  {} {}", mark, step.name);
        }
    }

    if !snapshot.tool_calls.is_empty() {
        let _ = writeln!(out, "\nTool calls:");
        for call in &snapshot.tool_calls {
            let status = match call.status {
                ToolCallStatus::Calling => "calling",
                ToolCallStatus::Completed => "completed",
                ToolCallStatus::Finished => "finished",
            };
            let _ = write!(out, "  🔧 {}({}) {}", call.name, call.args_buffer, status);
            if !call.result.is_null() {
                let _ = write!(out, " → {}", call.result);
            }
            out.push('\n');
        }
    }

    let state = serde_json::to_string_pretty(&snapshot.state).unwrap_or_default();
    let _ = writeln!(out, "\nState:\n{}", state);
    out
}
