//! Realtime channel commands: `listen` and `send`.

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use reelhouse_api::{ConnectionState, RealtimeMessage};
use reelhouse_core::AppContext;

use crate::cli::{GlobalOpts, ListenArgs, OutputFormat, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

/// What `listen` prints per message. JSON bodies are inlined, anything else
/// is kept as a string.
#[derive(Debug, Serialize)]
struct MessageView<'a> {
    destination: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscription: Option<&'a str>,
    body: serde_json::Value,
}

impl<'a> From<&'a RealtimeMessage> for MessageView<'a> {
    fn from(message: &'a RealtimeMessage) -> Self {
        Self {
            destination: &message.destination,
            subscription: message.subscription.as_deref(),
            body: serde_json::from_str(&message.body)
                .unwrap_or_else(|_| serde_json::Value::String(message.body.clone())),
        }
    }
}

fn render_message(message: &RealtimeMessage, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain => {
            format!("{}\t{}", message.destination, message.body)
        }
        // One document per line, whatever the pretty-print preference.
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_single(
            OutputFormat::JsonCompact,
            &MessageView::from(message),
            |_| String::new(),
            |_| String::new(),
        ),
        OutputFormat::Yaml => {
            let doc = output::render_single(
                OutputFormat::Yaml,
                &MessageView::from(message),
                |_| String::new(),
                |_| String::new(),
            );
            format!("---\n{}", doc.trim_end())
        }
    }
}

// ── listen ──────────────────────────────────────────────────────────

pub async fn listen(ctx: &AppContext, args: &ListenArgs, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_session(ctx)?;

    let channel = ctx.realtime();
    let mut messages = channel.messages();
    let mut state = channel.watch_state();

    ctx.mount();
    for topic in &args.topics {
        channel.subscribe(topic);
    }

    let mut seen = 0usize;
    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),

            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = *state.borrow_and_update();
                info!(state = ?current, "realtime state changed");
                if current == ConnectionState::Disconnected && !ctx.session().is_authenticated() {
                    break Err(CliError::SessionExpired);
                }
            }

            received = messages.recv() => match received {
                Ok(message) => {
                    output::print_output(&render_message(&message, global.output), global.quiet);
                    seen += 1;
                    if args.count.is_some_and(|limit| seen >= limit) {
                        break Ok(());
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "listener fell behind"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    ctx.shutdown().await;
    result
}

// ── send ────────────────────────────────────────────────────────────

pub async fn send(ctx: &AppContext, args: &SendArgs) -> Result<(), CliError> {
    util::require_session(ctx)?;
    let body: serde_json::Value = serde_json::from_str(&args.body)?;

    let channel = ctx.realtime();
    let mut state = channel.watch_state();
    channel.connect();

    let limit = ctx.config().timeout;
    let connected = matches!(
        tokio::time::timeout(limit, state.wait_for(|s| *s == ConnectionState::Connected)).await,
        Ok(Ok(_))
    );
    if !connected {
        channel.shutdown().await;
        return Err(CliError::Timeout {
            seconds: limit.as_secs(),
        });
    }

    let queued = channel.send_json(&args.destination, &body);
    channel.shutdown().await;

    if queued {
        info!(destination = %args.destination, "message sent");
        Ok(())
    } else {
        Err(CliError::ConnectionFailed {
            url: ctx.config().website_url.to_string(),
            reason: "the realtime channel closed before the message was queued".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str) -> RealtimeMessage {
        RealtimeMessage {
            destination: "/topic/party".into(),
            subscription: Some("sub-1".into()),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    #[test]
    fn plain_output_is_tab_separated() {
        assert_eq!(
            render_message(&message("hello"), OutputFormat::Plain),
            "/topic/party\thello"
        );
    }

    #[test]
    fn json_output_inlines_json_bodies() {
        assert_eq!(
            render_message(&message(r#"{"at":12}"#), OutputFormat::Json),
            r#"{"destination":"/topic/party","subscription":"sub-1","body":{"at":12}}"#
        );
    }

    #[test]
    fn json_output_keeps_text_bodies_as_strings() {
        let out = render_message(&message("not json"), OutputFormat::JsonCompact);
        assert!(out.ends_with(r#""body":"not json"}"#));
    }
}
