// Websocket dashboard channel with reconnect backoff
use crate::application::dashboard_channel::{ChannelError, ChannelEvent, DashboardChannel};
use crate::domain::event::OutboundMessage;
use crate::infrastructure::config::{encode_segments, prepare_path, ReconnectSettings};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Exponential backoff between reconnect attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    pub fn from_settings(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier.max(1.0),
            max_attempts: settings.max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-based), `None` once the
    /// attempt budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return None;
        }
        let factor = self.multiplier.powi(attempt.min(64) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor).min(self.max_delay.as_millis() as f64);
        Some(Duration::from_millis(millis as u64))
    }
}

enum Command {
    Send(String),
    Close,
}

enum Outcome {
    Lost(String),
    Closed,
}

/// Handle to the background connection task. Cheap to share behind an `Arc`.
pub struct WsChannel {
    commands: mpsc::UnboundedSender<Command>,
}

impl WsChannel {
    /// Full websocket URL for a pipeline key.
    pub fn url_for(ws_url: &str, path_template: &str, pipeline_key: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("pipeline_key".to_string(), encode_segments(pipeline_key));
        format!("{}{}", ws_url.trim_end_matches('/'), prepare_path(path_template, &vars))
    }

    /// Spawn the connection task. Everything it observes is reported, in
    /// order, on the returned receiver.
    pub fn open(url: String, policy: ReconnectPolicy) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(url, policy, command_rx, event_tx));
        (Self { commands: command_tx }, event_rx)
    }
}

impl DashboardChannel for WsChannel {
    fn send(&self, message: &OutboundMessage) -> Result<(), ChannelError> {
        let text = message.to_json()?;
        self.commands
            .send(Command::Send(text))
            .map_err(|_| ChannelError::Closed)
    }

    fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

async fn run_connection(
    url: String,
    policy: ReconnectPolicy,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ChannelEvent>,
) {
    let mut attempt = 0u32;

    loop {
        let outcome = match connect_async(url.as_str()).await {
            Ok((socket, _)) => {
                attempt = 0;
                tracing::info!("Dashboard channel connected to {}", url);
                if events.send(ChannelEvent::Connected).is_err() {
                    return;
                }

                let (mut sink, mut stream) = socket.split();
                loop {
                    tokio::select! {
                        command = commands.recv() => match command {
                            Some(Command::Send(text)) => {
                                if let Err(e) = sink.send(Message::Text(text)).await {
                                    break Outcome::Lost(e.to_string());
                                }
                            }
                            Some(Command::Close) | None => {
                                let _ = sink.send(Message::Close(None)).await;
                                break Outcome::Closed;
                            }
                        },
                        frame = stream.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                if events.send(ChannelEvent::Frame(text)).is_err() {
                                    break Outcome::Closed;
                                }
                            }
                            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                                Ok(text) => {
                                    if events.send(ChannelEvent::Frame(text)).is_err() {
                                        break Outcome::Closed;
                                    }
                                }
                                Err(_) => tracing::warn!("Dropping non UTF-8 binary frame"),
                            },
                            Some(Ok(Message::Close(frame))) => {
                                break Outcome::Lost(format!("server closed connection: {:?}", frame));
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => break Outcome::Lost(e.to_string()),
                            None => break Outcome::Lost("stream ended".to_string()),
                        },
                    }
                }
            }
            Err(e) => Outcome::Lost(format!("connect failed: {}", e)),
        };

        match outcome {
            Outcome::Closed => {
                let _ = events.send(ChannelEvent::Closed);
                return;
            }
            Outcome::Lost(reason) => {
                if events.send(ChannelEvent::Disconnected { reason }).is_err() {
                    return;
                }
            }
        }

        let Some(delay) = policy.delay_for(attempt) else {
            tracing::error!("Giving up on {} after {} reconnect attempts", url, attempt);
            let _ = events.send(ChannelEvent::Closed);
            return;
        };
        attempt += 1;
        tracing::info!("Reconnecting to {} in {:?} (attempt {})", url, delay, attempt);

        // Sends while disconnected are dropped; subscriptions are re-sent on connect.
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                command = commands.recv() => match command {
                    Some(Command::Send(_)) => tracing::debug!("Dropping message while disconnected"),
                    Some(Command::Close) | None => {
                        let _ = events.send(ChannelEvent::Closed);
                        return;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: Option<u32>) -> ReconnectPolicy {
        ReconnectPolicy::from_settings(&ReconnectSettings {
            initial_delay_ms: 500,
            max_delay_ms: 4_000,
            multiplier: 2.0,
            max_attempts,
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = policy(None);
        let delays: Vec<u64> = (0..6)
            .map(|n| policy.delay_for(n).unwrap().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 4_000, 4_000]);
        assert!(policy.delay_for(10_000).is_some());
    }

    #[test]
    fn test_backoff_attempt_budget() {
        let policy = policy(Some(2));
        assert!(policy.delay_for(1).is_some());
        assert!(policy.delay_for(2).is_none());
    }

    #[test]
    fn test_url_for_pipeline_key() {
        assert_eq!(
            WsChannel::url_for("ws://localhost:8000/", "/ws/dashboard/${pipeline_key}", "acme/live feed"),
            "ws://localhost:8000/ws/dashboard/acme/live%20feed"
        );
    }

    #[tokio::test]
    async fn test_close_while_unreachable_reports_closed() {
        // Nothing listens on port 9 of the loopback; the first connect fails fast.
        let (channel, mut events) = WsChannel::open("ws://127.0.0.1:9/ws".to_string(), policy(None));
        assert!(matches!(events.recv().await, Some(ChannelEvent::Disconnected { .. })));

        channel.close();
        assert_eq!(events.recv().await, Some(ChannelEvent::Closed));
        let message = OutboundMessage::fetch("w1".into(), 1);
        assert!(matches!(channel.send(&message), Err(ChannelError::Closed)));
    }
}
