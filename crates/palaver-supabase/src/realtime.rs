// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push gateway over the backend's Phoenix-protocol websocket.
//!
//! Each subscription owns its own socket: join a channel scoped to one
//! table with an INSERT binding, forward every pushed record into the
//! subscription's feed, heartbeat to keep the channel alive, and leave the
//! channel when the handle is cancelled. Closing the socket is what
//! releases the server-side subscription, so the socket lives and dies
//! with the handle.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use palaver_core::traits::RealtimeGateway;
use palaver_core::{Filter, PalaverError, Row, Subscription};

use crate::client::SupabaseClient;
use crate::wire::PhoenixEnvelope;

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const INSERT_BUFFER: usize = 256;

/// Websocket endpoint for the push service, derived from the REST base URL.
pub(crate) fn websocket_url(base_url: &str, anon_key: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{ws_base}/realtime/v1/websocket?apikey={anon_key}&vsn=1.0.0")
}

/// Channel-join envelope binding one table's INSERT events under a filter.
pub(crate) fn join_envelope(
    topic: &str,
    table: &str,
    filter: &str,
    access_token: &str,
    reference: &str,
) -> PhoenixEnvelope {
    PhoenixEnvelope {
        topic: topic.to_string(),
        event: "phx_join".to_string(),
        payload: json!({
            "config": {
                "postgres_changes": [
                    {"event": "INSERT", "schema": "public", "table": table, "filter": filter}
                ]
            },
            "access_token": access_token,
        }),
        reference: Some(reference.to_string()),
    }
}

/// Pulls the inserted record out of a pushed change event.
///
/// Current deployments nest it under `payload.data.record`; older ones put
/// it at the payload root.
pub(crate) fn insert_record(payload: &serde_json::Value) -> Option<Row> {
    payload
        .get("data")
        .and_then(|d| d.get("record"))
        .or_else(|| payload.get("record"))
        .cloned()
}

#[async_trait]
impl RealtimeGateway for SupabaseClient {
    async fn subscribe(&self, table: &str, filter: Filter) -> Result<Subscription, PalaverError> {
        let (column, value) = filter.as_single_eq().ok_or_else(|| PalaverError::Subscription {
            message: "push filters must be a single-column equality".to_string(),
            source: None,
        })?;
        let change_filter = format!("{column}=eq.{value}");

        let url = websocket_url(&self.base_url, &self.anon_key);
        let (stream, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| PalaverError::Subscription {
                    message: format!("websocket connect failed: {e}"),
                    source: Some(Box::new(e)),
                })?;
        let (mut sink, mut source) = stream.split();

        let topic = format!("realtime:public:{table}");
        let access_token = self.bearer_token().await;
        let join = join_envelope(&topic, table, &change_filter, &access_token, "1");
        send_envelope(&mut sink, &join).await?;

        // The channel is not armed until the backend acknowledges the join;
        // returning earlier would let callers believe a feed exists that
        // the server never opened.
        wait_for_join_ack(&mut source).await?;
        info!(table, filter = %change_filter, "push subscription armed");

        let (tx, rx) = mpsc::channel::<Row>(INSERT_BUFFER);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let heartbeat_period = self.heartbeat;
        let task_topic = topic.clone();
        let task_table = table.to_string();

        tokio::spawn(async move {
            let mut heartbeat = tokio::time::interval(heartbeat_period);
            heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Ref "1" was spent on the join.
            let mut next_ref: u64 = 2;

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        let leave = PhoenixEnvelope {
                            topic: task_topic.clone(),
                            event: "phx_leave".to_string(),
                            payload: json!({}),
                            reference: Some(next_ref.to_string()),
                        };
                        let _ = send_envelope(&mut sink, &leave).await;
                        let _ = sink.close().await;
                        debug!(table = %task_table, "push subscription released");
                        break;
                    }
                    _ = heartbeat.tick() => {
                        let beat = PhoenixEnvelope {
                            topic: "phoenix".to_string(),
                            event: "heartbeat".to_string(),
                            payload: json!({}),
                            reference: Some(next_ref.to_string()),
                        };
                        next_ref += 1;
                        if send_envelope(&mut sink, &beat).await.is_err() {
                            warn!(table = %task_table, "heartbeat failed, closing push feed");
                            break;
                        }
                    }
                    message = source.next() => match message {
                        Some(Ok(WsMessage::Text(text))) => {
                            let envelope: PhoenixEnvelope = match serde_json::from_str(text.as_str()) {
                                Ok(envelope) => envelope,
                                Err(e) => {
                                    warn!(error = %e, "unparseable push frame, skipping");
                                    continue;
                                }
                            };
                            match envelope.event.as_str() {
                                "postgres_changes" => {
                                    let Some(record) = insert_record(&envelope.payload) else {
                                        warn!(table = %task_table, "change event without a record");
                                        continue;
                                    };
                                    if tx.send(record).await.is_err() {
                                        // Handle dropped without cancel; nothing left to feed.
                                        break;
                                    }
                                }
                                "phx_error" => {
                                    warn!(table = %task_table, "channel errored, closing push feed");
                                    break;
                                }
                                // Replies to heartbeats/leave and system notices.
                                _ => {}
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            info!(table = %task_table, "push socket closed by backend");
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(table = %task_table, error = %e, "push socket error");
                            break;
                        }
                    }
                }
            }
        });

        Ok(Subscription::new(rx, cancel))
    }
}

async fn send_envelope<S>(sink: &mut S, envelope: &PhoenixEnvelope) -> Result<(), PalaverError>
where
    S: futures::Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    let text = serde_json::to_string(envelope)
        .map_err(|e| PalaverError::Internal(format!("unserializable envelope: {e}")))?;
    sink.send(WsMessage::Text(text.into()))
        .await
        .map_err(|e| PalaverError::Subscription {
            message: format!("websocket send failed: {e}"),
            source: None,
        })
}

async fn wait_for_join_ack<S>(source: &mut S) -> Result<(), PalaverError>
where
    S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(JOIN_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                return Err(PalaverError::Subscription {
                    message: "timed out waiting for channel join acknowledgment".to_string(),
                    source: None,
                });
            }
            message = source.next() => match message {
                Some(Ok(WsMessage::Text(text))) => {
                    let Ok(envelope) = serde_json::from_str::<PhoenixEnvelope>(text.as_str()) else {
                        continue;
                    };
                    if envelope.event == "phx_reply" && envelope.reference.as_deref() == Some("1") {
                        let status = envelope
                            .payload
                            .get("status")
                            .and_then(|s| s.as_str())
                            .unwrap_or("unknown");
                        if status == "ok" {
                            return Ok(());
                        }
                        return Err(PalaverError::Subscription {
                            message: format!("channel join rejected: {}", envelope.payload),
                            source: None,
                        });
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    return Err(PalaverError::Subscription {
                        message: "websocket closed during channel join".to_string(),
                        source: None,
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(PalaverError::Subscription {
                        message: format!("websocket error during channel join: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palaver_config::model::BackendConfig;

    #[test]
    fn websocket_url_swaps_scheme_and_carries_key() {
        assert_eq!(
            websocket_url("https://abc.supabase.co", "anon"),
            "wss://abc.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
        assert_eq!(
            websocket_url("http://localhost:54321", "anon"),
            "ws://localhost:54321/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn join_envelope_binds_insert_events_under_filter() {
        let envelope = join_envelope(
            "realtime:public:messages",
            "messages",
            "chat_id=eq.c1",
            "jwt",
            "1",
        );
        assert_eq!(envelope.event, "phx_join");
        let binding = &envelope.payload["config"]["postgres_changes"][0];
        assert_eq!(binding["event"], "INSERT");
        assert_eq!(binding["schema"], "public");
        assert_eq!(binding["table"], "messages");
        assert_eq!(binding["filter"], "chat_id=eq.c1");
        assert_eq!(envelope.payload["access_token"], "jwt");
    }

    #[test]
    fn insert_record_handles_both_payload_shapes() {
        let nested = json!({"data": {"type": "INSERT", "record": {"id": "m1"}}});
        assert_eq!(insert_record(&nested).unwrap()["id"], "m1");

        let flat = json!({"record": {"id": "m2"}});
        assert_eq!(insert_record(&flat).unwrap()["id"], "m2");

        assert!(insert_record(&json!({"ids": [1]})).is_none());
    }

    #[tokio::test]
    async fn compound_filters_are_rejected_before_connecting() {
        let config = BackendConfig {
            url: "https://placeholder.invalid".to_string(),
            anon_key: Some("anon".to_string()),
            service_role_key: None,
            request_timeout_secs: 5,
            realtime_heartbeat_secs: 25,
        };
        let client = SupabaseClient::new(&config).unwrap();
        let filter = Filter::all([Filter::eq("a", "1"), Filter::eq("b", "2")]);
        let err = client.subscribe("messages", filter).await.unwrap_err();
        match err {
            PalaverError::Subscription { message, .. } => {
                assert!(message.contains("single-column equality"));
            }
            other => panic!("expected subscription error, got {other:?}"),
        }
    }
}
