// Duplex channel messages: outbound requests and inbound dashboard events
use super::view::{FilterSpec, SortSpec, ViewParams};
use super::widget::WidgetId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Rows fetched for one widget view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub rows: Vec<Value>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub total: u64,
}

impl Dataset {
    pub fn new(rows: Vec<Value>, columns: Vec<String>, total: u64) -> Self {
        Self {
            rows,
            columns,
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundMessage {
    Subscribe {
        widget_id: WidgetId,
        seq: u64,
        table: String,
        page: u32,
        page_size: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        sort: Option<SortSpec>,
        #[serde(skip_serializing_if = "Option::is_none")]
        filters: Option<Vec<FilterSpec>>,
    },
    Fetch {
        widget_id: WidgetId,
        seq: u64,
    },
}

impl OutboundMessage {
    pub fn subscribe(widget_id: WidgetId, seq: u64, view: &ViewParams) -> Self {
        OutboundMessage::Subscribe {
            widget_id,
            seq,
            table: view.table.clone(),
            page: view.wire_page(),
            page_size: view.page_size,
            sort: view.sort.clone(),
            filters: view.filters.clone(),
        }
    }

    pub fn fetch(widget_id: WidgetId, seq: u64) -> Self {
        OutboundMessage::Fetch { widget_id, seq }
    }

    pub fn widget_id(&self) -> &WidgetId {
        match self {
            OutboundMessage::Subscribe { widget_id, .. } | OutboundMessage::Fetch { widget_id, .. } => {
                widget_id
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame has no event tag")]
    MissingTag,
}

/// Inbound message from the dashboard channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Dataset {
        widget_id: Option<WidgetId>,
        seq: Option<u64>,
        dataset: Dataset,
    },
    Error {
        widget_id: Option<WidgetId>,
        seq: Option<u64>,
        error: String,
    },
    Tables {
        tables: Vec<String>,
    },
    DataChanged {
        tables: Vec<String>,
        row_counts: HashMap<String, u64>,
    },
    Subscribed {
        widget_id: Option<WidgetId>,
    },
    Other {
        event: String,
        payload: Value,
    },
}

#[derive(Debug, Default, Deserialize)]
struct EventFields {
    #[serde(default)]
    widget_id: Option<WidgetId>,
    #[serde(default)]
    seq: Option<u64>,
    #[serde(default)]
    tables: Option<Vec<String>>,
    #[serde(default)]
    rows: Option<Vec<Value>>,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    row_counts: Option<HashMap<String, u64>>,
}

impl DashboardEvent {
    pub fn parse(text: &str) -> Result<Self, EventDecodeError> {
        let payload: Value = serde_json::from_str(text)?;
        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .ok_or(EventDecodeError::MissingTag)?
            .to_string();

        let known = matches!(
            event.as_str(),
            "dataset" | "page" | "error" | "tables" | "data_changed" | "subscribed"
        );
        if !known {
            return Ok(DashboardEvent::Other { event, payload });
        }

        let fields: EventFields = serde_json::from_value(payload)?;
        let parsed = match event.as_str() {
            "dataset" | "page" => {
                let rows = fields.rows.unwrap_or_default();
                let total = fields.total.unwrap_or(rows.len() as u64);
                DashboardEvent::Dataset {
                    widget_id: fields.widget_id,
                    seq: fields.seq,
                    dataset: Dataset::new(rows, fields.columns.unwrap_or_default(), total),
                }
            }
            "error" => DashboardEvent::Error {
                widget_id: fields.widget_id,
                seq: fields.seq,
                error: fields.error.unwrap_or_else(|| "unknown error".to_string()),
            },
            "tables" => DashboardEvent::Tables {
                tables: fields.tables.unwrap_or_default(),
            },
            "data_changed" => DashboardEvent::DataChanged {
                tables: fields.tables.unwrap_or_default(),
                row_counts: fields.row_counts.unwrap_or_default(),
            },
            _ => DashboardEvent::Subscribed {
                widget_id: fields.widget_id,
            },
        };
        Ok(parsed)
    }

    pub fn kind(&self) -> &str {
        match self {
            DashboardEvent::Dataset { .. } => "dataset",
            DashboardEvent::Error { .. } => "error",
            DashboardEvent::Tables { .. } => "tables",
            DashboardEvent::DataChanged { .. } => "data_changed",
            DashboardEvent::Subscribed { .. } => "subscribed",
            DashboardEvent::Other { event, .. } => event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_wire_shape() {
        let view = ViewParams::new("t").with_page(2).with_sort("amount", true);
        let msg = OutboundMessage::subscribe(WidgetId::from("w1"), 4, &view);
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "action": "subscribe",
                "widget_id": "w1",
                "seq": 4,
                "table": "t",
                "page": 1,
                "page_size": 50,
                "sort": {"column": "amount", "desc": true}
            })
        );
    }

    #[test]
    fn test_fetch_wire_shape() {
        let msg = OutboundMessage::fetch(WidgetId::from("w1"), 2);
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"action": "fetch", "widget_id": "w1", "seq": 2}));
    }

    #[test]
    fn test_parse_page_alias() {
        let event = DashboardEvent::parse(
            r#"{"event":"page","widget_id":"w1","rows":[{"x":1}],"columns":["x"],"total":10}"#,
        )
        .unwrap();
        match event {
            DashboardEvent::Dataset {
                widget_id, dataset, ..
            } => {
                assert_eq!(widget_id, Some(WidgetId::from("w1")));
                assert_eq!(dataset.total, 10);
                assert_eq!(dataset.columns, vec!["x".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            DashboardEvent::parse("{not json"),
            Err(EventDecodeError::Malformed(_))
        ));
        assert!(matches!(
            DashboardEvent::parse(r#"{"widget_id":"w1"}"#),
            Err(EventDecodeError::MissingTag)
        ));
    }

    #[test]
    fn test_unknown_event_is_forwarded_unmodified() {
        let text = r#"{"event":"heartbeat","at":17}"#;
        match DashboardEvent::parse(text).unwrap() {
            DashboardEvent::Other { event, payload } => {
                assert_eq!(event, "heartbeat");
                assert_eq!(payload, json!({"event": "heartbeat", "at": 17}));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
}
