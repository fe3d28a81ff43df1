// Live widget data client - Per-widget subscriptions multiplexed over one channel
use crate::application::dashboard_channel::{ChannelError, DashboardChannel};
use crate::application::dashboard_store::{ConnectionState, DashboardStore};
use crate::domain::event::{DashboardEvent, OutboundMessage};
use crate::domain::view::ViewParams;
use crate::domain::widget::WidgetId;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Subscription {
    view: ViewParams,
    /// Sequence number of the latest subscribe for this widget.
    seq: u64,
    /// Sequence numbers of data requests still awaiting a response, oldest first.
    in_flight: VecDeque<u64>,
}

/// Outcome of dispatching one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Applied(WidgetId),
    ErrorRecorded(WidgetId),
    /// Response to a superseded request, ignored.
    Stale(WidgetId),
    Acknowledged,
    Refetched(Vec<WidgetId>),
    ChannelError(String),
    Forwarded(DashboardEvent),
    Dropped,
}

pub struct LiveDataClient {
    pipeline_key: String,
    channel: Arc<dyn DashboardChannel>,
    subscriptions: HashMap<WidgetId, Subscription>,
    /// Fetches awaiting a response across all widgets, in send order. The
    /// server answers fetches one at a time, so an error naming no widget
    /// belongs to the oldest entry.
    outstanding: VecDeque<(WidgetId, u64)>,
    connected: bool,
    closed: bool,
}

impl LiveDataClient {
    pub fn new(pipeline_key: impl Into<String>, channel: Arc<dyn DashboardChannel>) -> Self {
        Self {
            pipeline_key: pipeline_key.into(),
            channel,
            subscriptions: HashMap::new(),
            outstanding: VecDeque::new(),
            connected: false,
            closed: false,
        }
    }

    pub fn pipeline_key(&self) -> &str {
        &self.pipeline_key
    }

    /// Record the widget's desired view and request it. Supersedes any earlier
    /// subscription for the same widget; responses to those are discarded.
    /// While disconnected the view is only recorded and goes out on connect.
    pub fn subscribe(&mut self, widget_id: &WidgetId, view: ViewParams) -> Result<(), ChannelError> {
        if self.closed {
            return Ok(());
        }

        let sub = self
            .subscriptions
            .entry(widget_id.clone())
            .or_insert_with(|| Subscription {
                view: view.clone(),
                seq: 0,
                in_flight: VecDeque::new(),
            });
        sub.seq += 1;
        sub.view = view;
        let seq = sub.seq;
        if !self.connected {
            tracing::debug!("Channel not connected, deferring subscribe for {}", widget_id);
            return Ok(());
        }
        let subscribe = OutboundMessage::subscribe(widget_id.clone(), seq, &sub.view);

        tracing::debug!(
            "Subscribing {} to {} page {} (seq {})",
            widget_id,
            sub.view.table,
            sub.view.page,
            seq
        );
        self.channel.send(&subscribe)?;
        self.request(widget_id)
    }

    /// Re-request the current view of a subscribed widget.
    pub fn fetch(&mut self, widget_id: &WidgetId) -> Result<(), ChannelError> {
        if self.closed {
            return Ok(());
        }
        if !self.subscriptions.contains_key(widget_id) {
            tracing::debug!("Fetch for unsubscribed widget {} ignored", widget_id);
            return Ok(());
        }
        self.request(widget_id)
    }

    /// Forget a widget. Nothing is sent; later events for it are dropped.
    pub fn unsubscribe(&mut self, widget_id: &WidgetId) {
        if self.subscriptions.remove(widget_id).is_some() {
            tracing::debug!("Unsubscribed {}", widget_id);
        }
    }

    pub fn close(&mut self, store: &mut DashboardStore) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connected = false;
        self.subscriptions.clear();
        self.outstanding.clear();
        self.channel.close();
        store.set_connection_state(ConnectionState::Closed);
        tracing::info!("Dashboard channel for {} closed", self.pipeline_key);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn view(&self, widget_id: &WidgetId) -> Option<ViewParams> {
        self.subscriptions.get(widget_id).map(|s| s.view.clone())
    }

    pub fn latest_seq(&self, widget_id: &WidgetId) -> Option<u64> {
        self.subscriptions.get(widget_id).map(|s| s.seq)
    }

    pub fn pending(&self, widget_id: &WidgetId) -> usize {
        self.subscriptions
            .get(widget_id)
            .map_or(0, |s| s.in_flight.len())
    }

    pub fn subscribed_widgets(&self) -> Vec<WidgetId> {
        let mut ids: Vec<WidgetId> = self.subscriptions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The transport (re)connected: re-send every live subscription.
    pub fn on_connected(&mut self, store: &mut DashboardStore) -> Result<(), ChannelError> {
        if self.closed {
            return Ok(());
        }
        self.connected = true;
        store.set_connection_state(ConnectionState::Open);

        let widgets = self.subscribed_widgets();
        if !widgets.is_empty() {
            tracing::info!("Re-subscribing {} widget(s) on {}", widgets.len(), self.pipeline_key);
        }
        for widget_id in widgets {
            if let Some(view) = self.view(&widget_id) {
                self.subscribe(&widget_id, view)?;
            }
        }
        Ok(())
    }

    /// The transport dropped. Outstanding requests will never be answered;
    /// cached data stays in the store.
    pub fn on_disconnected(&mut self, store: &mut DashboardStore, reason: &str) {
        if self.closed {
            return;
        }
        tracing::warn!("Dashboard channel for {} lost: {}", self.pipeline_key, reason);
        self.connected = false;
        for sub in self.subscriptions.values_mut() {
            sub.in_flight.clear();
        }
        self.outstanding.clear();
        store.set_connection_state(ConnectionState::Disconnected);
    }

    /// Decode and apply one inbound frame. Never fails: malformed or
    /// unattributable frames are logged and dropped.
    pub fn handle_frame(&mut self, text: &str, store: &mut DashboardStore) -> Dispatch {
        if self.closed {
            return Dispatch::Dropped;
        }
        let event = match DashboardEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Dropping inbound frame: {}", e);
                return Dispatch::Dropped;
            }
        };
        self.dispatch(event, store)
    }

    pub fn dispatch(&mut self, event: DashboardEvent, store: &mut DashboardStore) -> Dispatch {
        match event {
            DashboardEvent::Dataset {
                widget_id: Some(widget_id),
                seq,
                dataset,
            } => {
                self.retire(&widget_id, seq);
                if !self.accept_response(&widget_id, seq) {
                    return self.rejected(widget_id);
                }
                if store.set_dashboard_data(&widget_id, dataset) {
                    Dispatch::Applied(widget_id)
                } else {
                    Dispatch::Dropped
                }
            }
            DashboardEvent::Error {
                widget_id: Some(widget_id),
                seq,
                error,
            } => {
                self.retire(&widget_id, seq);
                if !self.accept_response(&widget_id, seq) {
                    return self.rejected(widget_id);
                }
                tracing::warn!("Server error for widget {}: {}", widget_id, error);
                if store.set_widget_error(&widget_id, error) {
                    Dispatch::ErrorRecorded(widget_id)
                } else {
                    Dispatch::Dropped
                }
            }
            DashboardEvent::Error {
                widget_id: None,
                error,
                ..
            } => {
                tracing::warn!("Server error on {}: {}", self.pipeline_key, error);
                store.set_channel_error(error.clone());
                if let Some((widget_id, seq)) = self.outstanding.pop_front() {
                    if self.accept_response(&widget_id, Some(seq)) {
                        store.set_widget_error(&widget_id, error.clone());
                    }
                }
                Dispatch::ChannelError(error)
            }
            DashboardEvent::Dataset { widget_id: None, .. } => {
                tracing::debug!("Dropping dataset without widget_id");
                Dispatch::Dropped
            }
            DashboardEvent::Subscribed { widget_id } => {
                tracing::debug!("Subscription acknowledged for {:?}", widget_id);
                Dispatch::Acknowledged
            }
            DashboardEvent::DataChanged { tables, .. } => {
                let mut refetched = Vec::new();
                for widget_id in self.subscribed_widgets() {
                    let watches = self
                        .subscriptions
                        .get(&widget_id)
                        .is_some_and(|s| tables.contains(&s.view.table));
                    if !watches {
                        continue;
                    }
                    match self.request(&widget_id) {
                        Ok(()) => refetched.push(widget_id),
                        Err(e) => tracing::warn!("Failed to refetch widget {}: {}", widget_id, e),
                    }
                }
                Dispatch::Refetched(refetched)
            }
            DashboardEvent::Tables { tables } => {
                store.set_available_tables(tables.clone());
                Dispatch::Forwarded(DashboardEvent::Tables { tables })
            }
            other => Dispatch::Forwarded(other),
        }
    }

    fn request(&mut self, widget_id: &WidgetId) -> Result<(), ChannelError> {
        if !self.connected {
            return Ok(());
        }
        let Some(sub) = self.subscriptions.get_mut(widget_id) else {
            return Ok(());
        };
        self.channel
            .send(&OutboundMessage::fetch(widget_id.clone(), sub.seq))?;
        sub.in_flight.push_back(sub.seq);
        self.outstanding.push_back((widget_id.clone(), sub.seq));
        Ok(())
    }

    /// Drop the connection-wide entries answered by a widget's response.
    fn retire(&mut self, widget_id: &WidgetId, seq: Option<u64>) {
        match seq {
            Some(seq) => self.outstanding.retain(|(id, s)| id != widget_id || *s > seq),
            None => {
                if let Some(pos) = self.outstanding.iter().position(|(id, _)| id == widget_id) {
                    self.outstanding.remove(pos);
                }
            }
        }
    }

    /// Match a response against the widget's outstanding requests. An echoed
    /// `seq` is authoritative; otherwise responses pair with requests in
    /// send order. Anything older than the latest subscribe is stale.
    fn accept_response(&mut self, widget_id: &WidgetId, seq: Option<u64>) -> bool {
        let Some(sub) = self.subscriptions.get_mut(widget_id) else {
            return false;
        };
        let answered = match seq {
            Some(seq) => {
                while sub.in_flight.front().is_some_and(|&s| s <= seq) {
                    sub.in_flight.pop_front();
                }
                Some(seq)
            }
            None => sub.in_flight.pop_front(),
        };
        // Unsolicited pushes (nothing outstanding) describe the current view.
        answered.is_none_or(|s| s >= sub.seq)
    }

    fn rejected(&self, widget_id: WidgetId) -> Dispatch {
        if self.subscriptions.contains_key(&widget_id) {
            tracing::debug!("Discarding stale response for {}", widget_id);
            Dispatch::Stale(widget_id)
        } else {
            tracing::debug!("Dropping event for unknown widget {}", widget_id);
            Dispatch::Dropped
        }
    }
}
