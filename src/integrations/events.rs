//! Domain event publisher.
//!
//! Events are always appended to a local log. When the stream is enabled, a URL
//! is configured, and the `redis` feature is compiled in, they are also
//! forwarded to a Redis stream with `XADD <topic> * type <type> payload <json>`.

use super::{Integration, IntegrationStatus, Lifecycle, StatusSnapshot, StatusTracker};
use crate::config::{BackendTarget, EventStreamConfig};
use crate::models::EventRecord;
use crate::Result;
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};

const NAME: &str = "event_stream";

/// Event publisher with a local event log.
pub struct EventPublisher {
    config: EventStreamConfig,
    enabled: bool,
    events: Mutex<Vec<EventRecord>>,
    status: StatusTracker,
    #[cfg(feature = "redis")]
    transport: Mutex<Option<redis::aio::ConnectionManager>>,
}

impl EventPublisher {
    /// Creates an unstarted publisher.
    ///
    /// The publisher is enabled only when the stream is switched on and a URL is
    /// configured; a disabled publisher reports `disabled` from construction.
    #[must_use]
    pub fn new(config: EventStreamConfig) -> Self {
        let enabled = config.enabled && config.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let initial = if enabled {
            IntegrationStatus::Uninitialized
        } else {
            IntegrationStatus::Disabled
        };
        Self {
            config,
            enabled,
            events: Mutex::new(Vec::new()),
            status: StatusTracker::new(NAME, initial),
            #[cfg(feature = "redis")]
            transport: Mutex::new(None),
        }
    }

    /// Whether events are meant to leave the process.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stream topic events are forwarded to.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Emits an event.
    ///
    /// The event is logged locally before forwarding, so it is retained even when
    /// forwarding fails.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OperationFailed`] if an active transport rejects
    /// the event. The status moves to `error` in that case.
    pub async fn emit(&self, event_type: &str, payload: Map<String, Value>) -> Result<()> {
        let record = EventRecord::new(event_type, payload);
        tracing::debug!(event_type, topic = %self.config.topic, "Emitting event");

        #[cfg(feature = "redis")]
        let forwarded = record.clone();

        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);

        #[cfg(feature = "redis")]
        self.forward(&forwarded).await?;

        Ok(())
    }

    /// Events emitted since construction, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<EventRecord> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(feature = "redis")]
    async fn forward(&self, record: &EventRecord) -> Result<()> {
        let transport = self
            .transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(mut conn) = transport else {
            return Ok(());
        };

        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| crate::Error::operation("event_encode", e))?;
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.config.topic)
            .arg("*")
            .arg("type")
            .arg(&record.event_type)
            .arg("payload")
            .arg(payload);
        let call = cmd.query_async::<String>(&mut conn);

        match super::redis_conn::bounded("event_xadd", self.config.connect_timeout(), call).await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::warn!(
                    event_type = %record.event_type,
                    topic = %self.config.topic,
                    error = %e,
                    "Event forwarding failed"
                );
                self.status.mark_failed(e.to_string());
                Err(e)
            },
        }
    }

    #[cfg(feature = "redis")]
    async fn connect_remote(&self, url: &str) {
        match super::redis_conn::connect(url, self.config.connect_timeout()).await {
            Ok(conn) => {
                *self.transport.lock().unwrap_or_else(PoisonError::into_inner) = Some(conn);
                self.status.set(IntegrationStatus::Ready, None);
            },
            Err(e) => self.status.set(IntegrationStatus::Error, Some(e.to_string())),
        }
    }

    #[cfg(not(feature = "redis"))]
    #[allow(clippy::unused_async)]
    async fn connect_remote(&self, _url: &str) {
        self.status.set(
            IntegrationStatus::Error,
            Some("event stream support not compiled in (enable the `redis` feature)".to_string()),
        );
    }
}

impl Integration for EventPublisher {
    fn name(&self) -> &'static str {
        NAME
    }

    fn health(&self) -> StatusSnapshot {
        self.status.snapshot()
    }
}

impl Lifecycle for EventPublisher {
    async fn startup(&self) {
        if !self.enabled {
            self.status.set(IntegrationStatus::Disabled, None);
            return;
        }

        self.status.set(IntegrationStatus::Starting, None);
        match BackendTarget::parse_optional(self.config.url.as_deref()) {
            BackendTarget::InMemory => self.status.set(IntegrationStatus::InMemory, None),
            BackendTarget::Disabled => self.status.set(IntegrationStatus::Disabled, None),
            BackendTarget::Remote(url) => self.connect_remote(&url).await,
        }
    }

    async fn shutdown(&self) {
        #[cfg(feature = "redis")]
        self.transport
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        self.status
            .stop_if(&[IntegrationStatus::Ready, IntegrationStatus::InMemory]);
    }
}
