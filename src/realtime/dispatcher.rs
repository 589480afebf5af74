//! Message dispatcher: drives classification, filtering, and cache resolution
//! for batches of raw envelopes, and publishes the resolved events.

use crate::cache::EntityCache;
use crate::error::Result;
use crate::logging::{Timer, log_error};
use crate::model::{EntityKind, RawEnvelope};
use crate::realtime::classifier::classify;
use crate::realtime::events::{Listener, ResolvedEvent, SubscriberRegistry, Subscription};
use crate::realtime::filter::IgnoredStreams;
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Non-fatal conditions the pipeline swallows by default.
///
/// Hosts that want visibility into drops register a hook; nothing here changes
/// dispatch behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    UnknownKey { key: String },
    KindFailed { kind: EntityKind, error: String },
}

pub type DiagnosticHook = Box<dyn Fn(&Diagnostic) + Send + Sync>;

/// Orchestrates the push pipeline: classify, filter, resolve, publish.
///
/// Envelopes are processed strictly in arrival order, one at a time, so
/// causally ordered state changes ("stream created" before "post in that
/// stream") reach subscribers in order. The only suspension points are cache
/// fetches, and a failure anywhere in one kind group never aborts the rest of
/// the batch.
pub struct MessageDispatcher {
    cache: Arc<EntityCache>,
    registry: SubscriberRegistry,
    ignored_streams: IgnoredStreams,
    diagnostics: Mutex<Option<DiagnosticHook>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MessageDispatcher {
    pub fn new(cache: Arc<EntityCache>) -> Self {
        Self {
            cache,
            registry: SubscriberRegistry::new(),
            ignored_streams: IgnoredStreams::new(),
            diagnostics: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Register a listener for resolved events.
    pub fn subscribe(&self, listener: Listener) -> Subscription {
        self.registry.subscribe(listener)
    }

    /// Opt out of a stream. Takes effect for envelopes processed after this
    /// call; already-queued envelopes are unaffected.
    pub fn ignore_stream(&self, stream_id: impl Into<String>) {
        self.ignored_streams.ignore(stream_id);
    }

    /// Install a hook observing swallowed diagnostics (unknown keys, failed
    /// kind groups).
    pub fn set_diagnostic_hook(&self, hook: DiagnosticHook) {
        *self
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    fn emit_diagnostic(&self, diagnostic: Diagnostic) {
        if let Some(hook) = self
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            hook(&diagnostic);
        }
    }

    /// Process one batch of envelopes, in arrival order.
    pub async fn process_batch(&self, batch: Vec<RawEnvelope>) {
        let _timer = Timer::new("process_batch");
        tracing::debug!(envelopes = batch.len(), "Processing push batch");

        for envelope in batch {
            self.process_envelope(envelope).await;
        }
    }

    /// Process a single envelope: classify, then dispatch each kind group.
    pub async fn process_envelope(&self, envelope: RawEnvelope) {
        tracing::debug!(
            request_id = ?envelope.request_id,
            keys = envelope.payloads.len(),
            "Processing push envelope"
        );

        let classification = classify(&envelope);
        for key in classification.unknown_keys {
            self.emit_diagnostic(Diagnostic::UnknownKey { key });
        }

        for (kind, payloads) in classification.groups {
            if let Err(e) = self.dispatch_kind(kind, payloads).await {
                log_error(&format!("dispatch_{kind}"), &e);
                self.emit_diagnostic(Diagnostic::KindFailed {
                    kind,
                    error: e.to_string(),
                });
            }
        }
    }

    /// Filter, resolve, and publish one kind group.
    async fn dispatch_kind(&self, kind: EntityKind, payloads: Vec<Value>) -> Result<()> {
        tracing::debug!(
            kind = %kind,
            payloads = payloads.len(),
            "Push message group received"
        );

        let payloads = if kind == EntityKind::Streams {
            self.ignored_streams.filter(payloads)
        } else {
            payloads
        };
        if payloads.is_empty() {
            return Ok(());
        }

        let entities = self.cache.resolve(kind, payloads).await;
        if entities.is_empty() {
            tracing::debug!(kind = %kind, "No entities survived resolution, no event");
            return Ok(());
        }

        let event = ResolvedEvent::from_entities(kind, entities)?;
        self.registry.publish(&event);
        Ok(())
    }

    /// Attach to a transport delivering batches, processing them sequentially
    /// on a background task. Rebinding replaces any previous binding.
    pub fn bind(self: Arc<Self>, mut receiver: mpsc::Receiver<Vec<RawEnvelope>>) {
        let dispatcher = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(batch) = receiver.recv().await {
                dispatcher.process_batch(batch).await;
            }
            tracing::debug!("Transport channel closed, dispatch loop ending");
        });

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = worker.replace(handle) {
            tracing::warn!("Rebinding dispatcher to a new transport");
            previous.abort();
        }
    }

    /// Tear down the pipeline: detach from the transport and drop subscriber
    /// registrations. In-flight fetches finish on their own; their results are
    /// discarded since no listener remains.
    pub fn dispose(&self) {
        if let Some(handle) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        self.registry.clear();
        tracing::info!("Dispatcher disposed");
    }
}
