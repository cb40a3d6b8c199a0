//!
//! # Watch with refresh
//!
//! A watch is reopened, without a resource version, whenever the server
//! reports the version as gone (410), the connection drops mid-stream or the
//! stream simply ends. A 401 refreshes the token before reopening. Any other
//! failure is returned to the caller.
//!
use std::fmt;

use futures_util::{Stream, StreamExt};
use kube::api::{DynamicObject, WatchEvent, WatchParams};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{OpenShiftError, Result, is_status};
use crate::kind::KindMetadata;
use crate::manager::{OpenShiftManager, dynamic_api};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEvent {
    pub event_type: EventType,
    pub object: Value,
}

impl ResourceEvent {
    pub fn name(&self) -> Option<&str> {
        self.object["metadata"]["name"].as_str()
    }
}

/// Decides when a watch is done
pub trait WatchHandler {
    /// `Ok(true)` ends the watch
    fn on_event(&mut self, event: &ResourceEvent, kind: &KindMetadata) -> Result<bool>;
}

impl<F> WatchHandler for F
where
    F: FnMut(&ResourceEvent, &KindMetadata) -> Result<bool>,
{
    fn on_event(&mut self, event: &ResourceEvent, kind: &KindMetadata) -> Result<bool> {
        self(event, kind)
    }
}

/// transport failures after which the stream is reopened
fn is_transient(err: &kube::Error) -> bool {
    matches!(err, kube::Error::ReadEvents(_) | kube::Error::HyperError(_))
}

impl OpenShiftManager {
    /// Watch a cluster-scoped collection until `handler` is satisfied
    pub async fn watch_custom_resource<H>(&self, kind: &KindMetadata, handler: &mut H) -> Result<()>
    where
        H: WatchHandler + ?Sized,
    {
        self.watch(kind, None, handler).await
    }

    /// Watch a collection in `project` until `handler` is satisfied
    pub async fn watch_namespaced_custom_resource<H>(
        &self,
        project: &str,
        kind: &KindMetadata,
        handler: &mut H,
    ) -> Result<()>
    where
        H: WatchHandler + ?Sized,
    {
        self.watch(kind, Some(project), handler).await
    }

    async fn watch<H>(
        &self,
        kind: &KindMetadata,
        namespace: Option<&str>,
        handler: &mut H,
    ) -> Result<()>
    where
        H: WatchHandler + ?Sized,
    {
        let resource = kind.api_resource();
        let params = WatchParams::default();
        let mut refreshed = false;

        loop {
            let api = dynamic_api(self.client().await?, &resource, namespace);
            debug!(%kind, ?namespace, "opening watch");
            let stream = match api.watch(&params, "0").await {
                Ok(stream) => stream,
                Err(err) if is_status(&err, 401) && !refreshed => {
                    self.refresh_client().await?;
                    refreshed = true;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let mut stream = std::pin::pin!(stream);

            match self
                .consume(&mut stream, kind, handler, &mut refreshed)
                .await
            {
                Ok(()) => return Ok(()),
                Err(OpenShiftError::WatchStreamClosed) => {
                    trace!(%kind, "reopening watch");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Feed events to `handler`. Ends with `WatchStreamClosed` when the
    /// stream must be reopened.
    async fn consume<S, H>(
        &self,
        stream: &mut S,
        kind: &KindMetadata,
        handler: &mut H,
        refreshed: &mut bool,
    ) -> Result<()>
    where
        S: Stream<Item = kube::Result<WatchEvent<DynamicObject>>> + Unpin,
        H: WatchHandler + ?Sized,
    {
        while let Some(item) = stream.next().await {
            let (event_type, object) = match item {
                Ok(WatchEvent::Added(object)) => (EventType::Added, object),
                Ok(WatchEvent::Modified(object)) => (EventType::Modified, object),
                Ok(WatchEvent::Deleted(object)) => (EventType::Deleted, object),
                Ok(WatchEvent::Bookmark(_)) => continue,
                Ok(WatchEvent::Error(response)) if response.code == 410 => {
                    debug!(%kind, "resource version too old");
                    return Err(OpenShiftError::WatchStreamClosed);
                }
                Ok(WatchEvent::Error(response)) if response.code == 401 && !*refreshed => {
                    self.refresh_client().await?;
                    *refreshed = true;
                    return Err(OpenShiftError::WatchStreamClosed);
                }
                Ok(WatchEvent::Error(response)) => {
                    return Err(kube::Error::Api(response).into());
                }
                Err(err) if is_status(&err, 401) && !*refreshed => {
                    self.refresh_client().await?;
                    *refreshed = true;
                    return Err(OpenShiftError::WatchStreamClosed);
                }
                Err(err) if is_transient(&err) => {
                    debug!(%kind, %err, "watch connection lost");
                    return Err(OpenShiftError::WatchStreamClosed);
                }
                Err(err) => return Err(err.into()),
            };
            *refreshed = false;

            let event = ResourceEvent {
                event_type,
                object: serde_json::to_value(object)?,
            };
            trace!(%kind, event = %event.event_type, name = ?event.name(), "watch event");
            if handler.on_event(&event, kind)? {
                return Ok(());
            }
        }
        Err(OpenShiftError::WatchStreamClosed)
    }
}
