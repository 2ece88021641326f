//! Kubernetes events
//!
//! Events list and get through the same pipeline as every other kind. The
//! status column carries the event type (`Normal` or `Warning`).

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Event;
use kubegate_common::{ResourceKind, ResourceQuery};

use crate::kubernetes::client::ControlPlane;
use crate::kubernetes::context::RequestContext;
use crate::kubernetes::error::K8sResult;
use crate::kubernetes::resources::{self, KindObject, ResourceAccessor};
use crate::kubernetes::types::{
    EventInfo, InvolvedObject, Listing, ResourceDetail, ResourceDetails,
};

impl KindObject for Event {
    const KIND: ResourceKind = ResourceKind::Event;

    fn status(&self) -> String {
        self.type_.clone().unwrap_or_else(|| "Normal".to_string())
    }

    fn details(self) -> ResourceDetails {
        ResourceDetails::Event(event_to_info(self))
    }
}

fn event_to_info(event: Event) -> EventInfo {
    let involved = event.involved_object;

    EventInfo {
        event_type: event.type_.unwrap_or_else(|| "Normal".to_string()),
        reason: event.reason.unwrap_or_default(),
        message: event.message.unwrap_or_default(),
        involved_object: InvolvedObject {
            kind: involved.kind.unwrap_or_default(),
            name: involved.name.unwrap_or_default(),
            namespace: involved.namespace,
        },
        count: event.count.unwrap_or(1),
        first_timestamp: event.first_timestamp.map(|t| t.0),
        last_timestamp: event.last_timestamp.map(|t| t.0),
    }
}

pub struct EventAccessor;

#[async_trait]
impl ResourceAccessor for EventAccessor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Event
    }

    async fn list(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        query: &ResourceQuery,
    ) -> K8sResult<Listing> {
        resources::list_summaries::<Event>(client, ctx, query.namespaces()).await
    }

    async fn get(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<ResourceDetail> {
        resources::get_detail::<Event>(client, ctx, namespace, name).await
    }

    async fn delete(
        &self,
        client: &dyn ControlPlane,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> K8sResult<()> {
        resources::delete_object::<Event>(client, ctx, namespace, name).await
    }
}
