use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// External workflow system told about every new ticket.
#[async_trait]
pub trait WorkflowNotifier: Send + Sync {
    async fn ticket_created(&self, ticket_id: i64) -> anyhow::Result<()>;
}

/// Posts to `{base_url}/tickets/{id}/start`.
pub struct HttpWorkflowNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpWorkflowNotifier {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl WorkflowNotifier for HttpWorkflowNotifier {
    async fn ticket_created(&self, ticket_id: i64) -> anyhow::Result<()> {
        let url = format!("{}/tickets/{}/start", self.base_url.trim_end_matches('/'), ticket_id);
        self.client.post(&url).send().await?.error_for_status()?;
        debug!(ticket_id, "workflow notified");
        Ok(())
    }
}

pub struct NoopWorkflowNotifier;

#[async_trait]
impl WorkflowNotifier for NoopWorkflowNotifier {
    async fn ticket_created(&self, _ticket_id: i64) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fire-and-forget: the caller never waits on, or fails because of, the workflow system.
pub fn notify_in_background(notifier: Arc<dyn WorkflowNotifier>, ticket_id: i64) {
    tokio::spawn(async move {
        if let Err(e) = notifier.ticket_created(ticket_id).await {
            warn!(ticket_id, "Workflow notification failed: {:#}", e);
        }
    });
}
