use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use rolegate_application::{AuditEvent, AuditRepository};
use rolegate_core::AppResult;

use super::InMemoryState;

/// In-memory append-only audit repository.
#[derive(Clone)]
pub struct InMemoryAuditRepository {
    pub(super) state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryAuditRepository {
    /// Returns a snapshot of every recorded event in append order.
    pub async fn recorded_events(&self) -> Vec<AuditEvent> {
        self.state.read().await.audit_log.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.state.write().await.audit_log.push(event);
        Ok(())
    }
}
