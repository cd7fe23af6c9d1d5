use async_trait::async_trait;

use crate::BoxError;

/// Message-bus publishing seam. The bus delivers at-least-once and keeps
/// ordering only among messages sharing a key, so callers pick the key that
/// must serialize (order id for settlement traffic).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), BoxError>;
}
