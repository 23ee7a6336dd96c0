//! NATS replies for answered prediction requests

use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes reply bodies to each request's reply subject
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
}

impl ReplyProducer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Publish a reply body
    pub async fn reply(&self, subject: Subject, body: Vec<u8>) -> Result<()> {
        let len = body.len();
        self.client.publish(subject.clone(), body.into()).await?;
        debug!(reply_subject = %subject, bytes = len, "Published reply");
        Ok(())
    }
}
