//! # Amazon SQS Queue
//!
//! The client is built once at startup from explicit settings and handed to
//! the worker; nothing here is global.
//!
//! Credentials come from the standard AWS provider chain (environment,
//! profile, instance role). `endpoint_url` points the client at a local
//! emulator such as ElasticMQ or LocalStack.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use std::time::Duration;
use tracing::debug;

use super::{MessageQueue, QueueHandle, ReceiveOptions, ReceivedMessage};
use crate::error::{PaperTrailError, Result};

/// Where the queue lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub queue_url: String,
    pub region: String,
    pub endpoint_url: Option<String>,
}

/// SQS-backed [`MessageQueue`].
#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Load AWS configuration for the configured region and build a client.
    pub async fn connect(settings: &QueueSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self::new(Client::new(&sdk_config), settings.queue_url.clone())
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn receive(&self, options: &ReceiveOptions) -> Result<Option<ReceivedMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(ReceiveOptions::MAX_MESSAGES)
            .wait_time_seconds(whole_seconds(options.wait))
            .visibility_timeout(whole_seconds(options.visibility_timeout))
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| {
                PaperTrailError::Queue(format!(
                    "receive_message failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        let Some(message) = output.messages().first() else {
            debug!("long poll returned no messages");
            return Ok(None);
        };

        let id = message.message_id().unwrap_or("<unknown>").to_string();
        let handle = message.receipt_handle().ok_or_else(|| {
            PaperTrailError::Queue(format!("message {} arrived without a receipt handle", id))
        })?;
        let receive_count = message
            .attributes()
            .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|count| count.parse().ok())
            .unwrap_or(1);

        Ok(Some(ReceivedMessage {
            id,
            body: message.body().unwrap_or_default().to_string(),
            handle: QueueHandle::new(handle),
            receive_count,
        }))
    }

    async fn delete(&self, handle: &QueueHandle) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(handle.as_str())
            .send()
            .await
            .map_err(|e| {
                PaperTrailError::Queue(format!(
                    "delete_message failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.queue_url.clone()
    }
}

/// SQS takes whole seconds as i32.
fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}
