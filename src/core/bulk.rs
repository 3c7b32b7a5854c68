use crate::core::dispatcher::MessageDispatcher;
use crate::core::preview::render_preview;
use crate::core::resolver::RecipientResolver;
use crate::domain::model::{Phone, SendPayload, SendRequest, TenantId};
use crate::domain::ports::{CredentialProvider, MessagingProvider, RecipientStore};
use crate::utils::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// What happened to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent {
        status: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    Failed {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
    /// Cancelled before the dispatch started
    Skipped,
}

impl DispatchOutcome {
    fn from_error(error: &RelayError) -> Self {
        DispatchOutcome::Failed {
            error: error.to_string(),
            status: error.provider_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResult {
    pub phone: Phone,
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedRecipient {
    pub phone: Phone,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkSummary {
    /// Size of the resolved recipient set
    pub requested: usize,
    pub succeeded: Vec<Phone>,
    pub failed: Vec<FailedRecipient>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Phone>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BulkSummary {
    pub fn from_results(results: Vec<SendResult>, started_at: DateTime<Utc>) -> Self {
        let requested = results.len();
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut skipped = Vec::new();

        for result in results {
            match result.outcome {
                DispatchOutcome::Sent { .. } => succeeded.push(result.phone),
                DispatchOutcome::Failed { error, status } => failed.push(FailedRecipient {
                    phone: result.phone,
                    error,
                    status,
                }),
                DispatchOutcome::Skipped => skipped.push(result.phone),
            }
        }

        Self {
            requested,
            succeeded,
            failed,
            skipped,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkPreview {
    pub recipients: usize,
    pub sample_recipients: Vec<Phone>,
    pub rendered_preview: String,
}

/// Resolves recipients, fans one message out to each and aggregates the outcomes.
///
/// Dispatch runs on a bounded pool of tasks. Every recipient gets its own join
/// handle, awaited in recipient order, so results land in distinct slots.
/// A failing recipient is recorded and the rest carry on; only precondition
/// failures (missing credentials, invalid or empty recipients) are returned as
/// errors, and those happen before the first outbound call.
pub struct BulkCoordinator<S, P, C>
where
    S: RecipientStore + ?Sized,
    P: MessagingProvider + ?Sized,
    C: CredentialProvider + ?Sized,
{
    resolver: RecipientResolver<S>,
    dispatcher: Arc<MessageDispatcher<P, C>>,
    concurrency: usize,
    sample_size: usize,
}

impl<S, P, C> BulkCoordinator<S, P, C>
where
    S: RecipientStore + ?Sized,
    P: MessagingProvider + ?Sized + 'static,
    C: CredentialProvider + ?Sized + 'static,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<MessageDispatcher<P, C>>) -> Self {
        Self {
            resolver: RecipientResolver::new(store),
            dispatcher,
            concurrency: DEFAULT_CONCURRENCY,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    pub async fn bulk_send(
        &self,
        tenant: &TenantId,
        request: &SendRequest,
        cancel: &CancellationToken,
    ) -> Result<BulkSummary> {
        let started_at = Utc::now();

        let credentials = Arc::new(self.dispatcher.credentials_for(tenant).await?);
        let recipients = self.resolver.resolve_target(&request.target).await?;

        tracing::info!(
            "Bulk {} send to {} recipients (tenant {}, concurrency {})",
            request.payload.mode(),
            recipients.len(),
            tenant,
            self.concurrency
        );

        // Dropping this future cancels the child token, so queued recipients never start.
        let cancel = cancel.child_token();
        let _cancel_on_drop = cancel.clone().drop_guard();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let payload: Arc<SendPayload> = Arc::new(request.payload.clone());
        let mut handles = Vec::with_capacity(recipients.len());

        for phone in recipients {
            let dispatcher = Arc::clone(&self.dispatcher);
            let semaphore = Arc::clone(&semaphore);
            let credentials = Arc::clone(&credentials);
            let payload = Arc::clone(&payload);
            let cancel = cancel.clone();
            let target = phone.clone();

            let handle = tokio::spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return DispatchOutcome::Skipped,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return DispatchOutcome::Skipped,
                    },
                };
                if cancel.is_cancelled() {
                    return DispatchOutcome::Skipped;
                }

                match dispatcher.dispatch_with(&credentials, &target, &payload).await {
                    Ok(response) => DispatchOutcome::Sent {
                        status: response.status,
                        message_id: response.message_id().map(str::to_string),
                    },
                    Err(e) => {
                        tracing::warn!("Dispatch to {} failed: {}", target, e);
                        DispatchOutcome::from_error(&e)
                    }
                }
            });

            handles.push((phone, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (phone, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => DispatchOutcome::Failed {
                    error: format!("dispatch task aborted: {}", e),
                    status: None,
                },
            };
            results.push(SendResult { phone, outcome });
        }

        let summary = BulkSummary::from_results(results, started_at);
        tracing::info!(
            "Bulk send finished: {} requested, {} sent, {} failed, {} skipped",
            summary.requested,
            summary.succeeded.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }

    /// Resolves recipients and renders what would be sent, without sending.
    pub async fn preview(&self, tenant: &TenantId, request: &SendRequest) -> Result<BulkPreview> {
        let recipients = self.resolver.resolve_target(&request.target).await?;

        let templates = match &request.payload {
            SendPayload::Template { .. } => match self.dispatcher.list_templates(tenant).await {
                Ok(templates) => templates,
                Err(e) => {
                    tracing::warn!("Could not fetch templates for preview: {}", e);
                    Vec::new()
                }
            },
            _ => Vec::new(),
        };

        Ok(BulkPreview {
            recipients: recipients.len(),
            rendered_preview: render_preview(&request.payload, &templates),
            sample_recipients: recipients.into_iter().take(self.sample_size).collect(),
        })
    }
}
