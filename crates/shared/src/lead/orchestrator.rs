use std::sync::Arc;

use tracing::{Instrument, debug, debug_span, field, info};

use super::dispatcher::LeadNotifier;
use super::extractor::{ExtractionResult, extract};
use super::schema::LeadSchema;
use crate::attachments::AttachmentReference;
use crate::llm::{ChatCompletionRequest, LlmGateway, LlmGatewayError};
use crate::models::ChatMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub content: String,
    pub redirect_url: Option<String>,
    pub completed: bool,
}

/// Runs one conversational turn. Holds no per-session state; the caller
/// resends the full history each time.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    gateway: Arc<dyn LlmGateway>,
    notifier: Arc<dyn LeadNotifier>,
    schema: LeadSchema,
    preamble: String,
}

impl ConversationOrchestrator {
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        notifier: Arc<dyn LeadNotifier>,
        schema: LeadSchema,
        preamble: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            notifier,
            schema,
            preamble: preamble.into(),
        }
    }

    pub fn schema(&self) -> &LeadSchema {
        &self.schema
    }

    pub async fn respond(&self, history: &[ChatMessage]) -> Result<TurnOutcome, LlmGatewayError> {
        let span = debug_span!(
            "lead_turn",
            history_len = history.len(),
            attachment_url = field::Empty,
        );
        if let Some(attachment_url) = history
            .last()
            .and_then(|message| AttachmentReference::parse_marker(&message.content))
        {
            span.record("attachment_url", attachment_url);
        }

        self.run_turn(history).instrument(span).await
    }

    async fn run_turn(&self, history: &[ChatMessage]) -> Result<TurnOutcome, LlmGatewayError> {
        let request = ChatCompletionRequest::with_preamble(&self.preamble, history);
        let completion = self.gateway.complete(request).await?;
        debug!(
            model = %completion.model,
            provider_request_id = ?completion.provider_request_id,
            reply = %completion.content,
            "provider reply received"
        );

        match extract(&completion.content, &self.schema) {
            ExtractionResult::Complete {
                record,
                visible_text,
                strategy,
            } => {
                info!(
                    strategy = strategy.as_str(),
                    "structured lead record extracted from reply"
                );
                let redirect_url = self.notifier.notify(&record).await;
                Ok(TurnOutcome {
                    content: visible_text,
                    redirect_url,
                    completed: true,
                })
            }
            ExtractionResult::Incomplete { .. } => Ok(TurnOutcome {
                content: completion.content,
                redirect_url: None,
                completed: false,
            }),
        }
    }
}
