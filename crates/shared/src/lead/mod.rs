pub mod dispatcher;
pub mod extractor;
pub mod orchestrator;
pub mod record;
pub mod schema;

pub use dispatcher::{
    DispatchError, DispatchMode, DispatchQueue, LeadNotifier, NotifyFuture, WebhookConfig,
    WebhookDispatcher, build_webhook_url, redirect_from_body,
};
pub use extractor::{ExtractionMiss, ExtractionResult, MatchStrategy, extract};
pub use orchestrator::{ConversationOrchestrator, TurnOutcome};
pub use record::{CollectedRecord, RecordGap};
pub use schema::{DEFAULT_MARKER_KEY, LeadField, LeadProfile, LeadSchema};
