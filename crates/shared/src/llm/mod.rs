pub mod chat_completions;
pub mod gateway;

pub use chat_completions::{
    ChatCompletionsConfig, ChatCompletionsConfigError, ChatCompletionsGateway,
};
pub use gateway::{
    ChatCompletion, ChatCompletionRequest, LlmGateway, LlmGatewayError, LlmGatewayFuture,
    LlmTokenUsage,
};
