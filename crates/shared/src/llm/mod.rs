pub mod gateway;
pub mod groq;
pub mod prompts;

pub use gateway::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    LlmTokenUsage,
};
pub use groq::{GroqGateway, GroqGatewayConfig};
pub use prompts::{
    INSUFFICIENT_CONTEXT_NOTICE, PROFESSIONAL_ADVICE_REMINDER, render_medical_rag_prompt,
};
