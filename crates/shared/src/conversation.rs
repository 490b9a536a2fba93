use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::chat::{
    ChatError, ChatSessionManager, MAX_MESSAGE_CHARS, MAX_TURNS_PER_CHAT, SessionContext,
    format_chat_history,
};
use crate::llm::{LlmGateway, LlmGatewayRequest, render_medical_rag_prompt};
use crate::models::AnswerPayload;
use crate::retrieval::{Retriever, join_snippets};

/// Runs one retrieval-augmented turn against the caller's active chat.
#[derive(Clone)]
pub struct ConversationOrchestrator {
    manager: ChatSessionManager,
    retriever: Arc<dyn Retriever>,
    llm_gateway: Arc<dyn LlmGateway>,
}

impl ConversationOrchestrator {
    pub fn new(
        manager: ChatSessionManager,
        retriever: Arc<dyn Retriever>,
        llm_gateway: Arc<dyn LlmGateway>,
    ) -> Self {
        Self {
            manager,
            retriever,
            llm_gateway,
        }
    }

    pub fn manager(&self) -> &ChatSessionManager {
        &self.manager
    }

    pub async fn answer(
        &self,
        user_id: &str,
        session: &mut SessionContext,
        raw_input: &str,
    ) -> Result<AnswerPayload, ChatError> {
        let question = validate_question(raw_input)?;

        let chat = self
            .manager
            .get_active_chat(user_id, session, Local::now())
            .await?;
        if chat.is_at_quota() {
            return Err(ChatError::QuotaExceeded {
                max_turns: MAX_TURNS_PER_CHAT,
            });
        }

        let chat_history = format_chat_history(&chat.messages);
        debug!(
            user_id = %user_id,
            chat_id = %chat.id,
            history_messages = chat.messages.len(),
            "assembling answer context"
        );

        let answer = self.generate_answer(user_id, question, &chat_history).await?;

        let chat = self
            .manager
            .record_turn(user_id, &chat.id, question, &answer, Local::now())
            .await?;

        Ok(AnswerPayload {
            answer,
            message_count: chat.message_count,
            remaining_messages: chat.remaining_turns(),
        })
    }

    async fn generate_answer(
        &self,
        user_id: &str,
        question: &str,
        chat_history: &str,
    ) -> Result<String, ChatError> {
        let started_at = Instant::now();

        let snippets = self.retriever.retrieve(question).await.map_err(|err| {
            warn!(user_id = %user_id, error = %err, "context retrieval failed");
            ChatError::GenerationFailed(err.to_string())
        })?;
        let context = join_snippets(&snippets);

        let prompt = render_medical_rag_prompt(chat_history, &context, question);
        let request = LlmGatewayRequest::new(prompt).with_requester_id(user_id);
        let response = self.llm_gateway.generate(request).await.map_err(|err| {
            warn!(user_id = %user_id, error = %err, "answer generation failed");
            ChatError::GenerationFailed(err.to_string())
        })?;

        info!(
            user_id = %user_id,
            model = %response.model,
            snippets = snippets.len(),
            latency_ms = started_at.elapsed().as_millis() as u64,
            total_tokens = response.usage.as_ref().map(|usage| usage.total_tokens),
            "answer generated"
        );
        Ok(response.text)
    }
}

/// Trims the raw question and enforces the non-empty and length limits.
pub fn validate_question(raw_input: &str) -> Result<&str, ChatError> {
    let question = raw_input.trim();
    if question.is_empty() {
        return Err(ChatError::EmptyInput);
    }
    if question.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::TooLong {
            max_chars: MAX_MESSAGE_CHARS,
        });
    }
    Ok(question)
}
