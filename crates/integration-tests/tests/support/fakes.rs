use std::collections::VecDeque;
use std::sync::Mutex;

use shared::llm::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
};
use shared::retrieval::{RetrievalFuture, Retriever};

pub const RETRIEVED_PASSAGE: &str = "Migraine is a recurrent primary headache disorder.";

/// Returns one fixed passage for every query and records what was asked.
#[derive(Default)]
pub struct FakeRetriever {
    queries: Mutex<Vec<String>>,
}

impl FakeRetriever {
    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .expect("query log lock should not be poisoned")
            .clone()
    }
}

impl Retriever for FakeRetriever {
    fn retrieve<'a>(&'a self, query: &'a str) -> RetrievalFuture<'a> {
        Box::pin(async move {
            self.queries
                .lock()
                .expect("query log lock should not be poisoned")
                .push(query.to_string());
            Ok(vec![RETRIEVED_PASSAGE.to_string()])
        })
    }
}

type GenerateHook = Box<dyn FnOnce() + Send>;

/// Answers `answer N` for the Nth prompt unless a failure has been queued.
#[derive(Default)]
pub struct ScriptedGateway {
    prompts: Mutex<Vec<String>>,
    queued_failures: Mutex<VecDeque<LlmGatewayError>>,
    before_next_answer: Mutex<Option<GenerateHook>>,
}

impl ScriptedGateway {
    /// Runs `hook` once, while the next prompt is being answered.
    pub fn before_next_answer(&self, hook: impl FnOnce() + Send + 'static) {
        *self
            .before_next_answer
            .lock()
            .expect("hook lock should not be poisoned") = Some(Box::new(hook));
    }

    pub fn fail_next(&self, err: LlmGatewayError) {
        self.queued_failures
            .lock()
            .expect("failure queue lock should not be poisoned")
            .push_back(err);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("prompt log lock should not be poisoned")
            .clone()
    }
}

impl LlmGateway for ScriptedGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            let mut prompts = self
                .prompts
                .lock()
                .expect("prompt log lock should not be poisoned");
            prompts.push(request.prompt);

            let hook = self
                .before_next_answer
                .lock()
                .expect("hook lock should not be poisoned")
                .take();
            if let Some(hook) = hook {
                hook();
            }

            if let Some(err) = self
                .queued_failures
                .lock()
                .expect("failure queue lock should not be poisoned")
                .pop_front()
            {
                return Err(err);
            }

            Ok(LlmGatewayResponse {
                model: "scripted-model".to_string(),
                provider_request_id: None,
                text: format!("answer {}", prompts.len()),
                usage: None,
            })
        })
    }
}
