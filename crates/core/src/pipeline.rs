use crate::completion::{CompletionClient, FALLBACK_ANSWER};
use crate::context::{ContextSelector, NO_CONTEXT_PLACEHOLDER};
use crate::conversation::ConversationStore;
use crate::error::PipelineError;
use crate::models::{AssembledContext, ConversationRecord, UNKNOWN_USER};
use tracing::warn;

/// The question-answering pipeline: select context, generate the answer,
/// log the exchange. All collaborators are injected at construction, so
/// every seam can be replaced by a test double.
pub struct AnswerPipeline<S, C, L>
where
    S: ContextSelector,
    C: CompletionClient,
    L: ConversationStore,
{
    selector: S,
    completion: C,
    conversations: L,
}

impl<S, C, L> AnswerPipeline<S, C, L>
where
    S: ContextSelector,
    C: CompletionClient,
    L: ConversationStore,
{
    pub fn new(selector: S, completion: C, conversations: L) -> Self {
        Self {
            selector,
            completion,
            conversations,
        }
    }

    /// Answers one question, strictly sequentially: embed/retrieve (inside
    /// the selector) → complete → persist. Context-selection failures
    /// degrade to the placeholder context; persistence failures are logged
    /// and swallowed. The returned string is always a usable answer.
    pub async fn answer(&self, user: Option<&str>, question: &str) -> String {
        let user = user
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(UNKNOWN_USER);

        let question = question.trim();
        if question.is_empty() {
            return FALLBACK_ANSWER.to_string();
        }

        let context = match self.selector.select(question).await {
            Ok(context) => context,
            Err(error) => {
                warn!(%error, "context selection failed, answering without context");
                AssembledContext {
                    text: NO_CONTEXT_PLACEHOLDER.to_string(),
                    sources: Vec::new(),
                }
            }
        };

        let answer = self.completion.complete(question, &context.text).await;

        // Best-effort: a failed write never affects the returned answer.
        if let Err(error) = self.conversations.record(user, question, &answer).await {
            warn!(%error, user, "failed to record conversation");
        }

        answer
    }

    pub async fn history(&self) -> Result<Vec<ConversationRecord>, PipelineError> {
        self.conversations.list_all().await
    }
}
