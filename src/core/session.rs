//! Chat session state for one repository conversation.
//!
//! The session owns the ordered entry timeline and folds three kinds of
//! asynchronous updates into it: persisted history, on-demand repository
//! snapshots, and live question/action exchanges. Every exchange follows
//! the same shape: append the user entry, show a transient placeholder,
//! await the network, remove the placeholder, append exactly one
//! terminal entry. Placeholder removal happens on every path, including
//! failures.
//!
//! Exchanges issued concurrently land in completion order; no reordering
//! is attempted.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::api::snapshot::RepoSnapshot;
use crate::api::{ChatAnswer, ChatHistoryData, ChatHistoryMessage, Envelope, RepoFacet};
use crate::core::client::{ApiClient, ApiError};
use crate::core::message::{ConversationEntry, EntryBody, EntrySender};

/// Narrow seam over the API client so the reducer can be exercised with
/// canned responses.
#[async_trait]
pub trait RepoApi: Send + Sync {
    async fn chat_history(&self, repo_id: &str) -> Result<Envelope<ChatHistoryData>, ApiError>;
    async fn repo_info(
        &self,
        repo_id: &str,
        facet: Option<RepoFacet>,
    ) -> Result<Envelope<Value>, ApiError>;
    async fn ask(&self, repo_id: &str, question: &str) -> Result<Envelope<ChatAnswer>, ApiError>;
}

#[async_trait]
impl RepoApi for ApiClient {
    async fn chat_history(&self, repo_id: &str) -> Result<Envelope<ChatHistoryData>, ApiError> {
        ApiClient::chat_history(self, repo_id).await
    }

    async fn repo_info(
        &self,
        repo_id: &str,
        facet: Option<RepoFacet>,
    ) -> Result<Envelope<Value>, ApiError> {
        ApiClient::repo_info(self, repo_id, facet).await
    }

    async fn ask(&self, repo_id: &str, question: &str) -> Result<Envelope<ChatAnswer>, ApiError> {
        ApiClient::ask(self, repo_id, question).await
    }
}

#[derive(Default)]
struct SessionState {
    entries: Vec<ConversationEntry>,
    /// Repository ids whose snapshot summary has been appended, so
    /// refetches do not double-append.
    snapshot_seen: HashSet<String>,
}

pub struct ChatSession {
    api: Arc<dyn RepoApi>,
    repo_id: String,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(api: Arc<dyn RepoApi>, repo_id: impl Into<String>) -> Self {
        ChatSession {
            api,
            repo_id: repo_id.into(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Snapshot of the timeline for rendering.
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    fn push(&self, entry: ConversationEntry) {
        self.state.lock().unwrap().entries.push(entry);
    }

    fn remove_transient(&self) {
        self.state
            .lock()
            .unwrap()
            .entries
            .retain(|entry| !entry.transient);
    }

    /// Load persisted messages. A non-empty history replaces the whole
    /// timeline; an empty one falls back to the repository snapshot so
    /// the user sees initial context.
    pub async fn load_history(&self) -> Result<(), ApiError> {
        let envelope = self.api.chat_history(&self.repo_id).await?;
        let messages = envelope.data.map(|data| data.messages).unwrap_or_default();
        if messages.is_empty() {
            debug!("no chat history; falling back to repository snapshot");
            return self.load_repository_snapshot().await;
        }

        let entries: Vec<ConversationEntry> =
            messages.iter().map(classify_history_message).collect();
        self.state.lock().unwrap().entries = entries;
        Ok(())
    }

    /// Fetch repository info and append one assistant summary entry,
    /// guarded by the repository id so refetches are idempotent.
    pub async fn load_repository_snapshot(&self) -> Result<(), ApiError> {
        let envelope = self.api.repo_info(&self.repo_id, None).await?;
        let data = envelope.data.unwrap_or(Value::Null);
        let info = match RepoSnapshot::classify(&data) {
            Some(RepoSnapshot::Basic(info)) => Some(info),
            Some(RepoSnapshot::Full { basic_info, .. }) => Some(basic_info),
            _ => None,
        };

        if let Some(info) = info {
            let mut state = self.state.lock().unwrap();
            if state.snapshot_seen.insert(info.id.clone()) {
                state
                    .entries
                    .push(ConversationEntry::assistant(EntryBody::BasicInfo(info)));
            }
        }
        Ok(())
    }

    /// Ask the AI a question. Only an authentication failure propagates;
    /// everything else terminates in a chat entry.
    pub async fn send_question(&self, question: &str) -> Result<(), ApiError> {
        self.push(ConversationEntry::user(question));
        self.push(ConversationEntry::pending("AI is generating response"));

        let result = self.api.ask(&self.repo_id, question).await;
        self.remove_transient();

        let terminal = match result {
            Ok(envelope) => answer_body(envelope),
            Err(ApiError::Unauthenticated) => return Err(ApiError::Unauthenticated),
            Err(err) => {
                debug!("chat request failed: {err}");
                EntryBody::Error(
                    "Something went wrong while contacting the AI service.".to_string(),
                )
            }
        };
        self.push(ConversationEntry::assistant(terminal));
        Ok(())
    }

    /// Run one of the analysis actions. A processing or null facet is a
    /// distinct informational terminal state, not an error.
    pub async fn run_action(&self, facet: RepoFacet) -> Result<(), ApiError> {
        self.push(ConversationEntry::user(facet.action_label()));
        self.push(ConversationEntry::pending(facet.pending_label()));

        let result = self.api.repo_info(&self.repo_id, Some(facet)).await;
        self.remove_transient();

        let terminal = match result {
            Ok(envelope) => facet_body(envelope),
            Err(ApiError::Unauthenticated) => return Err(ApiError::Unauthenticated),
            Err(err) => {
                debug!("repo info request failed: {err}");
                EntryBody::Error("Failed to fetch repository data.".to_string())
            }
        };
        self.push(ConversationEntry::assistant(terminal));
        Ok(())
    }
}

fn answer_body(envelope: Envelope<ChatAnswer>) -> EntryBody {
    let Envelope {
        success,
        message,
        data,
        ..
    } = envelope;

    let answer = data.filter(|_| success).and_then(|data| {
        data.answer
            .filter(|answer| !answer.is_empty())
            .map(|answer| (answer, data.sources))
    });

    match answer {
        Some((answer, sources)) => EntryBody::Answer { answer, sources },
        None => EntryBody::Notice(if message.trim().is_empty() {
            "AI could not generate a response right now. Please try again later.".to_string()
        } else {
            message
        }),
    }
}

fn facet_body(envelope: Envelope<Value>) -> EntryBody {
    let Envelope {
        success,
        message,
        data,
        ..
    } = envelope;
    let data = data.unwrap_or(Value::Null);

    match RepoSnapshot::classify(&data) {
        Some(RepoSnapshot::Basic(info)) => EntryBody::BasicInfo(info),
        Some(RepoSnapshot::FileStructure(Some(tree))) => EntryBody::FileTree(tree),
        Some(RepoSnapshot::FileStructure(None)) => EntryBody::Notice(
            "File structure extraction is still running. Please try again in a moment."
                .to_string(),
        ),
        Some(RepoSnapshot::AiAnalysis {
            analysis: Some(analysis),
            status,
        }) => EntryBody::Analysis { analysis, status },
        Some(RepoSnapshot::AiAnalysis { analysis: None, .. }) => EntryBody::Notice(
            "AI analysis is still running. Please try again in a moment.".to_string(),
        ),
        Some(RepoSnapshot::Full { basic_info, .. }) => EntryBody::FullOverview(basic_info),
        None => {
            if !success && !message.trim().is_empty() {
                EntryBody::Notice(message)
            } else {
                EntryBody::Text("Request processed.".to_string())
            }
        }
    }
}

/// Persisted assistant messages may hold a JSON snapshot instead of
/// prose; those become structured entries again on reload.
fn classify_history_message(message: &ChatHistoryMessage) -> ConversationEntry {
    let sender = EntrySender::from_role(&message.role);
    if sender == EntrySender::Assistant {
        if let Some(parsed) = parse_json_safe(&message.content) {
            if let Some(body) = RepoSnapshot::classify(&parsed).and_then(snapshot_entry_body) {
                return ConversationEntry::assistant(body);
            }
        }
    }
    ConversationEntry {
        sender,
        body: EntryBody::Text(message.content.clone()),
        transient: false,
    }
}

fn snapshot_entry_body(snapshot: RepoSnapshot) -> Option<EntryBody> {
    match snapshot {
        RepoSnapshot::Basic(info) => Some(EntryBody::BasicInfo(info)),
        RepoSnapshot::FileStructure(Some(tree)) => Some(EntryBody::FileTree(tree)),
        RepoSnapshot::AiAnalysis {
            analysis: Some(analysis),
            status,
        } => Some(EntryBody::Analysis { analysis, status }),
        RepoSnapshot::Full { basic_info, .. } => Some(EntryBody::FullOverview(basic_info)),
        _ => None,
    }
}

fn parse_json_safe(content: &str) -> Option<Value> {
    let trimmed = content.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}
