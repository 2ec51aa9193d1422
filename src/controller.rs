//! Send and upload flows.
//!
//! A send is split in two halves so the terminal loop can keep handling keys
//! while the answer is on its way: [`begin_send`] does everything up to the
//! placeholder, [`complete_send`] resolves it.

use crate::client::{AnswerService, AskResponse, UploadReceipt};
use crate::conversation::Role;
use crate::error::Result;
use crate::state::ChatState;
use std::fmt;
use std::path::Path;

/// A question that has been recorded and is waiting for its answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsk {
    pub ticket: u64,
    pub conversation_id: String,
    pub question: String,
    /// A conversation had to be created for this send
    pub created: bool,
    /// The conversation was named after this question
    pub renamed: bool,
}

/// How a pending answer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendResolution {
    Answered { conversation_id: String },
    Failed { conversation_id: String, error: String },
    /// The placeholder was gone, e.g. its conversation was deleted meanwhile
    Orphaned,
}

/// Bot message text for an answer
pub fn format_answer(answer: &AskResponse) -> String {
    format!("{}\n\nConfidence: {}", answer.answer, answer.confidence)
}

/// Record a user question and put up its placeholder.
///
/// Returns `None` without touching anything when the input is blank.
pub fn begin_send(state: &mut ChatState, input: &str) -> Result<Option<PendingAsk>> {
    let question = input.trim();
    if question.is_empty() {
        return Ok(None);
    }

    let (conversation_id, created) = match state.active_id() {
        Some(id) => (id.to_string(), false),
        None => (state.create_conversation()?, true),
    };

    let renamed = state.rename_if_first_message(&conversation_id, question)?;
    state.append_message(&conversation_id, Role::User, question)?;
    let ticket = state.begin_pending(&conversation_id);

    Ok(Some(PendingAsk {
        ticket,
        conversation_id,
        question: question.to_string(),
        created,
        renamed,
    }))
}

/// Replace a placeholder with the answer, or drop it on failure
pub fn complete_send(
    state: &mut ChatState,
    ticket: u64,
    result: Result<AskResponse>,
) -> Result<SendResolution> {
    let Some(pending) = state.take_pending(ticket) else {
        tracing::debug!(ticket, "Answer arrived for a placeholder that is gone");
        return Ok(SendResolution::Orphaned);
    };

    match result {
        Ok(answer) => {
            state.append_message(&pending.conversation_id, Role::Bot, format_answer(&answer))?;
            Ok(SendResolution::Answered {
                conversation_id: pending.conversation_id,
            })
        }
        Err(e) => {
            tracing::warn!(conversation = %pending.conversation_id, error = %e, "Question failed");
            Ok(SendResolution::Failed {
                conversation_id: pending.conversation_id,
                error: e.to_string(),
            })
        }
    }
}

/// Send one message and wait for its answer
pub async fn send_message(
    state: &mut ChatState,
    service: &dyn AnswerService,
    input: &str,
    k: u32,
) -> Result<Option<SendResolution>> {
    let Some(pending) = begin_send(state, input)? else {
        return Ok(None);
    };
    let result = service.ask(&pending.question, k).await;
    complete_send(state, pending.ticket, result).map(Some)
}

/// Outcome of a document upload, displayed in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Indexed { file: String },
    Rejected { reason: String },
    Failed { error: String },
}

impl UploadStatus {
    pub fn from_result(result: Result<UploadReceipt>) -> Self {
        match result {
            Ok(receipt) => UploadStatus::Indexed { file: receipt.file },
            Err(crate::error::Error::UploadRejected(reason)) => UploadStatus::Rejected { reason },
            Err(e) => UploadStatus::Failed {
                error: e.to_string(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadStatus::Indexed { .. })
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Indexed { file } => write!(f, "📄 {} ✅ indexed", file),
            UploadStatus::Rejected { reason } => write!(f, "📄 ❌ rejected: {}", reason),
            UploadStatus::Failed { error } => write!(f, "📄 ❌ upload failed: {}", error),
        }
    }
}

/// Submit one document for indexing
pub async fn upload_document(service: &dyn AnswerService, path: &Path) -> UploadStatus {
    let status = UploadStatus::from_result(service.upload(path).await);
    tracing::info!(path = %path.display(), status = %status, "Upload finished");
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use crate::error::Error;
    use crate::storage::{ChatStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeService {
        questions: Mutex<Vec<(String, u32)>>,
        answer: Option<AskResponse>,
    }

    impl FakeService {
        fn answering(answer: &str, confidence: f64) -> Self {
            Self {
                questions: Mutex::new(Vec::new()),
                answer: Some(AskResponse {
                    answer: answer.to_string(),
                    confidence,
                    sources: Vec::new(),
                }),
            }
        }

        fn failing() -> Self {
            Self {
                questions: Mutex::new(Vec::new()),
                answer: None,
            }
        }

        fn asked(&self) -> Vec<(String, u32)> {
            self.questions.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnswerService for FakeService {
        async fn ask(&self, question: &str, k: u32) -> Result<AskResponse> {
            self.questions.lock().unwrap().push((question.to_string(), k));
            self.answer.clone().ok_or_else(|| Error::Status {
                endpoint: "/ask".to_string(),
                status: 500,
                body: "boom".to_string(),
            })
        }

        async fn upload(&self, path: &Path) -> Result<UploadReceipt> {
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("md") => Ok(UploadReceipt {
                    file: path.file_name().unwrap().to_string_lossy().into_owned(),
                }),
                _ => Err(Error::UploadRejected("Unsupported file type".to_string())),
            }
        }
    }

    fn state() -> (ChatState, MemoryStore) {
        let store = MemoryStore::new();
        (ChatState::open(Box::new(store.clone())), store)
    }

    #[test]
    fn blank_input_does_nothing() {
        let (mut state, store) = state();
        assert_eq!(begin_send(&mut state, "   \n\t").unwrap(), None);
        assert!(state.chats().is_empty());
        assert_eq!(store.writes(), 0);
        assert_eq!(state.pending_count(), 0);
    }

    #[test]
    fn first_send_creates_and_names_conversation() {
        let (mut state, store) = state();
        let pending = begin_send(&mut state, "hi").unwrap().unwrap();

        assert!(pending.created);
        assert!(pending.renamed);
        assert_eq!(state.chats().len(), 1);

        let saved = store.load();
        let chat = saved.get(&pending.conversation_id).unwrap();
        assert_eq!(chat.name, "hi");
        assert_eq!(chat.messages, vec![Message::user("hi")]);
        assert!(state.is_awaiting(&pending.conversation_id));
    }

    #[test]
    fn second_send_keeps_name() {
        let (mut state, _store) = state();
        let first = begin_send(&mut state, "What is the refund policy for annual plans?")
            .unwrap()
            .unwrap();
        let second = begin_send(&mut state, "And for monthly plans?").unwrap().unwrap();

        assert!(!second.created);
        assert!(!second.renamed);
        assert_eq!(first.conversation_id, second.conversation_id);
        let chat = state.chats().get(&first.conversation_id).unwrap();
        assert_eq!(chat.name, "What is the refund policy");
        assert_eq!(chat.messages.len(), 2);
    }

    #[test]
    fn answer_replaces_placeholder() {
        let (mut state, store) = state();
        let pending = begin_send(&mut state, "hi").unwrap().unwrap();
        let answer = AskResponse {
            answer: "Hello! How can I assist you?".to_string(),
            confidence: 0.91,
            sources: vec!["handbook.md".to_string()],
        };

        let resolution = complete_send(&mut state, pending.ticket, Ok(answer)).unwrap();

        assert_eq!(
            resolution,
            SendResolution::Answered {
                conversation_id: pending.conversation_id.clone()
            }
        );
        assert!(!state.is_awaiting(&pending.conversation_id));
        let saved = store.load();
        let messages = &saved.get(&pending.conversation_id).unwrap().messages;
        assert_eq!(
            messages,
            &vec![
                Message::user("hi"),
                Message::bot("Hello! How can I assist you?\n\nConfidence: 0.91"),
            ]
        );
    }

    #[test]
    fn failure_removes_placeholder_without_persisting() {
        let (mut state, store) = state();
        let pending = begin_send(&mut state, "hi").unwrap().unwrap();
        let writes = store.writes();

        let resolution = complete_send(
            &mut state,
            pending.ticket,
            Err(Error::Validation("offline".to_string())),
        )
        .unwrap();

        assert!(matches!(resolution, SendResolution::Failed { .. }));
        assert!(!state.is_awaiting(&pending.conversation_id));
        assert_eq!(store.writes(), writes);
        assert_eq!(state.chats().get(&pending.conversation_id).unwrap().messages.len(), 1);
    }

    #[test]
    fn answer_for_deleted_conversation_is_dropped() {
        let (mut state, _store) = state();
        let pending = begin_send(&mut state, "hi").unwrap().unwrap();
        state.delete(&pending.conversation_id).unwrap();

        let answer = AskResponse {
            answer: "late".to_string(),
            confidence: 0.0,
            sources: Vec::new(),
        };
        assert_eq!(
            complete_send(&mut state, pending.ticket, Ok(answer)).unwrap(),
            SendResolution::Orphaned
        );
        assert!(state.chats().is_empty());
    }

    #[test]
    fn confidence_is_printed_plainly() {
        let answer = AskResponse {
            answer: "Not specified in policy.".to_string(),
            confidence: 0.0,
            sources: Vec::new(),
        };
        assert_eq!(format_answer(&answer), "Not specified in policy.\n\nConfidence: 0");
    }

    #[tokio::test]
    async fn send_message_asks_with_top_k() {
        let (mut state, _store) = state();
        let service = FakeService::answering("Yes", 0.5);

        let resolution = send_message(&mut state, &service, "  Is Friday off?  ", 4)
            .await
            .unwrap();

        assert!(matches!(resolution, Some(SendResolution::Answered { .. })));
        assert_eq!(service.asked(), vec![("Is Friday off?".to_string(), 4)]);
        let chat = state.active_conversation().unwrap();
        assert_eq!(chat.messages[1], Message::bot("Yes\n\nConfidence: 0.5"));
    }

    #[tokio::test]
    async fn blank_send_makes_no_request() {
        let (mut state, _store) = state();
        let service = FakeService::failing();

        assert_eq!(send_message(&mut state, &service, " ", 4).await.unwrap(), None);
        assert!(service.asked().is_empty());
    }

    #[tokio::test]
    async fn upload_statuses() {
        let service = FakeService::failing();

        let indexed = upload_document(&service, Path::new("/tmp/leave.md")).await;
        assert_eq!(indexed.to_string(), "📄 leave.md ✅ indexed");
        assert!(indexed.is_success());

        let rejected = upload_document(&service, Path::new("/tmp/leave.exe")).await;
        assert_eq!(
            rejected,
            UploadStatus::Rejected {
                reason: "Unsupported file type".to_string()
            }
        );
    }
}
