use crate::client::AskResponse;
use crate::controller::UploadStatus;
use crate::error::Result;

/// Results of background work, delivered back to the terminal loop
#[derive(Debug)]
pub enum AppEvent {
    /// An answer (or its failure) for a placeholder
    AnswerReady {
        ticket: u64,
        result: Result<AskResponse>,
    },

    /// A document upload finished
    UploadFinished { status: UploadStatus },
}

/// Which pane receives key presses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Composer,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Sidebar => Focus::Composer,
            Focus::Composer => Focus::Sidebar,
        }
    }
}
