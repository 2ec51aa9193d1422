use crate::conversation::{
    auto_name, new_conversation_id, Conversation, ConversationSet, Message, Role,
};
use crate::error::{Error, Result};
use crate::storage::ChatStore;

/// A placeholder answer that is still being awaited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnswer {
    pub ticket: u64,
    pub conversation_id: String,
}

/// Application state: the saved conversations, the active pointer and the
/// placeholders of in-flight answers.
///
/// Every mutation of the conversation set is flushed to the store before the
/// call returns. The active pointer and placeholders are session-only.
pub struct ChatState {
    chats: ConversationSet,
    active: Option<String>,
    store: Box<dyn ChatStore>,
    pending: Vec<PendingAnswer>,
    next_ticket: u64,
}

impl ChatState {
    /// Hydrate from the store
    pub fn open(store: Box<dyn ChatStore>) -> Self {
        let chats = store.load();
        tracing::info!(chats = chats.len(), "Loaded conversations");

        Self {
            chats,
            active: None,
            store,
            pending: Vec::new(),
            next_ticket: 0,
        }
    }

    pub fn chats(&self) -> &ConversationSet {
        &self.chats
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_deref().and_then(|id| self.chats.get(id))
    }

    /// Create an empty conversation and make it active
    pub fn create_conversation(&mut self) -> Result<String> {
        let id = new_conversation_id();
        self.chats.insert(id.clone(), Conversation::default());
        self.active = Some(id.clone());
        self.save()?;

        tracing::info!(conversation = %id, "Created conversation");
        Ok(id)
    }

    /// Point the message view at another conversation. Not persisted.
    pub fn activate(&mut self, id: &str) -> Result<()> {
        if !self.chats.contains(id) {
            return Err(Error::UnknownConversation(id.to_string()));
        }
        self.active = Some(id.to_string());
        Ok(())
    }

    pub fn append_message(&mut self, id: &str, role: Role, text: impl Into<String>) -> Result<()> {
        let chat = self
            .chats
            .get_mut(id)
            .ok_or_else(|| Error::UnknownConversation(id.to_string()))?;
        chat.messages.push(Message {
            role,
            text: text.into(),
        });
        self.save()
    }

    /// Name an empty conversation after `text`. Returns whether the name changed.
    ///
    /// The new name reaches the store with the next flush.
    pub fn rename_if_first_message(&mut self, id: &str, text: &str) -> Result<bool> {
        let chat = self
            .chats
            .get_mut(id)
            .ok_or_else(|| Error::UnknownConversation(id.to_string()))?;
        if !chat.messages.is_empty() {
            return Ok(false);
        }
        chat.name = auto_name(text);
        Ok(true)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("conversation name cannot be empty".to_string()));
        }
        let chat = self
            .chats
            .get_mut(id)
            .ok_or_else(|| Error::UnknownConversation(id.to_string()))?;
        chat.name = name.to_string();
        self.save()
    }

    /// Remove a conversation along with its placeholders
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if self.chats.remove(id).is_none() {
            return Err(Error::UnknownConversation(id.to_string()));
        }
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        self.pending.retain(|pending| pending.conversation_id != id);
        self.save()?;

        tracing::info!(conversation = %id, "Deleted conversation");
        Ok(())
    }

    /// Show a placeholder answer in `id` until the ticket is taken back
    pub fn begin_pending(&mut self, id: &str) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.pending.push(PendingAnswer {
            ticket,
            conversation_id: id.to_string(),
        });
        ticket
    }

    /// Remove a placeholder. `None` if it is already gone.
    pub fn take_pending(&mut self, ticket: u64) -> Option<PendingAnswer> {
        let index = self.pending.iter().position(|p| p.ticket == ticket)?;
        Some(self.pending.remove(index))
    }

    pub fn is_awaiting(&self, id: &str) -> bool {
        self.pending.iter().any(|p| p.conversation_id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Flush the whole conversation set
    pub fn save(&mut self) -> Result<()> {
        self.store.store(&self.chats).inspect_err(|e| {
            tracing::error!(error = %e, "Failed to save conversations");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::DEFAULT_CHAT_NAME;
    use crate::storage::MemoryStore;

    fn state() -> (ChatState, MemoryStore) {
        let store = MemoryStore::new();
        (ChatState::open(Box::new(store.clone())), store)
    }

    #[test]
    fn create_makes_active_and_persists() {
        let (mut state, store) = state();
        let id = state.create_conversation().unwrap();

        assert_eq!(state.active_id(), Some(id.as_str()));
        assert_eq!(state.active_conversation().unwrap().name, DEFAULT_CHAT_NAME);
        assert_eq!(store.writes(), 1);
        assert!(store.load().contains(&id));
    }

    #[test]
    fn activate_does_not_persist() {
        let (mut state, store) = state();
        let first = state.create_conversation().unwrap();
        let _second = state.create_conversation().unwrap();
        let writes = store.writes();

        state.activate(&first).unwrap();

        assert_eq!(state.active_id(), Some(first.as_str()));
        assert_eq!(store.writes(), writes);
        assert!(matches!(
            state.activate("chat_missing"),
            Err(Error::UnknownConversation(_))
        ));
    }

    #[test]
    fn append_to_unknown_conversation_fails() {
        let (mut state, store) = state();
        let result = state.append_message("chat_missing", Role::User, "hi");
        assert!(matches!(result, Err(Error::UnknownConversation(_))));
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn rename_only_applies_to_empty_conversation() {
        let (mut state, _store) = state();
        let id = state.create_conversation().unwrap();

        assert!(state.rename_if_first_message(&id, "one two three four five six").unwrap());
        state.append_message(&id, Role::User, "one two three four five six").unwrap();
        assert!(!state.rename_if_first_message(&id, "something else").unwrap());

        assert_eq!(state.chats().get(&id).unwrap().name, "one two three four five");
    }

    #[test]
    fn explicit_rename_persists_and_rejects_blank() {
        let (mut state, store) = state();
        let id = state.create_conversation().unwrap();

        state.rename(&id, "  Benefits  ").unwrap();
        assert_eq!(store.load().get(&id).unwrap().name, "Benefits");
        assert!(matches!(state.rename(&id, "   "), Err(Error::Validation(_))));
    }

    #[test]
    fn delete_clears_active_and_placeholders() {
        let (mut state, store) = state();
        let id = state.create_conversation().unwrap();
        let ticket = state.begin_pending(&id);

        state.delete(&id).unwrap();

        assert_eq!(state.active_id(), None);
        assert!(!state.is_awaiting(&id));
        assert_eq!(state.take_pending(ticket), None);
        assert!(store.load().is_empty());
    }

    #[test]
    fn placeholders_are_not_persisted() {
        let (mut state, store) = state();
        let id = state.create_conversation().unwrap();
        let writes = store.writes();

        let ticket = state.begin_pending(&id);
        assert!(state.is_awaiting(&id));
        assert_eq!(store.writes(), writes);

        let pending = state.take_pending(ticket).unwrap();
        assert_eq!(pending.conversation_id, id);
        assert!(!state.is_awaiting(&id));
    }

    #[test]
    fn reopen_restores_conversations_but_not_active() {
        let store = MemoryStore::new();
        let id = {
            let mut state = ChatState::open(Box::new(store.clone()));
            let id = state.create_conversation().unwrap();
            state.append_message(&id, Role::User, "hi").unwrap();
            id
        };

        let state = ChatState::open(Box::new(store));
        assert_eq!(state.active_id(), None);
        assert_eq!(state.chats().get(&id).unwrap().messages, vec![Message::user("hi")]);
    }
}
