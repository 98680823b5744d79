use crate::models::AccessFields;

/// Edit access of this client, as last reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    Editor,
    Queued { editor: Option<String> },
    Viewer { editor: Option<String> },
}

impl AccessState {
    pub fn from_fields(fields: &AccessFields) -> Self {
        if fields.can_edit {
            AccessState::Editor
        } else if fields.in_queue {
            AccessState::Queued { editor: fields.editor.clone() }
        } else {
            AccessState::Viewer { editor: fields.editor.clone() }
        }
    }

    pub fn can_edit(&self) -> bool {
        matches!(self, AccessState::Editor)
    }

    /// Who holds the edit lock, when it is someone else
    pub fn holder(&self) -> Option<&str> {
        match self {
            AccessState::Editor => None,
            AccessState::Queued { editor } | AccessState::Viewer { editor } => editor.as_deref(),
        }
    }
}

/// What the client must do after a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessTransition {
    Unchanged,
    /// Became editor. Content is refreshed before the editor turns writable.
    Promote { announce: bool },
    /// Lost or never had the lock and now waits for it
    EnterQueue { editor: Option<String> },
    /// Still queued, but the lock went to someone else
    HolderChanged { editor: Option<String> },
    /// Read-only without a place in the queue
    Demote,
}

/// Decide the transition from `previous` given a poll result.
///
/// `became_editor_after_queue` only picks whether the promotion is announced.
pub fn transition(previous: &AccessState, fields: &AccessFields) -> AccessTransition {
    let next = AccessState::from_fields(fields);
    match (previous, &next) {
        (AccessState::Editor, AccessState::Editor) => AccessTransition::Unchanged,
        (_, AccessState::Editor) => AccessTransition::Promote {
            announce: fields.became_editor_after_queue,
        },
        (AccessState::Queued { editor: before }, AccessState::Queued { editor }) if before != editor => {
            AccessTransition::HolderChanged { editor: editor.clone() }
        }
        (AccessState::Queued { .. }, AccessState::Queued { .. }) => AccessTransition::Unchanged,
        (_, AccessState::Queued { editor }) => AccessTransition::EnterQueue { editor: editor.clone() },
        (AccessState::Viewer { .. }, AccessState::Viewer { .. }) => AccessTransition::Unchanged,
        (_, AccessState::Viewer { .. }) => AccessTransition::Demote,
    }
}
