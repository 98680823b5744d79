use std::fmt;

/// Messages for the person in front of the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Opening failed; the user may retry
    OpenFailed { project: String, reason: String },
    Queued { editor: Option<String> },
    PromotedFromQueue,
    ServerError(String),
    Saved { project: String },
    SaveFailed { project: String, reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::OpenFailed { project, reason } => {
                write!(f, "Error loading project {}. Check your connection and try again. ({})", project, reason)
            }
            Notice::Queued { editor } => write!(
                f,
                "The project is currently being edited by {}. You have been added to the editing queue.",
                editor.as_deref().unwrap_or("another user")
            ),
            Notice::PromotedFromQueue => f.write_str("The previous editor has left, you can now edit the project."),
            Notice::ServerError(error) => f.write_str(error),
            Notice::Saved { project } => write!(f, "Saved {}", project),
            Notice::SaveFailed { project, reason } => write!(f, "Saving {} failed: {}", project, reason),
        }
    }
}

/// The editor the session drives: shows content, toggles writability, reports notices.
///
/// Calls are short and synchronous. Implementations must not call back into the session.
pub trait EditorSurface: Send + Sync + 'static {
    /// A project was opened with this content
    fn show_project(&self, project: &str, content: &str);

    /// Fresh server content for the open project
    fn replace_content(&self, content: &str);

    fn set_writable(&self, writable: bool);

    /// Full document as currently shown
    fn current_content(&self) -> String;

    fn notify(&self, notice: Notice);
}
