//! In-memory code editor buffer.
//!
//! Replaces the browser's embedded editor widget: holds the working copy of
//! the player's solution, installs a language-appropriate starter template on
//! language switch, and notifies the session controller on every content
//! change so stale error panels and execution status get invalidated.

use clap::ValueEnum;
use tokio::sync::mpsc;

use crate::ClientEvent;

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

/// Languages the execution backend accepts.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Language {
    Javascript,
    Python,
    Go,
}

impl Language {
    /// Loose parse accepting the common aliases players type.
    pub fn from_str_loose(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::Javascript),
            "python" | "py" => Ok(Language::Python),
            "go" | "golang" => Ok(Language::Go),
            _ => Err(format!("Unknown language: {}", s)),
        }
    }

    /// The identifier the execution backend expects on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Language::Javascript => "js",
            Language::Python => "python",
            Language::Go => "go",
        }
    }

    /// Starter stub installed when switching to this language. Each template
    /// runs as-is in the execution environment.
    pub fn starter_template(&self) -> &'static str {
        match self {
            Language::Javascript => {
                "// Write your solution here\nfunction solve() {\n\treturn true;\n}"
            }
            Language::Python => "# Write your solution here\ndef solve():\n\treturn True",
            Language::Go => {
                "// Write your solution here\npackage main\n\nfunc solve() bool {\n\treturn true\n}"
            }
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Javascript => write!(f, "javascript"),
            Language::Python => write!(f, "python"),
            Language::Go => write!(f, "go"),
        }
    }
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// The working copy of the player's solution.
pub struct EditorBuffer {
    language: Language,
    content: String,
    /// When set, every content change emits `ClientEvent::EditorChanged`.
    pub changes_tx: Option<mpsc::UnboundedSender<ClientEvent>>,
}

impl EditorBuffer {
    /// New buffer pre-filled with the starter template for `language`.
    pub fn new(language: Language) -> Self {
        EditorBuffer {
            language,
            content: language.starter_template().to_string(),
            changes_tx: None,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Replace the whole buffer.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.notify_changed();
    }

    /// Switch language and install its starter template, discarding the
    /// current content.
    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        self.content = language.starter_template().to_string();
        self.notify_changed();
    }

    fn notify_changed(&self) {
        if let Some(tx) = &self.changes_tx {
            let _ = tx.send(ClientEvent::EditorChanged);
        }
    }
}
