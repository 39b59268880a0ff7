//! What flows between the REPL core and its host.

use luawidget_net::Mode;

/// Something the user did at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(String),
    /// Ctrl+C.
    Interrupt,
    /// Ctrl+D, or the end of scripted input.
    Eof,
}

/// One block of output, tagged with how a host should present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Command results and listings.
    Text(String),
    /// Banner and farewell lines.
    Notice(String),
    Error(String),
    /// What the widget shows after a command ran guest code. May be empty.
    Widget(String),
}

impl Output {
    pub fn text(&self) -> &str {
        match self {
            Output::Text(text) | Output::Notice(text) | Output::Error(text) | Output::Widget(text) => {
                text
            }
        }
    }
}

/// What the next prompt shows: `router.lua [mock] menu>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptState {
    /// File name of the loaded script.
    pub script: String,
    pub mode: Mode,
    /// A context menu is waiting for a selection.
    pub menu_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// `exit` or `quit`.
    UserExit,
    /// Ctrl+D.
    Eof,
}
