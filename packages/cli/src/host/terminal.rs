//! Interactive host on top of Reedline.

use std::borrow::Cow;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use luawidget_net::Mode;
use nu_ansi_term::{Color, Style};
use reedline::{
    default_emacs_keybindings, default_vi_insert_keybindings, default_vi_normal_keybindings,
    ColumnarMenu, DefaultHinter, EditMode, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    PromptViMode, Reedline, ReedlineEvent, ReedlineMenu, Signal, Vi,
};

use crate::completer::ReplCompleter;
use crate::io::{Event, IoError, IoHost, Output, PromptState};

const MENU: &str = "commands";
const HISTORY_LINES: usize = 1000;

pub struct TerminalHost {
    editor: Reedline,
}

impl TerminalHost {
    pub fn new() -> Self {
        let menu = ColumnarMenu::default()
            .with_name(MENU)
            .with_text_style(Style::new().fg(Color::Cyan))
            .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan).bold());

        let mut editor = Reedline::create()
            .with_completer(Box::new(ReplCompleter::new()))
            .with_hinter(Box::new(
                DefaultHinter::default().with_style(Style::new().fg(Color::DarkGray)),
            ))
            .with_menu(ReedlineMenu::EngineCompleter(Box::new(menu)))
            .with_edit_mode(KeyStyle::detect().edit_mode());

        if let Some(history) = open_history() {
            editor = editor.with_history(Box::new(history));
        }
        Self { editor }
    }
}

impl Default for TerminalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl IoHost for TerminalHost {
    fn next_event(&mut self, prompt: &PromptState) -> Result<Event, IoError> {
        let signal = self
            .editor
            .read_line(&WidgetPrompt(prompt))
            .map_err(|e| IoError::Editor(e.to_string()))?;
        Ok(match signal {
            Signal::Success(line) => Event::Line(line),
            Signal::CtrlC => Event::Interrupt,
            Signal::CtrlD => Event::Eof,
        })
    }

    fn write(&mut self, output: Output) -> Result<(), IoError> {
        match &output {
            Output::Text(text) => println!("{text}"),
            Output::Notice(text) => println!("{}", Color::Cyan.paint(text)),
            Output::Error(text) => println!("{} {text}", Color::Red.bold().paint("error:")),
            Output::Widget(text) if text.is_empty() => {
                println!("{}", Color::DarkGray.paint("(no output)"))
            }
            Output::Widget(text) => println!("{}", Style::new().bold().paint(text)),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), IoError> {
        io::stdout()
            .flush()
            .map_err(|e| IoError::Editor(e.to_string()))
    }
}

/// `router.lua [mock]>`, with ` menu>` while a context menu waits.
struct WidgetPrompt<'a>(&'a PromptState);

impl Prompt for WidgetPrompt<'_> {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let tag = format!("[{}]", self.0.mode);
        let tag = match self.0.mode {
            Mode::Real => Color::Red.bold().paint(tag),
            Mode::Mock => Color::Blue.paint(tag),
        };
        format!("{} {tag}", Color::Yellow.paint(&self.0.script)).into()
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        let arrow = if self.0.menu_open { " menu> " } else { "> " };
        match edit_mode {
            PromptEditMode::Vi(PromptViMode::Normal) => {
                format!("{}", Color::Purple.paint(format!(":{arrow}"))).into()
            }
            _ => format!("{}", Color::Green.paint(arrow)).into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, search: PromptHistorySearch) -> Cow<'_, str> {
        let failing = match search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "no match ",
        };
        format!("({failing}history: {}) ", search.term).into()
    }
}

/// Key bindings the line editor starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStyle {
    Emacs,
    Vi,
}

impl KeyStyle {
    /// `LUAWIDGET_EDIT_MODE` wins; otherwise follow `$VISUAL`/`$EDITOR`,
    /// then `set editing-mode vi` in the readline init file.
    fn detect() -> Self {
        if let Ok(choice) = std::env::var("LUAWIDGET_EDIT_MODE") {
            return Self::parse(&choice);
        }
        let editor = std::env::var("VISUAL").or_else(|_| std::env::var("EDITOR"));
        if let Ok(editor) = editor {
            let name = Path::new(&editor)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if matches!(name.as_str(), "vi" | "vim" | "nvim") {
                return KeyStyle::Vi;
            }
        }
        if inputrc_wants_vi() {
            KeyStyle::Vi
        } else {
            KeyStyle::Emacs
        }
    }

    fn parse(choice: &str) -> Self {
        match choice.trim().to_ascii_lowercase().as_str() {
            "vi" | "vim" => KeyStyle::Vi,
            _ => KeyStyle::Emacs,
        }
    }

    fn edit_mode(self) -> Box<dyn EditMode> {
        let tab = ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu(MENU.to_string()),
            ReedlineEvent::MenuNext,
        ]);
        match self {
            KeyStyle::Vi => {
                let mut insert = default_vi_insert_keybindings();
                insert.add_binding(KeyModifiers::NONE, KeyCode::Tab, tab);
                Box::new(Vi::new(insert, default_vi_normal_keybindings()))
            }
            KeyStyle::Emacs => {
                let mut keys = default_emacs_keybindings();
                keys.add_binding(KeyModifiers::NONE, KeyCode::Tab, tab);
                Box::new(Emacs::new(keys))
            }
        }
    }
}

fn inputrc_wants_vi() -> bool {
    let path = std::env::var_os("INPUTRC")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".inputrc")));
    let Some(contents) = path.and_then(|p| std::fs::read_to_string(p).ok()) else {
        return false;
    };
    contents.lines().any(|line| {
        let words: Vec<&str> = line.split_whitespace().collect();
        words == ["set", "editing-mode", "vi"]
    })
}

fn open_history() -> Option<FileBackedHistory> {
    let path = dirs::data_local_dir()?.join("luawidget").join("history.txt");
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    match FileBackedHistory::with_file(HISTORY_LINES, path) {
        Ok(history) => Some(history),
        Err(error) => {
            tracing::debug!(%error, "no REPL history");
            None
        }
    }
}
