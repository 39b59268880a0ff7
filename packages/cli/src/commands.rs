//! REPL command parsing and execution.
//!
//! Commands:
//! - `resume` - Invoke `on_resume`
//! - `click [n]` / `long [n]` - Invoke `on_click` / `on_long_click`
//! - `menu [n]` - Show the open context menu, or select entry `n` (0 cancels)
//! - `call <name> [json...]` - Invoke any global function
//! - `reload` - Load the script again from disk
//! - `mode [mock|real]` - Show or switch the network mode
//! - `show` - Print the rendered widget and diagnostics
//! - `requests` - List every request issued so far
//! - `diag` - List network diagnostics
//! - `help`, `exit`

use nu_ansi_term::{Color, Style};
use serde_json::Value as JsonValue;

use luawidget_bridge::{from_json, Value};
use luawidget_net::Mode;

use crate::session::{Session, Step};

/// Result of executing a command.
#[derive(Debug)]
pub enum CommandResult {
    Ok {
        /// REPL chatter: step summaries, listings.
        display: Option<String>,
        /// What the widget shows after the command, if it ran guest code.
        widget: Option<String>,
    },
    Error(String),
    Exit,
    Help,
}

impl CommandResult {
    fn ok_display(display: impl Into<String>) -> Self {
        CommandResult::Ok {
            display: Some(display.into()),
            widget: None,
        }
    }

    fn ok_none() -> Self {
        CommandResult::Ok {
            display: None,
            widget: None,
        }
    }
}

/// Parse and execute one command line.
pub fn execute(input: &str, session: &mut Session) -> CommandResult {
    let input = input.trim();
    if input.is_empty() {
        return CommandResult::ok_none();
    }

    let (command, rest) = match input.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (input, ""),
    };

    match command.to_lowercase().as_str() {
        "resume" | "r" => stepped(session, |s| s.resume()),
        "click" | "c" => match optional_index(rest) {
            Ok(index) => stepped(session, |s| s.click(index)),
            Err(message) => CommandResult::Error(message),
        },
        "long" | "l" => match optional_index(rest) {
            Ok(index) => stepped(session, |s| s.long_click(index)),
            Err(message) => CommandResult::Error(message),
        },
        "menu" | "m" => cmd_menu(rest, session),
        "call" => cmd_call(rest, session),
        "reload" => match session.reload() {
            Ok(()) => CommandResult::ok_display(format!(
                "{} {}",
                Color::Green.paint("reloaded"),
                session.script().display()
            )),
            Err(error) => CommandResult::Error(error.to_string()),
        },
        "mode" => cmd_mode(rest, session),
        "show" | "s" => CommandResult::ok_display(session.report().to_string()),
        "requests" | "req" => {
            let requests = session.requests();
            if requests.is_empty() {
                CommandResult::ok_display("(no requests)")
            } else {
                CommandResult::ok_display(requests.join("\n"))
            }
        }
        "diag" => {
            let diagnostics = session.report().diagnostics;
            if diagnostics.is_empty() {
                CommandResult::ok_display("(no diagnostics)")
            } else {
                CommandResult::ok_display(diagnostics.join("\n"))
            }
        }
        "help" | "?" => CommandResult::Help,
        "exit" | "quit" | "q" => CommandResult::Exit,
        _ => CommandResult::Error(format!(
            "Unknown command: {}. Type 'help' for available commands.",
            command
        )),
    }
}

/// Run a step and report it along with what the widget now shows.
fn stepped(session: &mut Session, step: impl FnOnce(&mut Session) -> Step) -> CommandResult {
    let step = step(session);
    let style = match &step.result {
        Err(_) => Style::new().fg(Color::Red),
        Ok(_) if step.is_missing() => Style::new().fg(Color::Yellow),
        Ok(_) => Style::new().fg(Color::DarkGray),
    };
    let mut display = style.paint(step.to_string()).to_string();
    if let Some(menu) = session.menu() {
        display.push_str(&format!(
            "\n{} {}",
            Color::Magenta.paint("menu open:"),
            numbered(menu)
        ));
    }
    CommandResult::Ok {
        display: Some(display),
        widget: Some(session.report().surface.output),
    }
}

fn cmd_menu(rest: &str, session: &mut Session) -> CommandResult {
    if rest.is_empty() {
        return match session.menu() {
            Some(menu) => CommandResult::ok_display(numbered(menu)),
            None => CommandResult::ok_display("(no menu open)"),
        };
    }
    let index = match rest.parse::<i64>() {
        Ok(index) => index,
        Err(_) => return CommandResult::Error(format!("Invalid menu index: {rest}")),
    };
    match session.select_menu(index) {
        Ok(step) => stepped(session, move |_| step),
        Err(error) => CommandResult::Error(error.to_string()),
    }
}

fn cmd_call(rest: &str, session: &mut Session) -> CommandResult {
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return CommandResult::Error("Usage: call <name> [json...]".to_string());
    }
    let args = match parse_json_args(args) {
        Ok(args) => args,
        Err(message) => return CommandResult::Error(message),
    };
    stepped(session, |s| s.invoke(name, &args))
}

fn cmd_mode(rest: &str, session: &mut Session) -> CommandResult {
    if rest.is_empty() {
        return CommandResult::ok_display(format!("network mode: {}", session.mode()));
    }
    match rest.parse::<Mode>() {
        Ok(mode) => {
            session.set_mode(mode);
            CommandResult::ok_display(format!("network mode: {mode}"))
        }
        Err(error) => CommandResult::Error(error.to_string()),
    }
}

fn optional_index(rest: &str) -> Result<Option<i64>, String> {
    if rest.is_empty() {
        return Ok(None);
    }
    rest.parse()
        .map(Some)
        .map_err(|_| format!("Invalid index: {rest}"))
}

/// Whitespace-separated JSON values.
fn parse_json_args(text: &str) -> Result<Vec<Value>, String> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<JsonValue>()
        .map(|json| {
            json.map(|json| from_json(&json))
                .map_err(|e| format!("Invalid JSON argument: {e}"))
        })
        .collect()
}

fn numbered(labels: &[String]) -> String {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}. {label}", i + 1))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Format the help text.
pub fn format_help() -> String {
    let cmd_style = Style::new().bold().fg(Color::Cyan);
    let arg_style = Style::new().fg(Color::Yellow);

    let mut help = String::new();
    help.push_str(&format!(
        "{}\n\n",
        Style::new().bold().paint("luawidget commands")
    ));

    let commands = [
        ("resume", "", "Invoke on_resume (alias: r)"),
        ("click", "[n]", "Invoke on_click, optionally with a button index (alias: c)"),
        ("long", "[n]", "Invoke on_long_click (alias: l)"),
        ("menu", "[n]", "Show the open menu, or select entry n; 0 cancels (alias: m)"),
        ("call", "<name> [json...]", "Invoke any global function with JSON arguments"),
        ("", "", ""),
        ("reload", "", "Load the script again from disk"),
        ("mode", "[mock|real]", "Show or switch the network mode"),
        ("show", "", "Print the widget, toasts and diagnostics (alias: s)"),
        ("requests", "", "List issued requests with their headers (alias: req)"),
        ("diag", "", "List mock misses and transport failures"),
        ("", "", ""),
        ("help", "", "Show this help message"),
        ("exit", "", "Exit the REPL (alias: quit, q)"),
    ];

    for (cmd, args, desc) in commands {
        if cmd.is_empty() {
            help.push('\n');
        } else {
            help.push_str(&format!(
                "  {:<10} {:<18} {}\n",
                cmd_style.paint(cmd),
                arg_style.paint(args),
                desc
            ));
        }
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_args_split_on_value_boundaries() {
        let args = parse_json_args(r#"2 "two" {"a": [1, 2]}"#).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!(args[0], Value::Number(2.0));
        assert_eq!(args[1], Value::from("two"));
        assert!(args[2].as_table().is_some());

        assert!(parse_json_args("").unwrap().is_empty());
        assert!(parse_json_args("{oops").is_err());
    }

    #[test]
    fn indexes() {
        assert_eq!(optional_index(""), Ok(None));
        assert_eq!(optional_index("3"), Ok(Some(3)));
        assert!(optional_index("x").is_err());
    }

    #[test]
    fn numbered_labels() {
        let labels = vec!["Refresh".to_string(), "Open".to_string()];
        assert_eq!(numbered(&labels), "1. Refresh  2. Open");
    }

    #[test]
    fn help_mentions_every_command() {
        let help = format_help();
        for cmd in ["resume", "click", "long", "menu", "call", "reload", "mode", "show", "requests", "diag"] {
            assert!(help.contains(cmd), "{cmd} missing from help");
        }
    }
}
