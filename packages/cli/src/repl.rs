//! The REPL loop, independent of where lines come from.

use crate::commands::{self, CommandResult};
use crate::io::{Event, ExitReason, IoError, IoHost, Output, PromptState};
use crate::session::Session;

const FAREWELL: &str = "Goodbye!";

/// Drives one [`Session`] from user events.
pub struct ReplCore {
    session: Session,
}

impl ReplCore {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read commands from `io` until the user leaves.
    pub fn run(&mut self, io: &mut impl IoHost) -> Result<ExitReason, IoError> {
        io.write(Output::Notice(format!(
            "luawidget: {} loaded. Type 'help' for commands, 'exit' to quit.",
            self.session.script().display()
        )))?;

        loop {
            let line = match io.next_event(&self.prompt())? {
                Event::Line(line) => line,
                Event::Interrupt => {
                    io.write(Output::Notice("^C (use 'exit' to quit)".into()))?;
                    continue;
                }
                Event::Eof => return farewell(io, ExitReason::Eof),
            };

            match commands::execute(&line, &mut self.session) {
                CommandResult::Ok { display, widget } => {
                    for output in display
                        .map(Output::Text)
                        .into_iter()
                        .chain(widget.map(Output::Widget))
                    {
                        io.write(output)?;
                    }
                }
                CommandResult::Error(message) => io.write(Output::Error(message))?,
                CommandResult::Help => io.write(Output::Text(commands::format_help()))?,
                CommandResult::Exit => return farewell(io, ExitReason::UserExit),
            }
            io.flush()?;
        }
    }

    fn prompt(&self) -> PromptState {
        PromptState {
            script: self
                .session
                .script()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mode: self.session.mode(),
            menu_open: self.session.menu().is_some(),
        }
    }
}

fn farewell(io: &mut impl IoHost, reason: ExitReason) -> Result<ExitReason, IoError> {
    io.write(Output::Notice(FAREWELL.into()))?;
    io.flush()?;
    Ok(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::TestHost;
    use std::io::Write;
    use std::time::Duration;

    use luawidget_kv_store::InMemoryStore;
    use luawidget_net::{FacadeConfig, FixtureSet, Mode, NetworkFacade};
    use luawidget_runtime::{HostServices, RuntimeConfig};
    use tempfile::NamedTempFile;

    const WIDGET: &str = r#"
        function on_resume()
            http:get("http://router/rest/system/resource", function(body, code)
                local r = json.decode(body)
                ui:show_text("CPU " .. r["cpu-load"] .. "%")
            end)
        end

        function on_long_click()
            ui:show_context_menu({"Reboot", "Refresh"})
        end

        function on_context_menu_click(i)
            ui:show_text("picked " .. i)
        end

        function greet(name)
            ui:show_text("hello " .. name)
        end
    "#;

    fn repl() -> (ReplCore, NamedTempFile) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(WIDGET.as_bytes()).unwrap();
        let fixtures =
            FixtureSet::from_json_str(r#"{"/rest/system/resource": {"cpu-load": "7"}}"#).unwrap();
        let config = FacadeConfig {
            mock_latency: Duration::from_millis(5),
            ..Default::default()
        };
        let services =
            HostServices::new(NetworkFacade::new(config, fixtures), InMemoryStore::new());
        let session = Session::open(file.path(), services, RuntimeConfig::default()).unwrap();
        (ReplCore::new(session), file)
    }

    fn run(inputs: &[&str]) -> (TestHost, ExitReason) {
        let (mut core, _file) = repl();
        let mut host = TestHost::typing(inputs.iter().copied());
        let reason = core.run(&mut host).unwrap();
        (host, reason)
    }

    #[test]
    fn exit_command() {
        let (host, reason) = run(&["exit"]);
        assert_eq!(reason, ExitReason::UserExit);
        assert_eq!(host.written().last(), Some(&Output::Notice(FAREWELL.into())));
    }

    #[test]
    fn eof_ends_session() {
        let (_, reason) = run(&[]);
        assert_eq!(reason, ExitReason::Eof);
    }

    #[test]
    fn interrupt_does_not_exit() {
        let (mut core, _file) = repl();
        let mut host = TestHost::new();
        host.push(Event::Interrupt);
        host.push(Event::Line("exit".into()));
        assert_eq!(core.run(&mut host).unwrap(), ExitReason::UserExit);
        assert!(host.transcript().contains("^C"));
    }

    #[test]
    fn resume_renders_widget() {
        let (host, _) = run(&["resume", "exit"]);
        assert_eq!(host.widgets(), vec!["CPU 7%"]);
    }

    #[test]
    fn menu_flow() {
        let (host, _) = run(&["long", "menu", "menu 2", "menu 1", "exit"]);
        let text = host.transcript();
        assert!(text.contains("1. Reboot  2. Refresh"));
        assert_eq!(host.widgets().last(), Some(&"picked 2"));
        assert_eq!(host.errors(), vec!["no context menu is open"]);
    }

    #[test]
    fn call_with_json_arguments() {
        let (host, _) = run(&[r#"call greet "there""#, "call", "exit"]);
        assert_eq!(host.widgets(), vec!["hello there"]);
        assert_eq!(host.errors().len(), 1);
    }

    #[test]
    fn mode_switch_shows_in_prompt() {
        let (mut core, _file) = repl();
        let mut host = TestHost::typing(["mode real", "mode bogus"]);
        core.run(&mut host).unwrap();
        assert_eq!(host.last_prompt().unwrap().mode, Mode::Real);
        assert_eq!(host.errors().len(), 1);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let (host, _) = run(&["frobnicate", "exit"]);
        assert!(host.errors()[0].contains("Unknown command: frobnicate"));
    }

    #[test]
    fn requests_are_listed() {
        let (host, _) = run(&["requests", "resume", "requests", "exit"]);
        let text = host.transcript();
        assert!(text.contains("(no requests)"));
        assert!(text.contains("#1 [mock] GET http://router/rest/system/resource"));
    }
}
