//! The session orchestrator: one widget script driven through the
//! launcher lifecycle.

use std::fmt;
use std::path::{Path, PathBuf};

use luawidget_bridge::{from_json, Value};
use luawidget_net::Mode;
use luawidget_runtime::{
    entry, GuestRuntime, HostServices, Invocation, RuntimeConfig, RuntimeError, SettleReport,
    Surface,
};
use serde_json::Value as JsonValue;

use crate::error::{Result, SessionError};

/// What one entry point invocation did.
#[derive(Debug)]
pub struct Step {
    pub entry: String,
    pub result: std::result::Result<Invocation, RuntimeError>,
    pub settled: SettleReport,
}

impl Step {
    pub fn is_missing(&self) -> bool {
        matches!(self.result, Ok(Invocation::Missing))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(Invocation::Missing) => write!(f, "{}: not defined", self.entry)?,
            Ok(Invocation::Returned(values)) if values.is_empty() => {
                write!(f, "{}: ok", self.entry)?
            }
            Ok(Invocation::Returned(values)) => {
                let shown: Vec<String> = values.iter().map(Value::summary).collect();
                write!(f, "{}: ok -> {}", self.entry, shown.join(", "))?
            }
            Err(error) => write!(f, "{}: {error}", self.entry)?,
        }
        if self.settled.dispatched > 0 {
            write!(f, " ({} network result(s) delivered)", self.settled.dispatched)?;
        }
        if self.settled.timed_out {
            write!(f, " ({} request(s) still pending)", self.settled.remaining)?;
        }
        Ok(())
    }
}

/// Everything the widget has shown so far, plus network diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub surface: Surface,
    pub diagnostics: Vec<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let surface = &self.surface;
        if let Some(title) = &surface.title {
            writeln!(f, "== {title} ==")?;
        }
        if surface.output.is_empty() {
            writeln!(f, "(no output)")?;
        } else {
            writeln!(f, "{}", surface.output)?;
        }
        if let Some(menu) = &surface.menu {
            writeln!(f)?;
            writeln!(f, "menu:")?;
            for (i, label) in menu.iter().enumerate() {
                writeln!(f, "  {}. {label}", i + 1)?;
            }
        }
        for toast in &surface.toasts {
            writeln!(f, "toast: {toast}")?;
        }
        for url in &surface.opened_urls {
            writeln!(f, "browser: {url}")?;
        }
        if !self.diagnostics.is_empty() {
            writeln!(f)?;
            writeln!(f, "network diagnostics:")?;
            for line in &self.diagnostics {
                writeln!(f, "  {line}")?;
            }
        }
        Ok(())
    }
}

/// A loaded script and the services it runs against.
///
/// Reloading builds a new runtime on the same services, so storage, the
/// network mode and global headers carry over.
pub struct Session {
    script: PathBuf,
    services: HostServices,
    config: RuntimeConfig,
    runtime: GuestRuntime,
    /// The last context menu the script showed, until a selection is made.
    menu: Option<Vec<String>>,
}

impl Session {
    pub fn open(script: &Path, services: HostServices, config: RuntimeConfig) -> Result<Self> {
        let runtime = GuestRuntime::load_file(script, services.clone(), config.clone())?;
        Ok(Self {
            script: script.to_path_buf(),
            services,
            config,
            runtime,
            menu: None,
        })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn runtime(&self) -> &GuestRuntime {
        &self.runtime
    }

    pub fn services(&self) -> &HostServices {
        &self.services
    }

    /// Load the script again from disk. On failure the previous runtime
    /// stays in place.
    pub fn reload(&mut self) -> Result<()> {
        let runtime =
            GuestRuntime::load_file(&self.script, self.services.clone(), self.config.clone())?;
        self.runtime = runtime;
        self.menu = None;
        tracing::info!(script = %self.script.display(), "script reloaded");
        Ok(())
    }

    /// `on_load` (when defined) followed by `on_resume`.
    pub fn start(&mut self) -> Vec<Step> {
        let mut steps = Vec::new();
        if self.runtime.has_entry(entry::ON_LOAD) {
            steps.push(self.invoke(entry::ON_LOAD, &[]));
        }
        steps.push(self.resume());
        steps
    }

    pub fn resume(&mut self) -> Step {
        self.invoke(entry::ON_RESUME, &[])
    }

    pub fn click(&mut self, index: Option<i64>) -> Step {
        let args: Vec<Value> = index.map(Value::from).into_iter().collect();
        self.invoke(entry::ON_CLICK, &args)
    }

    pub fn long_click(&mut self, index: Option<i64>) -> Step {
        let args: Vec<Value> = index.map(Value::from).into_iter().collect();
        self.invoke(entry::ON_LONG_CLICK, &args)
    }

    /// The open context menu, if any.
    pub fn menu(&self) -> Option<&[String]> {
        self.menu.as_deref()
    }

    /// Answer the open context menu with a 1-based `index`; 0 cancels.
    pub fn select_menu(&mut self, index: i64) -> Result<Step> {
        let len = self.menu.as_ref().ok_or(SessionError::NoMenu)?.len();
        if index < 0 || index as usize > len {
            return Err(SessionError::MenuIndex { index, len });
        }
        self.menu = None;
        Ok(self.invoke(entry::ON_CONTEXT_MENU_CLICK, &[Value::from(index)]))
    }

    /// Invoke `name` with `args` and wait for the requests it started.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Step {
        let result = self.runtime.call(name, args);
        let settled = self.runtime.settle_default();
        if let Some(menu) = self.runtime.take_menu() {
            self.menu = Some(menu);
        }
        Step {
            entry: name.to_string(),
            result,
            settled,
        }
    }

    pub fn mode(&self) -> Mode {
        self.services.network.borrow().mode()
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.services.network.borrow_mut().set_mode(mode);
    }

    pub fn report(&self) -> Report {
        let mut surface = self.runtime.surface();
        surface.menu = self.menu.clone();
        let diagnostics = self
            .services
            .network
            .borrow()
            .diagnostics()
            .iter()
            .map(ToString::to_string)
            .collect();
        Report {
            surface,
            diagnostics,
        }
    }

    /// One line per request issued so far.
    pub fn requests(&self) -> Vec<String> {
        self.services
            .network
            .borrow()
            .recorded_requests()
            .iter()
            .map(|r| {
                let mut line = format!(
                    "#{} [{}] {} {}",
                    r.id, r.mode, r.request.method, r.request.url
                );
                for (name, value) in &r.request.headers {
                    line.push_str(&format!("\n    {name}: {value}"));
                }
                if let Some(body) = &r.request.body {
                    line.push_str(&format!("\n    body: {body}"));
                }
                line
            })
            .collect()
    }
}

/// Parse a command-line entry point argument as JSON.
pub fn parse_arg(text: &str) -> Result<Value> {
    serde_json::from_str::<JsonValue>(text)
        .map(|json| from_json(&json))
        .map_err(|error| SessionError::Argument {
            text: text.to_string(),
            error,
        })
}
