//! Scripted [`IoHost`] for driving the REPL from tests.

use std::collections::VecDeque;

use super::{Event, IoError, IoHost, Output, PromptState};

/// Replays queued events and keeps everything written to it. Once the
/// queue runs dry it answers [`Event::Eof`].
#[derive(Debug, Default)]
pub struct TestHost {
    events: VecDeque<Event>,
    written: Vec<Output>,
    prompts: Vec<PromptState>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that will type `lines` one after another.
    pub fn typing<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut host = Self::new();
        for line in lines {
            host.push(Event::Line(line.to_string()));
        }
        host
    }

    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn written(&self) -> &[Output] {
        &self.written
    }

    /// Every output block, newline separated.
    pub fn transcript(&self) -> String {
        self.written
            .iter()
            .map(Output::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn widgets(&self) -> Vec<&str> {
        self.written
            .iter()
            .filter_map(|o| match o {
                Output::Widget(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<&str> {
        self.written
            .iter()
            .filter_map(|o| match o {
                Output::Error(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_prompt(&self) -> Option<&PromptState> {
        self.prompts.last()
    }
}

impl IoHost for TestHost {
    fn next_event(&mut self, prompt: &PromptState) -> Result<Event, IoError> {
        self.prompts.push(prompt.clone());
        Ok(self.events.pop_front().unwrap_or(Event::Eof))
    }

    fn write(&mut self, output: Output) -> Result<(), IoError> {
        self.written.push(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_lines_then_eof() {
        let mut host = TestHost::typing(["first", "second"]);
        let prompt = PromptState::default();
        assert_eq!(host.next_event(&prompt).unwrap(), Event::Line("first".into()));
        assert_eq!(host.next_event(&prompt).unwrap(), Event::Line("second".into()));
        assert_eq!(host.next_event(&prompt).unwrap(), Event::Eof);
        assert_eq!(host.prompts.len(), 3);
    }

    #[test]
    fn output_is_sorted_by_kind() {
        let mut host = TestHost::new();
        host.write(Output::Text("ok".into())).unwrap();
        host.write(Output::Error("bad".into())).unwrap();
        host.write(Output::Widget("CPU 5%".into())).unwrap();
        assert_eq!(host.errors(), vec!["bad"]);
        assert_eq!(host.widgets(), vec!["CPU 5%"]);
        assert_eq!(host.transcript(), "ok\nbad\nCPU 5%");
    }
}
