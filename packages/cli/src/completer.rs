use reedline::{Completer, Span, Suggestion};

const COMMANDS: &[(&str, &str)] = &[
    ("resume", "Invoke on_resume"),
    ("click", "Invoke on_click"),
    ("long", "Invoke on_long_click"),
    ("menu", "Show or answer the context menu"),
    ("call", "Invoke a global function"),
    ("reload", "Reload the script"),
    ("mode", "Show or switch network mode"),
    ("show", "Print the widget"),
    ("requests", "List issued requests"),
    ("diag", "List network diagnostics"),
    ("help", "Show help"),
    ("exit", "Exit the REPL"),
];

/// Completes command names at the start of the line, and `mock`/`real`
/// after `mode`.
#[derive(Default)]
pub struct ReplCompleter;

impl ReplCompleter {
    pub fn new() -> Self {
        Self
    }
}

impl Completer for ReplCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let line_to_pos = &line[..pos];
        let words: Vec<&str> = line_to_pos.split_whitespace().collect();
        let typing_word = !line_to_pos.ends_with(' ');

        let (prefix, candidates): (&str, Vec<(&str, &str)>) = match words.as_slice() {
            [] => ("", COMMANDS.to_vec()),
            [word] if typing_word => (*word, COMMANDS.to_vec()),
            ["mode"] => ("", modes()),
            ["mode", word] if typing_word => (*word, modes()),
            _ => return Vec::new(),
        };

        let start = pos - prefix.len();
        candidates
            .into_iter()
            .filter(|(value, _)| value.starts_with(prefix))
            .map(|(value, description)| Suggestion {
                value: value.to_string(),
                description: Some(description.to_string()),
                style: None,
                extra: None,
                span: Span::new(start, pos),
                append_whitespace: true,
                match_indices: None,
            })
            .collect()
    }
}

fn modes() -> Vec<(&'static str, &'static str)> {
    vec![("mock", "Answer from fixtures"), ("real", "Send real requests")]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(line: &str) -> Vec<String> {
        ReplCompleter::new()
            .complete(line, line.len())
            .into_iter()
            .map(|s| s.value)
            .collect()
    }

    #[test]
    fn completes_commands() {
        assert_eq!(values("re"), vec!["resume", "reload", "requests"]);
        assert_eq!(values("").len(), COMMANDS.len());
    }

    #[test]
    fn completes_modes() {
        assert_eq!(values("mode "), vec!["mock", "real"]);
        assert_eq!(values("mode r"), vec!["real"]);
        assert!(values("click 1").is_empty());
    }
}
