use std::io::{BufRead, Write};

use crate::error::Result;

/// Source of user confirmation. Decision code never reads the terminal
/// directly; it goes through this trait.
pub trait Prompt {
    fn confirm(&mut self, question: &str) -> Result<bool>;

    /// Returns the index of the picked option, or `None` to abort.
    fn choose(&mut self, question: &str, options: &[&str]) -> Result<Option<usize>>;

    fn input(&mut self, question: &str) -> Result<String>;
}

/// Line-based prompt on stderr/stdin.
pub struct TerminalPrompt<R, W> {
    reader: R,
    writer: W,
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        write!(self.writer, "{} [y/N] ", question)?;
        self.writer.flush()?;
        let answer = self.read_line()?.to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }

    fn choose(&mut self, question: &str, options: &[&str]) -> Result<Option<usize>> {
        writeln!(self.writer, "{}", question)?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.writer, "  {}) {}", i + 1, option)?;
        }
        writeln!(self.writer, "  q) abort")?;
        write!(self.writer, "> ")?;
        self.writer.flush()?;

        let answer = self.read_line()?;
        Ok(answer
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=options.len()).contains(n))
            .map(|n| n - 1))
    }

    fn input(&mut self, question: &str) -> Result<String> {
        write!(self.writer, "{}: ", question)?;
        self.writer.flush()?;
        self.read_line()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays canned answers and records every question asked.
    #[derive(Default)]
    pub(crate) struct ScriptedPrompt {
        pub answers: VecDeque<String>,
        pub asked: Vec<String>,
    }

    impl ScriptedPrompt {
        pub(crate) fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|s| s.to_string()).collect(),
                asked: Vec::new(),
            }
        }

        fn next(&mut self, question: &str) -> String {
            self.asked.push(question.to_string());
            self.answers.pop_front().unwrap_or_default()
        }
    }

    impl Prompt for ScriptedPrompt {
        fn confirm(&mut self, question: &str) -> Result<bool> {
            Ok(self.next(question) == "y")
        }

        fn choose(&mut self, question: &str, options: &[&str]) -> Result<Option<usize>> {
            let answer = self.next(question);
            Ok(answer
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=options.len()).contains(n))
                .map(|n| n - 1))
        }

        fn input(&mut self, question: &str) -> Result<String> {
            Ok(self.next(question))
        }
    }

    #[test]
    fn test_terminal_confirm_accepts_yes() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new("yes\n".as_bytes(), &mut out);
        assert!(prompt.confirm("Push?").unwrap());
        assert_eq!(String::from_utf8(out).unwrap(), "Push? [y/N] ");
    }

    #[test]
    fn test_terminal_confirm_defaults_to_no() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new("\n".as_bytes(), &mut out);
        assert!(!prompt.confirm("Push?").unwrap());
    }

    #[test]
    fn test_terminal_choose_is_one_based() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new("2\n".as_bytes(), &mut out);
        let picked = prompt.choose("How?", &["merge", "rebase"]).unwrap();
        assert_eq!(picked, Some(1));
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("  1) merge"));
        assert!(shown.contains("  q) abort"));
    }

    #[test]
    fn test_terminal_choose_out_of_range_aborts() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new("9\n".as_bytes(), &mut out);
        assert_eq!(prompt.choose("How?", &["merge"]).unwrap(), None);

        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new("q\n".as_bytes(), &mut out);
        assert_eq!(prompt.choose("How?", &["merge"]).unwrap(), None);
    }

    #[test]
    fn test_terminal_input_trims() {
        let mut out = Vec::new();
        let mut prompt = TerminalPrompt::new("  feature/x \n".as_bytes(), &mut out);
        assert_eq!(prompt.input("Branch").unwrap(), "feature/x");
    }
}
