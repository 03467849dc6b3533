mod prompt;
mod tty;

pub use prompt::{Prompt, TerminalPrompt};
pub use tty::stdin_is_terminal;

#[cfg(test)]
pub(crate) use prompt::tests::ScriptedPrompt;
