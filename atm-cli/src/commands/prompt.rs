//! Prompts that work both on a terminal and on piped stdin

use std::cell::RefCell;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use dialoguer::{Input, Password};

/// Reads user input. On a terminal it uses dialoguer (hidden password
/// entry); otherwise it reads plain lines so sessions can be scripted.
pub struct Prompter {
    /// Line source when not on a terminal
    lines: Option<RefCell<Box<dyn BufRead>>>,
}

impl Prompter {
    pub fn detect() -> Self {
        if atty::is(atty::Stream::Stdin) {
            Self { lines: None }
        } else {
            Self::from_reader(io::stdin().lock())
        }
    }

    /// Read plain lines from `reader` instead of the terminal
    pub fn from_reader(reader: impl BufRead + 'static) -> Self {
        Self {
            lines: Some(RefCell::new(Box::new(reader))),
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.lines.is_none()
    }

    /// Read a line of text. `None` means the input is exhausted.
    pub fn text(&self, prompt: &str) -> Result<Option<String>> {
        if let Some(lines) = &self.lines {
            return read_plain_line(&mut **lines.borrow_mut(), prompt);
        }
        let value: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(Some(value))
    }

    /// Read a secret without echoing it on a terminal
    pub fn secret(&self, prompt: &str) -> Result<Option<String>> {
        if let Some(lines) = &self.lines {
            return read_plain_line(&mut **lines.borrow_mut(), prompt);
        }
        let value = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(Some(value))
    }
}

fn read_plain_line(reader: &mut dyn BufRead, prompt: &str) -> Result<Option<String>> {
    print!("{}: ", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines_until_end_of_input() {
        let prompter = Prompter::from_reader(Cursor::new("alice\r\n 1234 \n"));
        assert!(!prompter.is_interactive());

        assert_eq!(prompter.text("Enter username").unwrap().as_deref(), Some("alice"));
        // Only the line ending is stripped
        assert_eq!(prompter.secret("Enter password").unwrap().as_deref(), Some(" 1234 "));
        assert_eq!(prompter.text("Enter your choice").unwrap(), None);
    }

    #[test]
    fn test_empty_line_is_not_end_of_input() {
        let prompter = Prompter::from_reader(Cursor::new("\n"));
        assert_eq!(prompter.text("Enter amount").unwrap().as_deref(), Some(""));
        assert_eq!(prompter.text("Enter amount").unwrap(), None);
    }
}
