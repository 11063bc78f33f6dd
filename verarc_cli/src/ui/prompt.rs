//! Reading answers and passwords from the terminal or from stdin.

use std::io::{self, BufRead, Write};

/// Reads one line from stdin without its line ending.
fn read_answer() -> io::Result<String> {
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Prints `question` with a `(y/N)` hint. Only "y" or "yes" accepts; an empty
/// answer or end of input declines.
pub fn confirm_action(question: &str) -> io::Result<bool> {
    let mut stdout = io::stdout();
    write!(stdout, "{} (y/N) ", question)?;
    stdout.flush()?;
    let answer = read_answer()?.trim().to_ascii_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes"))
}

/// Where passwords come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    /// Hidden prompt on the controlling terminal.
    Terminal,
    /// One line per password on stdin, for scripts.
    Stdin,
}

impl PasswordSource {
    pub fn from_flag(password_stdin: bool) -> Self {
        if password_stdin {
            PasswordSource::Stdin
        } else {
            PasswordSource::Terminal
        }
    }

    pub fn read(self, label: &str) -> io::Result<String> {
        match self {
            PasswordSource::Terminal => rpassword::prompt_password(label),
            PasswordSource::Stdin => read_answer(),
        }
    }
}
