use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// Prompt on stderr so stdout stays valid JSON.
pub(super) fn confirm_on_terminal(prompt: &str) -> Result<bool> {
    let mut input = io::stdin().lock();
    confirm(prompt, &mut input, &mut io::stderr())
}

fn confirm(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "{} [y/N] ", prompt)?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
