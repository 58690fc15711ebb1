//! Interactive terminal chat (`kira chat`).
//!
//! Reads one line per turn. Lines starting with `/` are commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/upload <path>` | ingest a document into the session |
//! | `/clear` | clear transcript and memory |
//! | `/prompt` | show the system prompt |
//! | `/prompt <text>` | replace the system prompt |
//! | `/quit` | leave (also `/exit` or end of input) |
//!
//! Anything else is sent to the assistant.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::assistant::Assistant;
use crate::error::{KiraError, LoadError};
use crate::loader;
use crate::prompts;
use crate::session::Session;

enum Line<'a> {
    Quit,
    Clear,
    ShowPrompt,
    SetPrompt(&'a str),
    Upload(&'a str),
    Unknown(&'a str),
    Message(&'a str),
    Blank,
}

fn parse_line(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Line::Message(line);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "quit" | "exit" => Line::Quit,
        "clear" => Line::Clear,
        "prompt" if arg.is_empty() => Line::ShowPrompt,
        "prompt" => Line::SetPrompt(arg),
        "upload" if !arg.is_empty() => Line::Upload(arg),
        _ => Line::Unknown(line),
    }
}

/// Print the header shown when a chat starts.
pub fn print_banner(out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", prompts::TITLE)?;
    for tagline in prompts::TAGLINES {
        writeln!(out, "{}", tagline)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Ingest a local file into `session` and report the outcome.
pub async fn upload_file(
    assistant: &Assistant,
    session: &Session,
    path: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            writeln!(out, "Cannot read {}: {}", path.display(), e)?;
            return Ok(());
        }
    };

    match assistant.upload(session, &name, &bytes).await {
        Ok(report) => {
            writeln!(out, "{}", report.message)?;
            writeln!(out, "  stored as: {}", report.stored_as)?;
            writeln!(out, "  segments: {}", report.segments)?;
            writeln!(out, "  chunks: {}", report.chunks)?;
        }
        Err(KiraError::Load(LoadError::Unsupported(_))) => {
            writeln!(
                out,
                "{} Accepted: {}",
                prompts::UNSUPPORTED_FORMAT,
                loader::accepted_formats()
            )?;
        }
        Err(e) => {
            writeln!(out, "{} ({})", prompts::UPLOAD_FAILED, e)?;
        }
    }
    Ok(())
}

/// Run the read-eval-print loop until `/quit` or end of input.
///
/// `interactive` controls whether an input prompt is printed before each
/// line; it is off when stdin is not a terminal.
pub async fn run_chat<R, W>(
    assistant: &Assistant,
    session: &Session,
    input: R,
    out: &mut W,
    interactive: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if interactive {
            write!(out, "{} > ", prompts::INPUT_PLACEHOLDER)?;
            out.flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_line(&line) {
            Line::Blank => continue,
            Line::Quit => break,
            Line::Clear => {
                assistant.clear(session).await;
                writeln!(out, "{}", prompts::HISTORY_CLEARED)?;
            }
            Line::ShowPrompt => {
                writeln!(out, "{}", assistant.system_prompt(session).await)?;
            }
            Line::SetPrompt(text) => {
                assistant.set_system_prompt(session, text).await;
                writeln!(out, "System prompt updated.")?;
            }
            Line::Upload(path) => {
                upload_file(assistant, session, Path::new(path), out).await?;
            }
            Line::Unknown(cmd) => {
                writeln!(out, "Unknown command: {}", cmd)?;
            }
            Line::Message(text) => match assistant.chat(session, text).await {
                Ok(reply) => writeln!(out, "\n{}\n", reply)?,
                Err(e) => writeln!(out, "Error: {}", e)?,
            },
        }
    }
    Ok(())
}
