use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::Context as _;
use paketprobe_core::target::{self, DEFAULT_CRUD_PORT, DEFAULT_HOST};

/// Prompts only when stdin is an interactive terminal.
pub(crate) fn should_prompt(no_prompt: bool) -> bool {
    !no_prompt && io::stdin().is_terminal()
}

/// Asks for host and port on `output`, reading answers from `input`.
///
/// Empty answers take the defaults. An invalid port asks for the port again
/// and a host that does not form a valid URL asks for the host again. End of
/// input falls back to the defaults.
pub(crate) fn ask_base_url<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> anyhow::Result<String> {
    loop {
        let host_answer = ask(input, output, &format!("API host [{DEFAULT_HOST}]: "))?;
        let host = match host_answer.as_deref() {
            None | Some("") => DEFAULT_HOST.to_string(),
            Some(h) => h.to_string(),
        };

        loop {
            let answer = ask(input, output, &format!("API port [{DEFAULT_CRUD_PORT}]: "))?;
            let port = match answer.as_deref() {
                None | Some("") => DEFAULT_CRUD_PORT.to_string(),
                Some(p) => p.to_string(),
            };
            match target::base_url_from_host_port(&host, &port) {
                Ok(url) => return Ok(url),
                Err(err) if answer.is_none() => return Err(err.into()),
                Err(err @ paketprobe_core::Error::InvalidBaseUrl(_)) => {
                    writeln!(output, "{err}").context("failed to write prompt")?;
                    break;
                }
                Err(err) => {
                    writeln!(output, "{err}").context("failed to write prompt")?;
                }
            }
        }
    }
}

/// `None` at end of input.
fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> anyhow::Result<Option<String>> {
    write!(output, "{question}").context("failed to write prompt")?;
    output.flush().context("failed to write prompt")?;

    let mut line = String::new();
    let read = input.read_line(&mut line).context("failed to read answer")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
