//! Styled console implementation of [`HostIo`].

use std::io;

use console::style;
use dialoguer::Input;
use weft_types::Payload;

use crate::host::HostIo;

/// Console host: styled output on stdout/stderr, prompted input via the
/// terminal.
///
/// Payloads are appended compactly after the message when present, in the
/// same shape for every instruction kind.
#[derive(Debug, Default)]
pub struct ConsoleHost {
    _private: (),
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }
}

fn payload_suffix(payload: Option<&Payload>) -> String {
    match payload {
        Some(value) => format!("  Payload: {value}"),
        None => String::new(),
    }
}

impl HostIo for ConsoleHost {
    fn notify(&mut self, level: &str, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        let tag = format!("[{}]", level.to_uppercase());
        println!(
            "{} {}{}",
            style(tag).cyan().bold(),
            message,
            style(payload_suffix(payload)).dim()
        );
        Ok(())
    }

    fn warning(&mut self, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        println!(
            "{} {}{}",
            style("[WARNING]").yellow().bold(),
            message,
            style(payload_suffix(payload)).dim()
        );
        Ok(())
    }

    fn error(&mut self, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        eprintln!(
            "{} {}{}",
            style("[ERROR]").red().bold(),
            message,
            style(payload_suffix(payload)).dim()
        );
        Ok(())
    }

    fn debug(&mut self, level: &str, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        let tag = format!("[DEBUG - {}]", level.to_uppercase());
        println!(
            "{} {}{}",
            style(tag).magenta(),
            style(message).dim(),
            style(payload_suffix(payload)).dim()
        );
        Ok(())
    }

    fn custom(&mut self, name: &str, payload: Option<&Payload>) -> io::Result<()> {
        println!(
            "{} Performing '{}'{}",
            style("[CUSTOM ACTION]").green().bold(),
            name,
            style(payload_suffix(payload)).dim()
        );
        Ok(())
    }

    fn request_input(&mut self, query: &str) -> io::Result<String> {
        let prompt = format!("{} {}", style("[INPUT REQUEST]").blue().bold(), query);
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn banner(&mut self, text: &str) -> io::Result<()> {
        let rule = "-".repeat(50);
        println!("{rule} {} {rule}", style(text).bold());
        Ok(())
    }

    fn transition_separator(&mut self, count: usize) -> io::Result<()> {
        let rule = "=".repeat(30);
        println!(
            "\n{rule}  {}  {rule}\n",
            style(format!("State Transition #{count}")).dim()
        );
        Ok(())
    }
}
