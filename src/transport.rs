//! Chat transport boundary
//!
//! The dispatcher is transport-agnostic; anything that can produce
//! [`Incoming`] events and accept [`Reply`] renders can drive it. The
//! console transport is the built-in implementation, mapping stdin lines
//! to events so the bot can be exercised without a chat platform.

use async_trait::async_trait;
use eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::event::{Command, Incoming, Reply, Sender};

/// Source of inbound events and sink for outbound replies
#[async_trait]
pub trait Transport: Send {
    /// Next inbound event; `None` means the transport is exhausted
    async fn next_event(&mut self) -> Result<Option<Incoming>>;

    /// Deliver a reply to the given chat
    async fn send(&mut self, chat_id: i64, reply: &Reply) -> Result<()>;
}

/// Interactive transport over stdin/stdout
///
/// Input convention: lines starting with `/` are commands, lines starting
/// with `>` are button presses (the text after `>` is the callback data),
/// anything else is free text.
pub struct ConsoleTransport {
    lines: Lines<BufReader<Stdin>>,
    sender: Sender,
}

impl ConsoleTransport {
    pub fn new(chat_id: i64) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            sender: Sender::new(chat_id),
        }
    }

    fn parse_line(&self, line: &str) -> Option<Incoming> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if let Some(data) = line.strip_prefix('>') {
            return Some(Incoming::callback(self.sender.clone(), data.trim()));
        }
        if line.starts_with('/') {
            return match Command::parse(line) {
                Some(command) => Some(Incoming::command(self.sender.clone(), command)),
                None => {
                    warn!(line, "Unknown command");
                    None
                }
            };
        }
        Some(Incoming::text(self.sender.clone(), line))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn next_event(&mut self) -> Result<Option<Incoming>> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(event) = self.parse_line(&line) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    async fn send(&mut self, _chat_id: i64, reply: &Reply) -> Result<()> {
        println!("{}", reply.text);
        if let Some(keyboard) = &reply.keyboard {
            for row in &keyboard.rows {
                let rendered: Vec<String> = row.iter().map(|b| format!("[{}  > {}]", b.label, b.data)).collect();
                println!("  {}", rendered.join(" "));
            }
        }
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Payload;

    fn transport() -> ConsoleTransport {
        ConsoleTransport::new(1)
    }

    #[test]
    fn test_parse_line_dispatch() {
        let t = transport();

        match t.parse_line("/start").map(|e| e.payload) {
            Some(Payload::Command(Command::Start)) => {}
            other => panic!("unexpected: {:?}", other),
        }

        match t.parse_line("> task_detail_3").map(|e| e.payload) {
            Some(Payload::Callback(data)) => assert_eq!(data, "task_detail_3"),
            other => panic!("unexpected: {:?}", other),
        }

        match t.parse_line("Buy milk").map(|e| e.payload) {
            Some(Payload::Text(text)) => assert_eq!(text, "Buy milk"),
            other => panic!("unexpected: {:?}", other),
        }

        assert!(t.parse_line("   ").is_none());
        assert!(t.parse_line("/bogus").is_none());
    }
}
