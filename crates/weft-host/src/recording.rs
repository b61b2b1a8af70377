//! Recording host for testing and development.
//!
//! Captures everything the driver performs and serves scripted replies to
//! input requests. Not meant for production hosts; kept public so
//! downstream crates can test workflows end to end without a terminal.

use std::collections::VecDeque;
use std::io;

use weft_types::Payload;

use crate::host::HostIo;

/// One performed host action, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Notify {
        level: String,
        message: String,
        payload: Option<Payload>,
    },
    Warning {
        message: String,
        payload: Option<Payload>,
    },
    Error {
        message: String,
        payload: Option<Payload>,
    },
    Debug {
        level: String,
        message: String,
        payload: Option<Payload>,
    },
    Custom {
        name: String,
        payload: Option<Payload>,
    },
    InputRequested {
        query: String,
        reply: String,
    },
    Banner(String),
    TransitionSeparator(usize),
}

/// In-memory host: records events, answers input requests from a queue.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Vec<HostEvent>,
    replies: VecDeque<String>,
    fail_inputs: bool,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues replies served to `request_input`, in order.
    pub fn with_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies = replies.into_iter().map(Into::into).collect();
        self
    }

    /// Makes every `request_input` fail, to exercise abort paths.
    pub fn with_failing_input(mut self) -> Self {
        self.fail_inputs = true;
        self
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<HostEvent> {
        self.events
    }
}

impl HostIo for RecordingHost {
    fn notify(&mut self, level: &str, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        self.events.push(HostEvent::Notify {
            level: level.to_string(),
            message: message.to_string(),
            payload: payload.cloned(),
        });
        Ok(())
    }

    fn warning(&mut self, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        self.events.push(HostEvent::Warning {
            message: message.to_string(),
            payload: payload.cloned(),
        });
        Ok(())
    }

    fn error(&mut self, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        self.events.push(HostEvent::Error {
            message: message.to_string(),
            payload: payload.cloned(),
        });
        Ok(())
    }

    fn debug(&mut self, level: &str, message: &str, payload: Option<&Payload>) -> io::Result<()> {
        self.events.push(HostEvent::Debug {
            level: level.to_string(),
            message: message.to_string(),
            payload: payload.cloned(),
        });
        Ok(())
    }

    fn custom(&mut self, name: &str, payload: Option<&Payload>) -> io::Result<()> {
        self.events.push(HostEvent::Custom {
            name: name.to_string(),
            payload: payload.cloned(),
        });
        Ok(())
    }

    fn request_input(&mut self, query: &str) -> io::Result<String> {
        if self.fail_inputs {
            return Err(io::Error::other("input unavailable"));
        }
        let reply = self
            .replies
            .pop_front()
            .ok_or_else(|| io::Error::other("no scripted reply left"))?;
        self.events.push(HostEvent::InputRequested {
            query: query.to_string(),
            reply: reply.clone(),
        });
        Ok(reply)
    }

    fn banner(&mut self, text: &str) -> io::Result<()> {
        self.events.push(HostEvent::Banner(text.to_string()));
        Ok(())
    }

    fn transition_separator(&mut self, count: usize) -> io::Result<()> {
        self.events.push(HostEvent::TransitionSeparator(count));
        Ok(())
    }
}
