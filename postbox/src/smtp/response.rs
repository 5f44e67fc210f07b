//! Module dedicated to SMTP replies.

use std::fmt;

/// An SMTP reply, optionally multiline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    /// The reply code.
    pub code: u16,

    /// The first (or only) reply line.
    pub text: String,

    /// Additional lines for multiline replies, rendered with the
    /// dash separator on every line but the last.
    pub extra: Vec<String>,
}

impl Reply {
    pub fn new(code: u16, text: impl ToString) -> Self {
        Self {
            code,
            text: text.to_string(),
            extra: Vec::new(),
        }
    }

    pub fn greeting(hostname: &str) -> Self {
        Self::new(220, format!("{hostname} ESMTP service ready"))
    }

    pub fn ok() -> Self {
        Self::new(250, "OK")
    }

    pub fn helo(hostname: &str, client: &str) -> Self {
        Self::new(250, format!("{hostname} greets {client}"))
    }

    pub fn ehlo(hostname: &str, client: &str, max_message_size: usize) -> Self {
        Self {
            code: 250,
            text: format!("{hostname} greets {client}"),
            extra: vec![
                String::from("AUTH PLAIN LOGIN"),
                format!("SIZE {max_message_size}"),
            ],
        }
    }

    pub fn auth_succeeded() -> Self {
        Self::new(235, "Authentication succeeded")
    }

    pub fn auth_continue(prompt: &str) -> Self {
        Self::new(334, prompt)
    }

    pub fn auth_failed() -> Self {
        Self::new(535, "Authentication credentials invalid")
    }

    pub fn auth_required() -> Self {
        Self::new(530, "Authentication required")
    }

    pub fn data_start() -> Self {
        Self::new(354, "End data with <CR><LF>.<CR><LF>")
    }

    pub fn accepted() -> Self {
        Self::new(250, "OK message accepted for delivery")
    }

    pub fn transient_failure() -> Self {
        Self::new(451, "Requested action aborted: local error in processing")
    }

    pub fn bye() -> Self {
        Self::new(221, "Bye")
    }

    pub fn unrecognized() -> Self {
        Self::new(500, "Syntax error, command unrecognized")
    }

    pub fn syntax_error(text: &str) -> Self {
        Self::new(501, format!("Syntax error: {text}"))
    }

    pub fn not_implemented() -> Self {
        Self::new(502, "Command not implemented")
    }

    pub fn bad_sequence(text: &str) -> Self {
        Self::new(503, format!("Bad sequence of commands: {text}"))
    }

    pub fn too_large(max: usize) -> Self {
        Self::new(552, format!("Message exceeds maximum size of {max} bytes"))
    }

    /// Return `true` if the reply is a success (2xx).
    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.extra.is_empty() {
            return write!(f, "{} {}\r\n", self.code, self.text);
        }

        write!(f, "{}-{}\r\n", self.code, self.text)?;

        for (i, line) in self.extra.iter().enumerate() {
            if i + 1 == self.extra.len() {
                write!(f, "{} {line}\r\n", self.code)?;
            } else {
                write!(f, "{}-{line}\r\n", self.code)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_single_line_reply() {
        assert_eq!(Reply::ok().to_string(), "250 OK\r\n");
    }

    #[test]
    fn render_multiline_reply() {
        let reply = Reply::ehlo("mx.example.com", "client.local", 1024);
        assert_eq!(
            reply.to_string(),
            "250-mx.example.com greets client.local\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1024\r\n"
        );
    }
}
