//! Module dedicated to IMAP request parsing.
//!
//! Requests have the shape `<tag> <COMMAND> <args…>`. Parsing is
//! whitespace-delimited with simple quote-stripping; multi-line
//! literal arguments are deliberately unsupported, this is a minimal
//! subset.

use super::error::{Error, Result};

/// A parsed IMAP request: the client tag plus the command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    /// The tag echoed back on every terminal response line.
    pub tag: String,

    /// The parsed command.
    pub command: Command,
}

/// A parsed IMAP command.
///
/// Illegal state/command combinations are rejected by the session
/// state machine, not by string comparison at dispatch time.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Capability,
    Noop,
    Login { username: String, password: String },
    Logout,
    List,
    Select { mailbox: String },
    /// A known command with unusable arguments.
    Invalid(&'static str),
    /// Anything this serving subset does not understand.
    Unknown(String),
}

impl Request {
    /// Parse a single request line, CRLF already stripped.
    pub fn parse(line: &str) -> Result<Request> {
        let mut parts = line.split_whitespace();

        let tag = parts.next().ok_or(Error::ParseRequestError)?.to_owned();
        let verb = parts
            .next()
            .ok_or(Error::ParseRequestError)?
            .to_ascii_uppercase();

        let command = match verb.as_str() {
            "CAPABILITY" => Command::Capability,
            "NOOP" => Command::Noop,
            "LOGIN" => match (parts.next(), parts.next()) {
                (Some(username), Some(password)) => Command::Login {
                    username: strip_quotes(username),
                    password: strip_quotes(password),
                },
                _ => Command::Invalid("Invalid arguments"),
            },
            "LOGOUT" => Command::Logout,
            "LIST" => Command::List,
            "SELECT" => match parts.next() {
                Some(mailbox) => Command::Select {
                    mailbox: strip_quotes(mailbox),
                },
                None => Command::Invalid("Invalid arguments"),
            },
            _ => Command::Unknown(verb),
        };

        Ok(Request { tag, command })
    }
}

fn strip_quotes(arg: &str) -> String {
    arg.replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_capability() {
        let req = Request::parse("a1 CAPABILITY").unwrap();
        assert_eq!(req.tag, "a1");
        assert_eq!(req.command, Command::Capability);
    }

    #[test]
    fn parse_login_strips_quotes() {
        let req = Request::parse("a2 LOGIN \"alice@example.com\" \"password\"").unwrap();
        assert_eq!(
            req.command,
            Command::Login {
                username: "alice@example.com".into(),
                password: "password".into(),
            }
        );
    }

    #[test]
    fn parse_login_with_missing_args_is_invalid() {
        let req = Request::parse("a3 LOGIN alice@example.com").unwrap();
        assert_eq!(req.command, Command::Invalid("Invalid arguments"));
    }

    #[test]
    fn parse_select_lowercase_verb() {
        let req = Request::parse("a4 select \"Inbox\"").unwrap();
        assert_eq!(
            req.command,
            Command::Select {
                mailbox: "Inbox".into()
            }
        );
    }

    #[test]
    fn parse_unknown_command() {
        let req = Request::parse("a5 FETCH 1:* FULL").unwrap();
        assert_eq!(req.command, Command::Unknown("FETCH".into()));
    }

    #[test]
    fn parse_empty_line_fails() {
        assert!(Request::parse("").is_err());
        assert!(Request::parse("a6").is_err());
    }
}
