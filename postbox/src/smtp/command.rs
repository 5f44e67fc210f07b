//! Module dedicated to SMTP command parsing.
//!
//! Commands are parsed into a tagged-variant type before dispatch so
//! the session state machine never branches on raw strings.

use std::result;

use thiserror::Error;

/// The `Result` alias of the module.
pub type Result<T> = result::Result<T, Error>;

/// The command parsing `Error` enum.
#[derive(Debug, Error)]
pub enum Error {
    #[error("missing {0} argument")]
    MissingArgumentError(&'static str),
    #[error("invalid {0} argument")]
    ParseArgumentError(&'static str),
}

/// A parsed SMTP command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Helo(String),
    Ehlo(String),
    Auth {
        mechanism: String,
        initial: Option<String>,
    },
    /// MAIL FROM with the extracted reverse-path, possibly empty for
    /// the null sender.
    Mail(String),
    /// RCPT TO with the extracted forward-path.
    Rcpt(String),
    Data,
    Rset,
    Noop,
    Quit,
    /// A syntactically valid command this intake deliberately does
    /// not implement.
    NotImplemented(String),
    Unknown(String),
}

impl Command {
    /// Parse a single command line, CRLF already stripped.
    pub fn parse(line: &str) -> Result<Command> {
        let (verb, args) = match line.split_once(' ') {
            Some((verb, args)) => (verb, args.trim()),
            None => (line, ""),
        };

        match verb.to_ascii_uppercase().as_str() {
            "HELO" => match args {
                "" => Err(Error::MissingArgumentError("HELO")),
                domain => Ok(Command::Helo(domain.to_owned())),
            },
            "EHLO" => match args {
                "" => Err(Error::MissingArgumentError("EHLO")),
                domain => Ok(Command::Ehlo(domain.to_owned())),
            },
            "AUTH" => {
                let mut parts = args.split_whitespace();
                let mechanism = parts
                    .next()
                    .ok_or(Error::MissingArgumentError("AUTH"))?
                    .to_ascii_uppercase();
                let initial = parts.next().map(ToOwned::to_owned);
                Ok(Command::Auth { mechanism, initial })
            }
            "MAIL" => Ok(Command::Mail(parse_path(args, "FROM:", "MAIL")?)),
            "RCPT" => {
                let path = parse_path(args, "TO:", "RCPT")?;
                if path.is_empty() {
                    return Err(Error::ParseArgumentError("RCPT"));
                }
                Ok(Command::Rcpt(path))
            }
            "DATA" => Ok(Command::Data),
            "RSET" => Ok(Command::Rset),
            "NOOP" => Ok(Command::Noop),
            "QUIT" => Ok(Command::Quit),
            "VRFY" | "EXPN" | "HELP" | "STARTTLS" => {
                Ok(Command::NotImplemented(verb.to_ascii_uppercase()))
            }
            verb => Ok(Command::Unknown(verb.to_owned())),
        }
    }
}

/// Extract the address from a `FROM:<path>` or `TO:<path>` argument.
fn parse_path(args: &str, prefix: &str, cmd: &'static str) -> Result<String> {
    let rest = args
        .trim()
        .strip_prefix_ignore_case(prefix)
        .ok_or(Error::ParseArgumentError(cmd))?
        .trim();

    let path = rest
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(rest);

    Ok(path.trim().to_owned())
}

trait StripPrefixIgnoreCase {
    fn strip_prefix_ignore_case<'a>(&'a self, prefix: &str) -> Option<&'a str>;
}

impl StripPrefixIgnoreCase for str {
    fn strip_prefix_ignore_case<'a>(&'a self, prefix: &str) -> Option<&'a str> {
        // An ASCII prefix match guarantees the split lands on a char
        // boundary.
        if self.len() >= prefix.len()
            && self.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
        {
            Some(&self[prefix.len()..])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mail_from() {
        assert_eq!(
            Command::parse("MAIL FROM:<alice@example.com>").unwrap(),
            Command::Mail("alice@example.com".into())
        );
    }

    #[test]
    fn parse_null_sender() {
        assert_eq!(Command::parse("MAIL FROM:<>").unwrap(), Command::Mail(String::new()));
    }

    #[test]
    fn parse_rcpt_to_case_insensitive() {
        assert_eq!(
            Command::parse("rcpt to:<bob@example.com>").unwrap(),
            Command::Rcpt("bob@example.com".into())
        );
    }

    #[test]
    fn parse_rcpt_without_path_fails() {
        assert!(Command::parse("RCPT TO:<>").is_err());
        assert!(Command::parse("RCPT").is_err());
    }

    #[test]
    fn parse_auth_with_initial_response() {
        assert_eq!(
            Command::parse("AUTH PLAIN AGFsaWNlAHBhc3N3b3Jk").unwrap(),
            Command::Auth {
                mechanism: "PLAIN".into(),
                initial: Some("AGFsaWNlAHBhc3N3b3Jk".into()),
            }
        );
    }

    #[test]
    fn parse_unknown_command() {
        assert_eq!(
            Command::parse("BDAT 86").unwrap(),
            Command::Unknown("BDAT".into())
        );
    }

    #[test]
    fn parse_not_implemented_command() {
        assert_eq!(
            Command::parse("VRFY alice").unwrap(),
            Command::NotImplemented("VRFY".into())
        );
    }
}
