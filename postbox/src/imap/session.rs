//! Module dedicated to IMAP session state management.
//!
//! One session per connection, walking NotAuthenticated →
//! Authenticated → Selected; Logout is terminal from any state. The
//! session owns the state transitions, so an illegal state/command
//! pair can only produce a tagged error response, never a wrong
//! transition.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use super::command::{Command, Request};
use crate::{
    account::User,
    folder::Folder,
    storage::{self, RecordStore},
};

/// The capability list announced in the greeting and CAPABILITY
/// responses.
pub const CAPABILITIES: &str = "IMAP4rev1 AUTH=PLAIN";

/// The flag vocabulary announced on SELECT.
const FLAGS: &str = "\\Answered \\Flagged \\Deleted \\Seen \\Draft";

/// The IMAP session state.
#[derive(Clone, Debug, Default)]
pub enum State {
    /// No identity established yet.
    #[default]
    NotAuthenticated,
    /// LOGIN succeeded for the given user.
    Authenticated { user: User },
    /// A folder is selected on top of the authenticated identity.
    Selected { user: User, folder: Folder },
}

impl State {
    fn user(&self) -> Option<&User> {
        match self {
            Self::NotAuthenticated => None,
            Self::Authenticated { user } => Some(user),
            Self::Selected { user, .. } => Some(user),
        }
    }
}

/// The response lines produced by one request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Response {
    /// The untagged and tagged lines, in write order.
    pub lines: Vec<String>,

    /// Whether the connection closes after writing.
    pub close: bool,
}

impl Response {
    fn line(line: impl ToString) -> Self {
        Self {
            lines: vec![line.to_string()],
            close: false,
        }
    }

    fn lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            close: false,
        }
    }

    fn closing(lines: Vec<String>) -> Self {
        Self { lines, close: true }
    }
}

/// The state of a single IMAP connection.
pub struct ImapSession {
    records: Arc<dyn RecordStore>,
    hostname: String,
    state: State,
}

impl ImapSession {
    pub fn new(records: Arc<dyn RecordStore>, hostname: impl ToString) -> Self {
        Self {
            records,
            hostname: hostname.to_string(),
            state: State::default(),
        }
    }

    /// The banner sent when the connection opens.
    pub fn greeting(&self) -> String {
        format!(
            "* OK [CAPABILITY {CAPABILITIES}] {} IMAP4rev1 Service Ready",
            self.hostname
        )
    }

    /// The current session state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Consume one request line and produce the response lines.
    ///
    /// Internal failures never leak over the wire: they are logged
    /// and answered with a tagged `NO Internal error`.
    pub async fn handle_line(&mut self, line: &str) -> Response {
        let req = match Request::parse(line) {
            Ok(req) => req,
            Err(err) => {
                debug!("cannot parse imap request: {err}");
                return Response::line("* BAD Invalid request");
            }
        };

        let tag = req.tag.clone();

        match self.handle(req).await {
            Ok(res) => res,
            Err(err) => {
                warn!("imap command failed: {err}");
                debug!("{err:?}");
                Response::line(format!("{tag} NO Internal error"))
            }
        }
    }

    async fn handle(&mut self, req: Request) -> storage::Result<Response> {
        let Request { tag, command } = req;

        Ok(match command {
            Command::Capability => Response::lines(vec![
                format!("* CAPABILITY {CAPABILITIES}"),
                format!("{tag} OK CAPABILITY completed"),
            ]),

            Command::Noop => Response::line(format!("{tag} OK NOOP completed")),

            Command::Login { username, password } => {
                if !matches!(self.state, State::NotAuthenticated) {
                    return Ok(Response::line(format!(
                        "{tag} BAD LOGIN not allowed in current state"
                    )));
                }

                match self.authenticate(&username, &password).await? {
                    Some(user) => {
                        debug!(user = %user.email, "imap client logged in");
                        self.state = State::Authenticated { user };
                        Response::line(format!("{tag} OK [CAPABILITY {CAPABILITIES}] LOGIN completed"))
                    }
                    None => Response::line(format!(
                        "{tag} NO [AUTHENTICATIONFAILED] Invalid credentials"
                    )),
                }
            }

            Command::Logout => Response::closing(vec![
                String::from("* BYE IMAP4rev1 Server logging out"),
                format!("{tag} OK LOGOUT completed"),
            ]),

            Command::List => match self.state.user() {
                None => Response::line(format!("{tag} NO Not authenticated")),
                Some(user) => {
                    let folders = self.records.list_folders(&user.id).await?;

                    let mut lines: Vec<String> = folders
                        .iter()
                        .map(|folder| {
                            format!("* LIST (\\HasNoChildren) \"/\" \"{}\"", folder.name)
                        })
                        .collect();
                    lines.push(format!("{tag} OK LIST completed"));

                    Response::lines(lines)
                }
            },

            Command::Select { mailbox } => match self.state.user().cloned() {
                None => Response::line(format!("{tag} NO Not authenticated")),
                Some(user) => {
                    let folder = self.records.find_folder_by_name(&user.id, &mailbox).await?;

                    match folder {
                        None => Response::line(format!("{tag} NO Folder not found")),
                        Some(folder) => {
                            let count = self.records.count_messages(&folder.id).await?;
                            let uid_validity = Utc::now().timestamp();

                            let lines = vec![
                                format!("* {count} EXISTS"),
                                format!("* {count} RECENT"),
                                String::from("* OK [UNSEEN 0] Message 0 is first unseen"),
                                format!("* OK [UIDVALIDITY {uid_validity}] UIDs valid"),
                                format!("* FLAGS ({FLAGS})"),
                                format!("{tag} OK [READ-WRITE] SELECT completed"),
                            ];

                            self.state = State::Selected { user, folder };
                            Response::lines(lines)
                        }
                    }
                }
            },

            Command::Invalid(reason) => Response::line(format!("{tag} BAD {reason}")),

            Command::Unknown(_) => Response::line(format!("{tag} BAD Command not understood")),
        })
    }

    async fn authenticate(&self, username: &str, password: &str) -> storage::Result<Option<User>> {
        let user = self.records.find_user_by_email(username).await?;

        Ok(user.filter(|user| user.check_password(password).is_ok()))
    }
}
