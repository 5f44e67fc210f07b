use std::{net::SocketAddr, sync::Arc};

use postbox::{
    folder::FolderKind,
    imap::{ImapConfig, ImapServer, ImapServerHandle},
    message::{self, Message},
    storage::{memory::MemoryRecordStore, RecordStore},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};

struct TestServer {
    addr: SocketAddr,
    records: Arc<MemoryRecordStore>,
    handle: ImapServerHandle,
}

async fn start_server() -> TestServer {
    let records = Arc::new(MemoryRecordStore::new());

    let handle = ImapServer::new(
        ImapConfig {
            bind_addr: "127.0.0.1:0".into(),
            ..Default::default()
        },
        records.clone(),
    )
    .bind()
    .await
    .unwrap();

    TestServer {
        addr: handle.local_addr,
        records,
        handle,
    }
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };

        let greeting = client.read_line().await;
        assert!(
            greeting.starts_with("* OK [CAPABILITY"),
            "greeting was {greeting}"
        );

        client
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_owned()
    }

    /// Send a request and read lines until the tagged terminal
    /// response shows up.
    async fn send(&mut self, tag: &str, request: &str) -> Vec<String> {
        self.writer
            .write_all(format!("{tag} {request}\r\n").as_bytes())
            .await
            .unwrap();

        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await;
            let done = line.starts_with(tag);
            lines.push(line);
            if done {
                break;
            }
        }
        lines
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn serving_session_walks_the_full_state_machine() {
    let server = start_server().await;
    let user = server
        .records
        .seed_user("alice@example.com", "password", "d1")
        .await;

    // One stored message so SELECT has something to report.
    let inbox = server
        .records
        .find_folder_by_kind(&user.id, &FolderKind::Inbox)
        .await
        .unwrap()
        .unwrap();
    let raw = b"From: bob@remote.org\r\nSubject: hi\r\n\r\nhello\r\n";
    let meta = message::parse_metadata(raw).unwrap();
    server
        .records
        .create_message(&Message::new(&user.id, &inbox.id, meta, "k1.eml", raw.len()))
        .await
        .unwrap();

    let mut client = Client::connect(server.addr).await;

    let res = client.send("a1", "CAPABILITY").await;
    assert_eq!(res[0], "* CAPABILITY IMAP4rev1 AUTH=PLAIN");
    assert_eq!(res[1], "a1 OK CAPABILITY completed");

    // Every terminal line echoes the request tag.
    let res = client.send("a2", "LIST \"\" \"*\"").await;
    assert_eq!(res.last().unwrap(), "a2 NO Not authenticated");

    let res = client
        .send("a3", "LOGIN \"alice@example.com\" \"password\"")
        .await;
    assert!(res[0].starts_with("a3 OK [CAPABILITY"), "login reply was {}", res[0]);

    let res = client.send("a4", "LIST \"\" \"*\"").await;
    assert_eq!(res.len(), 6);
    assert!(res.contains(&"* LIST (\\HasNoChildren) \"/\" \"Sent\"".to_string()));
    assert_eq!(res.last().unwrap(), "a4 OK LIST completed");

    let res = client.send("a5", "SELECT \"Inbox\"").await;
    assert_eq!(res[0], "* 1 EXISTS");
    assert_eq!(res[1], "* 1 RECENT");
    assert!(res[3].starts_with("* OK [UIDVALIDITY"));
    assert_eq!(res[4], "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)");
    assert_eq!(res.last().unwrap(), "a5 OK [READ-WRITE] SELECT completed");

    let res = client.send("a6", "SELECT \"Archive\"").await;
    assert_eq!(res, ["a6 NO Folder not found"]);

    let res = client.send("a7", "FETCH 1:* FULL").await;
    assert_eq!(res, ["a7 BAD Command not understood"]);

    let res = client.send("a8", "LOGOUT").await;
    assert_eq!(res[0], "* BYE IMAP4rev1 Server logging out");
    assert_eq!(res[1], "a8 OK LOGOUT completed");

    server.handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn login_failure_over_the_wire_reports_authenticationfailed() {
    let server = start_server().await;
    server
        .records
        .seed_user("alice@example.com", "password", "d1")
        .await;

    let mut client = Client::connect(server.addr).await;

    let res = client
        .send("a1", "LOGIN \"alice@example.com\" \"wrong\"")
        .await;
    assert_eq!(res, ["a1 NO [AUTHENTICATIONFAILED] Invalid credentials"]);

    // The session is still usable and not authenticated.
    let res = client.send("a2", "LIST \"\" \"*\"").await;
    assert_eq!(res, ["a2 NO Not authenticated"]);

    server.handle.stop();
}
