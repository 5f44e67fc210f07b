use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use postbox::{
    folder::FolderKind,
    smtp::{SmtpConfig, SmtpServer, SmtpServerHandle},
    storage::{
        self,
        memory::{MemoryBlobStore, MemoryRecordStore},
        BlobStore, RecordStore,
    },
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
    blobs: Arc<MemoryBlobStore>,
    handle: SmtpServerHandle,
}

async fn start_server(config: SmtpConfig) -> TestServer {
    let records = Arc::new(MemoryRecordStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());

    let config = SmtpConfig {
        bind_addr: "127.0.0.1:0".into(),
        ..config
    };

    let handle = SmtpServer::new(config, records.clone(), blobs.clone())
        .bind()
        .await
        .unwrap();

    TestServer {
        addr: handle.local_addr,
        records,
        blobs,
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
        assert!(greeting.starts_with("220"), "greeting was {greeting}");

        client
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).await.unwrap();
        line.trim_end().to_owned()
    }

    async fn write_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn send(&mut self, line: &str) -> String {
        self.write_line(line).await;
        self.read_line().await
    }

    /// Send a command and drain a possibly multiline reply; returns
    /// every reply line.
    async fn send_multi(&mut self, line: &str) -> Vec<String> {
        self.write_line(line).await;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await;
            let done = line.len() >= 4 && line.as_bytes()[3] == b' ';
            lines.push(line);
            if done {
                break;
            }
        }
        lines
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn ingestion_fans_in_to_every_local_recipient() {
    let server = start_server(SmtpConfig::default()).await;
    let bob = server.records.seed_user("bob@example.com", "bob", "d1").await;
    let carol = server
        .records
        .seed_user("carol@example.com", "carol", "d1")
        .await;

    let mut client = Client::connect(server.addr).await;
    assert!(client.send("HELO peer.example.org").await.starts_with("250"));
    assert!(client.send("MAIL FROM:<alice@remote.org>").await.starts_with("250"));
    assert!(client.send("RCPT TO:<bob@example.com>").await.starts_with("250"));
    assert!(client.send("RCPT TO:<carol@example.com>").await.starts_with("250"));
    assert!(client.send("RCPT TO:<dave@elsewhere.org>").await.starts_with("250"));
    assert!(client.send("DATA").await.starts_with("354"));

    client.write_line("Subject: fan in").await;
    client.write_line("From: alice@remote.org").await;
    client.write_line("").await;
    client.write_line("hello both").await;
    let reply = client.send(".").await;
    assert!(reply.starts_with("250"), "final reply was {reply}");

    let bob_inbox = server
        .records
        .find_folder_by_kind(&bob.id, &FolderKind::Inbox)
        .await
        .unwrap()
        .unwrap();
    let carol_inbox = server
        .records
        .find_folder_by_kind(&carol.id, &FolderKind::Inbox)
        .await
        .unwrap()
        .unwrap();

    let bob_msgs = server.records.list_messages(&bob_inbox.id).await.unwrap();
    let carol_msgs = server.records.list_messages(&carol_inbox.id).await.unwrap();
    assert_eq!(bob_msgs.len(), 1);
    assert_eq!(carol_msgs.len(), 1);

    // One blob, N rows.
    assert_eq!(bob_msgs[0].storage_key, carol_msgs[0].storage_key);
    assert_eq!(bob_msgs[0].subject, "fan in");
    assert!(!bob_msgs[0].is_read());

    // Round-trip: the stored blob is the exact raw message.
    let raw = server.blobs.get(&bob_msgs[0].storage_key).await.unwrap();
    assert_eq!(
        raw,
        b"Subject: fan in\r\nFrom: alice@remote.org\r\n\r\nhello both\r\n"
    );
    assert_eq!(bob_msgs[0].size, raw.len());

    server.handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn ingestion_without_local_match_still_succeeds() {
    let server = start_server(SmtpConfig::default()).await;
    let bob = server.records.seed_user("bob@example.com", "bob", "d1").await;

    let mut client = Client::connect(server.addr).await;
    client.send("HELO peer.example.org").await;
    client.send("MAIL FROM:<alice@remote.org>").await;
    client.send("RCPT TO:<nobody@elsewhere.org>").await;
    client.send("DATA").await;
    client.write_line("Subject: nobody home").await;
    client.write_line("").await;
    client.write_line("hi").await;

    let reply = client.send(".").await;
    assert!(reply.starts_with("250"), "final reply was {reply}");

    let inbox = server
        .records
        .find_folder_by_kind(&bob.id, &FolderKind::Inbox)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(server.records.count_messages(&inbox.id).await.unwrap(), 0);

    server.handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn auth_plain_accepts_valid_and_rejects_invalid_credentials() {
    let server = start_server(SmtpConfig::default()).await;
    server.records.seed_user("alice@example.com", "password", "d1").await;

    let mut client = Client::connect(server.addr).await;
    let ehlo = client.send_multi("EHLO peer.example.org").await;
    assert!(ehlo.iter().any(|line| line.contains("AUTH PLAIN LOGIN")));

    // base64("\0alice@example.com\0password")
    let reply = client
        .send("AUTH PLAIN AGFsaWNlQGV4YW1wbGUuY29tAHBhc3N3b3Jk")
        .await;
    assert!(reply.starts_with("235"), "auth reply was {reply}");

    let mut other = Client::connect(server.addr).await;
    other.send_multi("EHLO peer.example.org").await;

    // base64("\0alice@example.com\0nope")
    let reply = other
        .send("AUTH PLAIN AGFsaWNlQGV4YW1wbGUuY29tAG5vcGU=")
        .await;
    assert!(reply.starts_with("535"), "auth reply was {reply}");

    server.handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn commands_out_of_sequence_are_rejected() {
    let server = start_server(SmtpConfig::default()).await;

    let mut client = Client::connect(server.addr).await;
    assert!(client.send("MAIL FROM:<a@b.org>").await.starts_with("503"));
    assert!(client.send("DATA").await.starts_with("503"));
    assert!(client.send("BDAT 42").await.starts_with("500"));
    assert!(client.send("VRFY alice").await.starts_with("502"));
    assert!(client.send("QUIT").await.starts_with("221"));

    server.handle.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_message_is_rejected_with_552() {
    let server = start_server(SmtpConfig {
        max_message_size: 64,
        ..Default::default()
    })
    .await;

    let mut client = Client::connect(server.addr).await;
    client.send("HELO peer.example.org").await;
    client.send("MAIL FROM:<a@b.org>").await;
    client.send("RCPT TO:<x@y.org>").await;
    client.send("DATA").await;

    client
        .write_line(&"x".repeat(200))
        .await;
    let reply = client.send(".").await;
    assert!(reply.starts_with("552"), "final reply was {reply}");

    server.handle.stop();
}

struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn init(&self) -> storage::Result<()> {
        Ok(())
    }

    async fn put(&self, key: &str, _bytes: &[u8]) -> storage::Result<()> {
        Err(storage::Error::WriteBlobError(key.to_owned()))
    }

    async fn get(&self, key: &str) -> storage::Result<Vec<u8>> {
        Err(storage::Error::ReadBlobError(key.to_owned()))
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn blob_write_failure_is_a_transient_rejection() {
    let records = Arc::new(MemoryRecordStore::new());
    let bob = records.seed_user("bob@example.com", "bob", "d1").await;

    let handle = SmtpServer::new(
        SmtpConfig {
            bind_addr: "127.0.0.1:0".into(),
            ..Default::default()
        },
        records.clone(),
        Arc::new(FailingBlobStore),
    )
    .bind()
    .await
    .unwrap();

    let mut client = Client::connect(handle.local_addr).await;
    client.send("HELO peer.example.org").await;
    client.send("MAIL FROM:<alice@remote.org>").await;
    client.send("RCPT TO:<bob@example.com>").await;
    client.send("DATA").await;
    client.write_line("Subject: doomed").await;
    client.write_line("").await;
    client.write_line("hi").await;

    let reply = client.send(".").await;
    assert!(reply.starts_with("451"), "final reply was {reply}");

    // No row may exist without a durable blob behind it.
    let inbox = records
        .find_folder_by_kind(&bob.id, &FolderKind::Inbox)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(records.count_messages(&inbox.id).await.unwrap(), 0);

    handle.stop();
}
