//! The `postbox` binary: builds the configuration from the
//! environment, wires the in-memory reference stores to the SMTP and
//! IMAP listeners and the delivery worker, then runs until ctrl-c.

use std::{env, error::Error, sync::Arc};

use postbox::{
    imap::{ImapConfig, ImapServer},
    mailer::{Mailer, MailerConfig},
    queue::{memory::MemoryQueue, DeliveryQueue},
    smtp::{SmtpConfig, SmtpServer},
    storage::{
        memory::{MemoryBlobStore, MemoryRecordStore},
        BlobStore,
    },
    worker::Worker,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "postbox=info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let records = Arc::new(MemoryRecordStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    blobs.init().await?;

    // The reference record store is volatile, so provision one
    // account at startup the way the admin surface would.
    let email = var_or("POSTBOX_USER_EMAIL", "admin@localhost");
    let password = var_or("POSTBOX_USER_PASSWORD", "admin");
    let user = records.seed_user(&email, &password, "localhost").await;
    info!(user = %user.email, "provisioned startup account");

    let queue = Arc::new(MemoryQueue::new());
    let mailer = Arc::new(Mailer::new());

    match env::var("POSTBOX_RELAY_HOST") {
        Ok(host) => {
            let config = MailerConfig {
                host,
                port: env::var("POSTBOX_RELAY_PORT")
                    .ok()
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(2525),
                tls: env::var("POSTBOX_RELAY_TLS").is_ok_and(|tls| tls == "true"),
                login: env::var("POSTBOX_RELAY_LOGIN").ok(),
                passwd: env::var("POSTBOX_RELAY_PASSWD").ok(),
                default_from: var_or("POSTBOX_DEFAULT_FROM", &MailerConfig::default_from()),
            };
            mailer.init(config).await?;
        }
        Err(_) => warn!("no relay configured, outbound sending disabled"),
    }

    let smtp_config = SmtpConfig {
        bind_addr: var_or("POSTBOX_SMTP_BIND", &SmtpConfig::default_bind_addr()),
        hostname: var_or("POSTBOX_HOSTNAME", &SmtpConfig::default_hostname()),
        ..Default::default()
    };

    let imap_config = ImapConfig {
        bind_addr: var_or("POSTBOX_IMAP_BIND", &ImapConfig::default_bind_addr()),
        hostname: var_or("POSTBOX_HOSTNAME", &ImapConfig::default_hostname()),
    };

    let smtp = SmtpServer::new(smtp_config, records.clone(), blobs.clone())
        .bind()
        .await?;
    let imap = ImapServer::new(imap_config, records.clone()).bind().await?;

    let worker = Worker::new(queue.clone(), records, blobs, mailer).spawn();

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    smtp.stop();
    imap.stop();
    queue.close().await;
    worker.await?;

    Ok(())
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}
