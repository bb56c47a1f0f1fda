use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use msgat_attachments::{PluginOptions, ThreadLoad, UploadPolicy, LINKED_MESSAGE_META_KEY};
use msgat_config::load as load_config;
use msgat_database::{CreateAttachmentRequest, CreateMessageRequest};
use msgat_gateway::{create_gateway_state, create_router};
use msgat_runtime::{telemetry, BackendServices};
use serde_json::Value;
use sqlx::Row;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "msgat")]
#[command(about = "Attachment downloads for private message threads (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve,
    /// Dump threads, attachments and sessions from the database
    DumpData,
    /// Delete all threads, attachments and sessions
    ClearData,
    /// Seed the database with a demo thread, attachment and sessions
    SeedData,
    /// Print the file-type group of a file name or extension
    Classify {
        name: String,
    },
    /// Show the effective plugin options, optionally saving new values first
    Options {
        /// JSON object merged over the saved options
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::DumpData => dump_data().await,
        Commands::ClearData => clear_data().await,
        Commands::SeedData => seed_data().await,
        Commands::Classify { name } => classify(&name).await,
        Commands::Options { set } => options(set.as_deref()).await,
    }
}

async fn initialise() -> anyhow::Result<BackendServices> {
    let config = load_config().context("failed to load configuration")?;

    BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting msgat");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let state = create_gateway_state(
        services.access.clone(),
        services.sessions.clone(),
        Arc::clone(&services.classifier),
        services.plugin_options.clone(),
    );
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(msgat_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("msgat shut down");
    Ok(())
}

async fn dump_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    let services = initialise().await?;

    let thread_ids = services
        .threads
        .list_ids()
        .await
        .context("failed to fetch threads")?;

    println!("=== THREADS ===");
    if thread_ids.is_empty() {
        println!("No threads found in database");
    } else {
        println!("{:<8} {:<30} {:<10}", "ID", "Recipients", "Messages");
        println!("{}", "-".repeat(50));
        for thread_id in thread_ids {
            let Some(thread) = services
                .threads
                .find_by_id(thread_id, ThreadLoad::full())
                .await
                .with_context(|| format!("failed to load thread {thread_id}"))?
            else {
                continue;
            };
            let recipients = thread
                .participant_ids()
                .into_iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            println!(
                "{:<8} {:<30} {:<10}",
                thread.id,
                if recipients.is_empty() { "-" } else { recipients.as_str() },
                thread.messages.len()
            );
        }
    }

    let attachments = services
        .attachments
        .list()
        .await
        .context("failed to fetch attachments")?;

    println!("\n=== ATTACHMENTS ===");
    if attachments.is_empty() {
        println!("No attachments found in database");
    } else {
        println!(
            "{:<8} {:<12} {:<25} {:<10} {:<40}",
            "ID", "Type", "MIME", "Message", "Path"
        );
        println!("{}", "-".repeat(100));
        for attachment in attachments {
            let message_id = services
                .attachments
                .get_meta(attachment.id, LINKED_MESSAGE_META_KEY)
                .await
                .with_context(|| format!("failed to load metadata of attachment {}", attachment.id))?;
            println!(
                "{:<8} {:<12} {:<25} {:<10} {:<40}",
                attachment.id,
                attachment.entity_type,
                attachment.mime_type,
                message_id.as_deref().unwrap_or("-"),
                attachment.file_path
            );
        }
    }

    let sessions = sqlx::query("SELECT user_id, expires_at FROM sessions ORDER BY user_id ASC")
        .fetch_all(&services.db_pool)
        .await
        .context("failed to fetch sessions")?;

    println!("\n=== SESSIONS ===");
    println!("Found {} sessions", sessions.len());
    for session in sessions {
        let user_id: i64 = session.get("user_id");
        let expires_at: String = session.get("expires_at");
        println!("user {user_id:<6} expires {expires_at}");
    }

    Ok(())
}

async fn clear_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("clearing all data from database");

    let services = initialise().await?;

    // Recipients, messages and attachment meta cascade.
    let threads_deleted = sqlx::query("DELETE FROM message_threads")
        .execute(&services.db_pool)
        .await
        .context("failed to delete threads")?;

    let attachments_deleted = sqlx::query("DELETE FROM attachments")
        .execute(&services.db_pool)
        .await
        .context("failed to delete attachments")?;

    let sessions_deleted = sqlx::query("DELETE FROM sessions")
        .execute(&services.db_pool)
        .await
        .context("failed to delete sessions")?;

    println!("Database cleared:");
    println!("- {} threads deleted", threads_deleted.rows_affected());
    println!("- {} attachments deleted", attachments_deleted.rows_affected());
    println!("- {} sessions deleted", sessions_deleted.rows_affected());

    Ok(())
}

async fn seed_data() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("seeding database with test data");

    let services = initialise().await?;

    let file_name = "welcome.txt";
    let contents = "Files shared in this thread are only visible to its participants.\n";
    tokio::fs::write(services.attachments.upload_dir().join(file_name), contents)
        .await
        .context("failed to write demo attachment")?;

    let thread_id = services
        .threads
        .create(&[1, 2])
        .await
        .context("failed to create demo thread")?;

    let message = services
        .messages
        .create(&CreateMessageRequest {
            thread_id,
            sender_id: 1,
            subject: "Welcome".to_string(),
            message: "Here is the file we talked about.".to_string(),
        })
        .await
        .context("failed to create demo message")?;

    let attachment = services
        .attachments
        .create(&CreateAttachmentRequest::upload("text/plain", file_name))
        .await
        .context("failed to create demo attachment")?;

    services
        .attachments
        .link_to_message(attachment.id, message.id)
        .await
        .context("failed to link demo attachment")?;

    println!("Seeded thread {thread_id} with participants 1 and 2");
    println!(
        "Download path: /messages/{thread_id}/attachment/{}",
        attachment.id
    );

    for user_id in [1, 2, 3] {
        let session = services
            .sessions
            .create(user_id)
            .await
            .with_context(|| format!("failed to create session for user {user_id}"))?;
        println!("user {user_id}: Bearer {}", session.token);
    }

    Ok(())
}

async fn classify(name: &str) -> anyhow::Result<()> {
    let services = initialise().await?;
    let classifier = &services.classifier;

    let group = classifier.classify_name(name);
    let label = classifier.group_label(&group).unwrap_or_else(|| "Other".to_string());

    let policy = UploadPolicy::from_options(&services.plugin_options);
    let verdict = if policy.allows_name(name) {
        "allowed for upload"
    } else {
        "not allowed for upload"
    };

    println!("{name}: {group} ({label}), {verdict}");
    Ok(())
}

async fn options(set: Option<&str>) -> anyhow::Result<()> {
    let services = initialise().await?;
    let scope = services.option_scope;

    let effective = match set {
        Some(raw) => {
            let update: Value = serde_json::from_str(raw).context("--set expects a JSON object")?;
            anyhow::ensure!(update.is_object(), "--set expects a JSON object");

            let merged = services.plugin_options.merged_with(Some(&update));
            services
                .options_store
                .save_plugin_options(scope, &merged)
                .await
                .context("failed to save plugin options")?;
            merged
        }
        None => services.plugin_options.clone(),
    };

    print_options(scope.option_name(), &effective)
}

fn print_options(name: &str, options: &PluginOptions) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(&options.to_value())
        .context("failed to render plugin options")?;
    println!("{name}:\n{rendered}");
    Ok(())
}
