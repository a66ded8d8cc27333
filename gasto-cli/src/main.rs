use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use gasto_core::{ensure_valid_date, AudioAttachment, DateResolver, SubmitRequest};
use gasto_parse::{BankNotificationParser, ParsedNotification, SmartInputParser};
use gasto_sync::{
    ApiClient, DrainOutcome, DrainScheduler, HttpProbe, QueueProcessor, QueueStore,
    SubmissionCoordinator, SubmitOutcome, DRAIN_INTERVAL,
};
use std::path::PathBuf;
use std::sync::Arc;

mod auth;
mod config;
mod state;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GASTO_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "gasto", version = VERSION, about = "Expense capture with an offline-first submission queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse free text into a structured expense candidate
    Parse {
        /// Input text, e.g. "22,50 picolés no C6 da Bruna"
        text: String,
    },

    /// Parse a bank push notification, optionally submitting the result
    Notify {
        #[arg(long)]
        title: String,

        #[arg(long)]
        body: String,

        /// Source app package id, e.g. com.c6bank.app
        #[arg(long)]
        app: String,

        /// Submit the parsed transaction instead of just printing it
        #[arg(long)]
        submit: bool,
    },

    /// Submit an expense (text and/or audio), queueing it on failure
    Submit(SubmitArgs),

    /// Inspect and drive the offline queue
    Queue {
        #[command(subcommand)]
        command: QueueCommand,
    },

    /// Run the periodic drain loop in the foreground
    Watch,

    /// Card, user and destination registries
    Registry {
        #[command(subcommand)]
        command: RegistryCommand,
    },

    /// Configuration at ~/.gasto/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// API credentials at ~/.gasto/auth.json
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Free text, e.g. "mercado 89,90 no C6"
    #[arg(long)]
    text: Option<String>,

    /// Path to an audio note
    #[arg(long)]
    audio: Option<PathBuf>,

    /// MIME type for --audio
    #[arg(long, default_value = "audio/m4a")]
    mime: String,

    /// Card id; overrides the configured default
    #[arg(long)]
    card: Option<String>,

    /// Destination id; repeat for several
    #[arg(long = "dest", value_name = "ID")]
    destinations: Vec<String>,

    /// Expense date, RFC 3339 or YYYY-MM-DD; anything else falls back to now
    #[arg(long)]
    date: Option<String>,

    #[arg(long, requires = "longitude")]
    latitude: Option<f64>,

    #[arg(long, requires = "latitude")]
    longitude: Option<f64>,

    /// Keep it local as a draft instead of sending
    #[arg(long)]
    draft: bool,
}

#[derive(Subcommand, Debug)]
enum QueueCommand {
    /// List pending submissions
    List,

    /// Walk the queue once, now
    Drain,

    /// Reset a dead-lettered submission's retry budget and drain
    Retry { id: String },

    /// Drop a submission from the queue
    Remove { id: String },

    /// Drop everything, drafts included
    Clear,
}

#[derive(Subcommand, Debug)]
enum RegistryCommand {
    /// Fetch registries from the backend and cache them under ~/.gasto/
    Pull,

    /// Print the cached registries
    Show,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,

    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste and store the API bearer token
    PasteToken,

    /// Forget the stored token
    Clear,

    /// Show whether a token is stored
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_env("GASTO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Parse { text } => {
            parse_text(&text)?;
        }

        Command::Notify {
            title,
            body,
            app,
            submit,
        } => {
            notify(&title, &body, &app, submit).await?;
        }

        Command::Submit(args) => {
            submit_expense(args).await?;
        }

        Command::Queue { command } => {
            queue(command).await?;
        }

        Command::Watch => {
            watch().await?;
        }

        Command::Registry { command } => {
            registry(command).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteToken => auth::paste_token()?,
            AuthCommand::Clear => auth::clear_token()?,
            AuthCommand::Status => auth::status()?,
        },
    }

    Ok(())
}

struct Services {
    client: Arc<ApiClient>,
    processor: Arc<QueueProcessor<ApiClient, HttpProbe>>,
    coordinator: SubmissionCoordinator<ApiClient, HttpProbe>,
}

fn build_services(cfg: &config::Config) -> Result<Services> {
    let auth = auth::load_auth()?;

    let mut client = ApiClient::new(cfg.api.base_url.clone())?;
    if let Some(token) = auth.api_token {
        client = client.with_token(token);
    }
    let client = Arc::new(client);

    let probe = Arc::new(HttpProbe::new(cfg.api.base_url.clone())?);
    let store = QueueStore::new(state::queue_path()?);
    let processor = Arc::new(QueueProcessor::new(store, Arc::clone(&client), probe));
    let coordinator = SubmissionCoordinator::new(Arc::clone(&processor), Arc::clone(&client))
        .with_default_card(cfg.defaults.card_id.clone())
        .draft_only(cfg.defaults.draft_only);

    Ok(Services {
        client,
        processor,
        coordinator,
    })
}

fn parse_text(text: &str) -> Result<()> {
    let cfg = config::load_config()?;
    let registry = state::read_registry()?;
    let resolver = DateResolver::from_name(&cfg.defaults.timezone)
        .with_context(|| format!("unknown timezone in config: {}", cfg.defaults.timezone))?;

    let parser = SmartInputParser::new(resolver);
    let parsed = parser.parse(text, &registry.cards, &registry.users, Utc::now());
    println!("{}", serde_json::to_string_pretty(&parsed)?);

    if registry.cards.is_empty() && registry.users.is_empty() {
        println!("\n(no cached registries; run `gasto registry pull` to enable card/user matching)");
    }
    Ok(())
}

async fn notify(title: &str, body: &str, app: &str, submit: bool) -> Result<()> {
    let cfg = config::load_config()?;
    let parser = BankNotificationParser::default()
        .with_extra_origins(cfg.notifications.extra_origins.clone());

    let Some(parsed) = parser.parse(title, body, app, Utc::now()) else {
        println!("Ignored: not a banking notification with a recognizable amount.");
        return Ok(());
    };
    println!("{}", serde_json::to_string_pretty(&parsed)?);

    if submit {
        let services = build_services(&cfg)?;
        let request = SubmitRequest::from_text(notification_text(&parsed));
        let outcome = services.coordinator.submit(request).await?;
        println!();
        print_outcome(&outcome);
    }
    Ok(())
}

/// Rebuild submission text from a parsed notification so the backend (and a
/// later local re-parse) can read the amount back out of it.
fn notification_text(parsed: &ParsedNotification) -> String {
    match &parsed.card_last4 {
        Some(last4) => format!(
            "{} {} cartão final {}",
            parsed.description,
            format_brl(parsed.amount),
            last4
        ),
        None => format!("{} {}", parsed.description, format_brl(parsed.amount)),
    }
}

async fn submit_expense(args: SubmitArgs) -> Result<()> {
    if args.text.is_none() && args.audio.is_none() {
        bail!("nothing to submit (pass --text and/or --audio)");
    }

    let mut request = SubmitRequest {
        text: args.text,
        ..SubmitRequest::default()
    };
    if let Some(path) = args.audio {
        if !path.exists() {
            bail!("audio file not found: {}", path.display());
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.m4a")
            .to_string();
        request.audio = Some(AudioAttachment::new(path, file_name, args.mime));
    }
    if let Some(card) = args.card {
        request = request.with_card(card);
    }
    if !args.destinations.is_empty() {
        request = request.with_destinations(args.destinations);
    }
    if args.date.is_some() {
        request = request.with_date(ensure_valid_date(args.date.as_deref(), Utc::now()));
    }
    if let (Some(lat), Some(lon)) = (args.latitude, args.longitude) {
        request = request.with_location(lat, lon);
    }
    if args.draft {
        request = request.as_draft();
    }

    let cfg = config::load_config()?;
    let services = build_services(&cfg)?;
    let outcome = services.coordinator.submit(request).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn queue(command: QueueCommand) -> Result<()> {
    let cfg = config::load_config()?;
    let services = build_services(&cfg)?;

    match command {
        QueueCommand::List => {
            let items = services.processor.store().list().await;
            if items.is_empty() {
                println!("Queue is empty.");
                return Ok(());
            }
            for item in &items {
                println!(
                    "{} | {} | {} | retries={} | {} | {}",
                    item.id,
                    item.status,
                    item.timestamp.format("%Y-%m-%d %H:%M"),
                    item.retry_count,
                    item.description,
                    item.last_error.as_deref().unwrap_or("-")
                );
            }
            println!("\n{} pending", items.len());
        }

        QueueCommand::Drain => {
            report_drain(services.processor.drain().await);
        }

        QueueCommand::Retry { id } => {
            report_drain(services.processor.retry(&id).await?);
        }

        QueueCommand::Remove { id } => {
            services.processor.store().remove(&id).await?;
            println!("Removed {id} (if it was queued).");
        }

        QueueCommand::Clear => {
            services.processor.store().clear().await?;
            println!("Queue cleared.");
        }
    }
    Ok(())
}

async fn watch() -> Result<()> {
    let cfg = config::load_config()?;
    let services = build_services(&cfg)?;

    let pending = services.processor.store().len().await;
    println!(
        "Watching the queue ({} pending, drain every {}s). Ctrl-C to stop.",
        pending,
        DRAIN_INTERVAL.as_secs()
    );
    DrainScheduler::default().run(services.processor).await;
    Ok(())
}

async fn registry(command: RegistryCommand) -> Result<()> {
    match command {
        RegistryCommand::Pull => {
            let cfg = config::load_config()?;
            let services = build_services(&cfg)?;

            let snapshot = state::RegistrySnapshot {
                cards: services.client.fetch_cards().await?,
                users: services.client.fetch_users().await?,
                destinations: services.client.fetch_destinations().await?,
            };
            state::write_registry(&snapshot)?;
            println!(
                "Cached {} cards, {} users, {} destinations.",
                snapshot.cards.len(),
                snapshot.users.len(),
                snapshot.destinations.len()
            );
        }

        RegistryCommand::Show => {
            let snapshot = state::read_registry()?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Submitted(ack) => {
            println!("Submitted: {} (id {})", ack.description, ack.id);
            if let Some(amount) = ack.amount {
                println!("Recognized amount: {}", format_brl(amount));
            }
        }
        SubmitOutcome::Drafted(id) => {
            println!("Saved locally as draft {id}.");
        }
        SubmitOutcome::Queued(id) => {
            println!("Backend unreachable; queued as {id}.");
            println!("It retries automatically; `gasto queue drain` pushes it now.");
        }
    }
}

fn report_drain(outcome: DrainOutcome) {
    match outcome {
        DrainOutcome::AlreadyDraining => println!("A drain is already in progress."),
        DrainOutcome::Offline => println!("Offline; queue left untouched."),
        DrainOutcome::Completed(report) => println!(
            "Drained: {} attempted, {} delivered, {} failed, {} dead-lettered.",
            report.attempted, report.delivered, report.failed, report.dead_lettered
        ),
    }
}

fn format_brl(amount: f64) -> String {
    format!("R$ {}", format!("{amount:.2}").replace('.', ","))
}
