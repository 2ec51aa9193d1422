use anyhow::{Context, Result};
use chatdesk::app::{restore_terminal, setup_terminal, App};
use chatdesk::client::{Analytics, AnswerService, RagClient};
use chatdesk::config::Config;
use chatdesk::controller::{self, SendResolution};
use chatdesk::logging::init_logging;
use chatdesk::state::ChatState;
use chatdesk::storage::{ChatStore, FileStore, MemoryStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "chatdesk")]
#[command(version)]
#[command(about = "Chat with a document question-answering service", long_about = None)]
struct Cli {
    /// Service address, e.g. http://127.0.0.1:8000
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding chats.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep conversations in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// List saved conversations
    List,
    /// Print a conversation
    Show { id: String },
    /// Ask one question and print the answer
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Continue this conversation instead of starting a new one
        #[arg(long)]
        chat: Option<String>,
    },
    /// Upload a document for indexing
    Upload { path: PathBuf },
    /// Check that the service is up
    Health,
    /// Show usage figures collected by the service
    Analytics,
    /// Write the default config file if there is none and print its path
    Config,
}

fn open_state(config: &Config, ephemeral: bool) -> ChatState {
    let store: Box<dyn ChatStore> = if ephemeral {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::new(config.data_dir()))
    };
    ChatState::open(store)
}

fn list_conversations(state: &ChatState) {
    if state.chats().is_empty() {
        println!("📭 No conversations yet. Run 'chatdesk' to start one!");
        return;
    }

    println!("📋 Your conversations:\n");
    for (id, chat) in state.chats().iter() {
        println!("  • {}  {}  ({} messages)", id, chat.name, chat.messages.len());
    }
}

fn show_conversation(state: &ChatState, id: &str) -> Result<()> {
    let chat = state
        .chats()
        .get(id)
        .with_context(|| format!("Conversation '{}' not found", id))?;

    println!("💬 {}\n", chat.name);
    for message in &chat.messages {
        println!("{}: {}\n", message.role.display_name(), message.text);
    }
    Ok(())
}

fn print_analytics(analytics: &Analytics) {
    println!("📊 Usage:\n");
    println!("  Total queries:       {}", analytics.total_queries);
    println!("  Average confidence:  {:.3}", analytics.avg_confidence);
    println!("  Documents used:      {}", analytics.top_sources.len());

    if !analytics.top_questions.is_empty() {
        println!("\n❓ Top questions:\n");
        for (question, count) in &analytics.top_questions {
            println!("  • {}  ({})", question, count);
        }
    }

    if !analytics.top_sources.is_empty() {
        println!("\n📄 Top documents:\n");
        for (source, count) in &analytics.top_sources {
            println!("  • {}  ({})", source, count);
        }
    }
}

async fn ask(
    state: &mut ChatState,
    service: &dyn AnswerService,
    question: &str,
    chat: Option<&str>,
    top_k: u32,
) -> Result<()> {
    if let Some(id) = chat {
        state.activate(id)?;
    }

    match controller::send_message(state, service, question, top_k).await? {
        Some(SendResolution::Answered { conversation_id }) => {
            if let Some(reply) = state
                .chats()
                .get(&conversation_id)
                .and_then(|chat| chat.messages.last())
            {
                println!("{}", reply.text);
            }
            Ok(())
        }
        Some(SendResolution::Failed { error, .. }) => anyhow::bail!("No answer: {}", error),
        Some(SendResolution::Orphaned) | None => anyhow::bail!("Nothing to ask"),
    }
}

async fn run_chat(state: ChatState, service: Arc<dyn AnswerService>, top_k: u32) -> Result<()> {
    let mut terminal = setup_terminal().context("Failed to set up terminal")?;
    let mut app = App::new(state, service, top_k);

    let result = app.run(&mut terminal).await;
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }

    let command = cli.command.unwrap_or(Commands::Chat);
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
    let _guard = init_logging(&config.logging, &log_dir, !matches!(command, Commands::Chat));

    let client = RagClient::new(
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    )?;
    tracing::info!(api = client.base_url(), "Starting chatdesk");

    match command {
        Commands::Chat => {
            let state = open_state(&config, cli.ephemeral);
            run_chat(state, Arc::new(client), config.api.top_k).await
        }
        Commands::List => {
            list_conversations(&open_state(&config, cli.ephemeral));
            Ok(())
        }
        Commands::Show { id } => show_conversation(&open_state(&config, cli.ephemeral), &id),
        Commands::Ask { question, chat } => {
            let mut state = open_state(&config, cli.ephemeral);
            ask(&mut state, &client, &question.join(" "), chat.as_deref(), config.api.top_k).await
        }
        Commands::Upload { path } => {
            let status = controller::upload_document(&client, &path).await;
            println!("{}", status);
            if status.is_success() {
                Ok(())
            } else {
                anyhow::bail!("Upload did not succeed")
            }
        }
        Commands::Health => {
            let status = client
                .health()
                .await
                .with_context(|| format!("Service at {} is not reachable", client.base_url()))?;
            println!("✅ {} is {}", client.base_url(), status);
            Ok(())
        }
        Commands::Analytics => {
            let analytics = client
                .analytics()
                .await
                .context("Failed to load analytics")?;
            print_analytics(&analytics);
            Ok(())
        }
        Commands::Config => {
            let path = Config::init_file(&config.home)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}
