use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

mod app;
mod client;
mod config;
mod conversation;
mod exchange;
mod handler;
mod store;
mod tui;
mod ui;

use app::App;
use client::ShopClient;
use config::Config;
use conversation::Origin;
use store::{FileStore, Session};

#[derive(Parser)]
#[command(name = "boutique")]
#[command(about = "Terminal chat client for the boutique shopping assistant")]
struct Cli {
    /// Backend base URL (overrides the config file)
    #[arg(long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant (interactive)
    Chat,
    /// Ask a single question and print the reply
    Ask {
        /// Your question
        question: String,
    },
    /// Print the saved conversation
    History,
    /// End the session and forget the saved conversation
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|_| Config::new());
    if let Some(url) = cli.backend {
        // Remember the override for subsequent runs
        config.backend_url = Some(url);
        let _ = config.save();
    }
    let client = ShopClient::new(&config.backend_url());

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => run_chat(client).await?,
        Commands::Ask { question } => ask(client, &question).await?,
        Commands::History => print_history()?,
        Commands::Clear => clear_session()?,
    }

    Ok(())
}

async fn run_chat(client: ShopClient) -> Result<()> {
    let session = Session::restore(FileStore::new());
    let mut app = App::new(session, client);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        }
    }

    tui::restore()?;
    Ok(())
}

async fn ask(client: ShopClient, question: &str) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        return Ok(());
    }

    let mut session = Session::restore(FileStore::new());
    let session_id = session.session_id().to_string();

    session
        .conversation
        .append(conversation::Message::user(question, &session_id));

    println!("{} {}\n", "You:".bold().cyan(), question);

    let reply = exchange::run_turn(
        &client,
        session.conversation.messages(),
        &session_id,
    )
    .await;

    println!("{} {}", "Shop:".bold().yellow(), reply.text);
    for (i, image) in reply.images.iter().enumerate() {
        let price = reply.prices.get(i).copied().unwrap_or(0.0);
        println!(
            "  {} {} {}",
            format!("[{}]", i + 1).magenta(),
            image,
            format!("${:.2}", price).bold().green()
        );
    }

    session.conversation.replace_pending(reply);
    session.persist();

    Ok(())
}

fn print_history() -> Result<()> {
    let session = Session::restore(FileStore::new());

    if session.conversation.is_empty() {
        println!("{}", "No saved conversation.".dimmed());
        return Ok(());
    }

    println!(
        "{} {}\n",
        "Session".bold().blue(),
        session.session_id().dimmed()
    );

    for msg in session.conversation.messages() {
        let speaker = match msg.origin {
            Origin::User => "You:".bold().cyan(),
            Origin::Assistant => "Shop:".bold().yellow(),
        };
        println!("{} {}", speaker, msg.text);
        for (i, image) in msg.images.iter().enumerate() {
            let price = msg.prices.get(i).copied().unwrap_or(0.0);
            println!(
                "  {} {} {}",
                format!("[{}]", i + 1).magenta(),
                image,
                format!("${:.2}", price).bold().green()
            );
        }
        println!();
    }

    Ok(())
}

fn clear_session() -> Result<()> {
    let mut session = Session::restore(FileStore::new());
    session.clear();
    println!("{}", "Session cleared.".green());
    Ok(())
}
