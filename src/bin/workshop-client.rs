//! Headless workshop client.
//!
//! Opens a project and turns stdin into edits: every plain line is appended to
//! the document and autosaved. Lines starting with `:` are commands:
//! `:open`, `:new`, `:save`, `:show`, `:rename`, `:delete`, `:fav`, `:unfav`,
//! `:favs`, `:search` and `:quit`.

use clap::Parser;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use workshop_sync::clients::HttpProjectApi;
use workshop_sync::config::ClientConfig;
use workshop_sync::models::FavoriteAction;
use workshop_sync::session::{EditorSurface, Notice, SessionController, SessionSettings};

const SEARCH_PAGE: usize = 20;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project to open on start
    project: Option<String>,

    /// Server URL, overrides WORKSHOP_SERVER_URL
    #[arg(short, long, value_name = "URL")]
    server: Option<String>,
}

/// Editor surface that keeps the document in memory and prints notices
#[derive(Default)]
struct TerminalSurface {
    content: Mutex<String>,
    writable: Mutex<bool>,
}

impl TerminalSurface {
    fn append_line(&self, line: &str) -> bool {
        if !*self.writable.lock().unwrap_or_else(|e| e.into_inner()) {
            return false;
        }
        let mut content = self.content.lock().unwrap_or_else(|e| e.into_inner());
        content.push_str(line);
        content.push('\n');
        true
    }
}

impl EditorSurface for TerminalSurface {
    fn show_project(&self, project: &str, content: &str) {
        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = content.to_string();
        println!("== {} ({} chars)", project, content.chars().count());
    }

    fn replace_content(&self, content: &str) {
        *self.content.lock().unwrap_or_else(|e| e.into_inner()) = content.to_string();
        println!("== content refreshed ({} chars)", content.chars().count());
    }

    fn set_writable(&self, writable: bool) {
        *self.writable.lock().unwrap_or_else(|e| e.into_inner()) = writable;
        println!("== {}", if writable { "editing" } else { "read-only" });
    }

    fn current_content(&self) -> String {
        self.content.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn notify(&self, notice: Notice) {
        println!("!! {}", notice);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "workshop_sync=info,warn".into()))
        .init();

    let cli = Cli::parse();
    let mut config = match ClientConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load client configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    let api = match HttpProjectApi::from_config(&config) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let surface = Arc::new(TerminalSurface::default());
    let session = SessionController::new(api, surface.clone(), SessionSettings::from(&config));

    if let Some(project) = cli.project {
        let _ = session.open_project(&project).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };

        match line.split_once(' ').unwrap_or((line.as_str(), "")) {
            (":quit", _) => break,
            (":open", name) => {
                let _ = session.open_project(name).await;
            }
            (":new", name) => {
                let _ = session.create_project(name).await;
            }
            (":save", _) => {
                let _ = session.save_now().await;
            }
            (":show", _) => print!("{}", surface.current_content()),
            (":rename", new_name) => match session.current_project() {
                Some(current) => {
                    let _ = session.rename_project(&current, new_name).await;
                }
                None => println!("!! no project open"),
            },
            (":delete", name) => {
                if session.delete_project(name).await.is_ok() {
                    println!("== deleted {}", name.trim());
                }
            }
            (":fav", name) => {
                if let Ok(favorites) = session.set_favorite(name, FavoriteAction::Add).await {
                    println!("== favorites: {}", favorites.join(", "));
                }
            }
            (":unfav", name) => {
                if let Ok(favorites) = session.set_favorite(name, FavoriteAction::Remove).await {
                    println!("== favorites: {}", favorites.join(", "));
                }
            }
            (":favs", _) => {
                if let Ok(favorites) = session.favorites().await {
                    println!("== favorites: {}", favorites.join(", "));
                }
            }
            (":search", query) => {
                if let Ok(projects) = session.search_projects(query, 0, SEARCH_PAGE).await {
                    for project in projects {
                        println!("   {}", project);
                    }
                }
            }
            _ => {
                if surface.append_line(&line) {
                    session.content_changed().await;
                } else {
                    println!("!! read-only, line dropped");
                }
            }
        }
    }

    session.close().await;
    info!("Client stopped");
}
