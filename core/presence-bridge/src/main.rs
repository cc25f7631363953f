//! presence-bridge: editor sidecar that mirrors the active file into the
//! Discord client's rich presence.
//!
//! The editor spawns `presence-bridge run` and exchanges newline-delimited
//! JSON with it over stdin/stdout.
//!
//! ## Subcommands
//!
//! - `run`: the sidecar event loop
//! - `compose`: print the activity payload a file would produce
//! - `remote`: print the repository URL used for the "View Repository" button
//! - `socket`: print the gateway socket the bridge would connect to

mod host;
mod logging;
mod run;

use chrono::Utc;
use clap::{Parser, Subcommand};
use presence_core::activity::{compose_activity, file_extension, normalize_repo_url, EditorContext};
use presence_core::config::{load_config, PresenceConfig};
use presence_core::ipc::{find_gateway_socket, socket_paths_for};
use presence_core::repository::resolve_repository_url;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "presence-bridge")]
#[command(about = "Discord rich presence bridge for code editors")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sidecar (host protocol on stdin/stdout)
    Run {
        /// Discord application id
        #[arg(long)]
        client_id: Option<String>,

        /// Gateway socket path (skips discovery)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Print the activity payload for a file
    Compose {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Editor language id (defaults to the file extension)
        #[arg(long)]
        language: Option<String>,

        /// 0-based cursor line
        #[arg(long, default_value_t = 0)]
        line: u32,

        /// 0-based cursor column
        #[arg(long, default_value_t = 0)]
        column: u32,

        /// Workspace root (name and repository button)
        #[arg(long, value_name = "DIR")]
        workspace: Option<PathBuf>,
    },

    /// Print the repository URL for a workspace
    Remote {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    /// Print the first gateway socket that accepts connections
    Socket,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();
    let mut config = load_config();

    let result = match cli.command {
        Commands::Run { client_id, socket } => {
            apply_run_flags(&mut config, client_id, socket);
            run::run(config)
        }
        Commands::Compose {
            file,
            language,
            line,
            column,
            workspace,
        } => compose(&config, &file, language, line, column, workspace.as_deref()),
        Commands::Remote { dir } => remote(&dir),
        Commands::Socket => socket(&config),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "presence-bridge failed");
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn apply_run_flags(config: &mut PresenceConfig, client_id: Option<String>, socket: Option<PathBuf>) {
    if let Some(client_id) = client_id {
        config.client_id = client_id;
    }
    if let Some(socket) = socket {
        config.socket_path = Some(socket);
    }
}

fn compose(
    config: &PresenceConfig,
    file: &Path,
    language: Option<String>,
    line: u32,
    column: u32,
    workspace: Option<&Path>,
) -> Result<(), String> {
    let file_name = file.to_string_lossy().to_string();
    let language_id = language.unwrap_or_else(|| file_extension(&file_name));
    let context = EditorContext {
        file_name,
        language_id,
        cursor_line: line,
        cursor_column: column,
        workspace_folder_name: workspace.and_then(workspace_name),
        repository_url: workspace.and_then(resolve_repository_url),
    };

    let payload = compose_activity(Some(&context), Utc::now(), &config.branding());
    let json = serde_json::to_string_pretty(&payload)
        .map_err(|e| format!("Failed to serialize payload: {}", e))?;
    println!("{}", json);
    Ok(())
}

fn workspace_name(dir: &Path) -> Option<String> {
    dir.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .or_else(|| Some(dir.display().to_string()))
}

fn remote(dir: &Path) -> Result<(), String> {
    let url = resolve_repository_url(dir)
        .ok_or_else(|| format!("No origin or GitHub remote found for {}", dir.display()))?;
    println!("{}", normalize_repo_url(&url));
    Ok(())
}

fn socket(config: &PresenceConfig) -> Result<(), String> {
    let candidates = socket_paths_for(config);
    let path = find_gateway_socket(&candidates)
        .ok_or_else(|| format!("No Discord gateway found ({} paths tried)", candidates.len()))?;
    println!("{}", path.display());
    Ok(())
}
