use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use shared::{Credentials, FavoriteSet, SessionInfo, VideoSort};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;

use api::{ApiClient, ApiError, MediaKind};

#[derive(Parser)]
#[command(name = "flowstate")]
#[command(about = "Operator CLI for a FlowState class catalog server")]
#[command(version)]
struct Cli {
    /// Server URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Auth token (overrides config)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Create an account and sign in
    Register {
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in to the server
    Login {
        email: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Show current login status
    Whoami,
    /// Become the admin, if nobody is yet
    ClaimAdmin,
    /// List on-demand videos
    Sessions {
        #[arg(long, default_value = "newest")]
        sort: VideoSort,
    },
    /// Show upcoming and past live classes
    Schedule,
    /// Put a session on air (admin)
    GoLive { session_id: String },
    /// Stop streaming a session (admin)
    EndStream { session_id: String },
    /// Toggle a session in your favorites
    Favorite { session_id: String },
    /// List your favorite sessions
    Favorites,
    /// Upload a thumbnail or video for a session slug (admin)
    Upload {
        #[arg(value_enum)]
        kind: MediaKind,
        slug: String,
        file: PathBuf,
    },
    /// Grant or revoke admin for a user (admin)
    SetAdmin {
        user_id: String,
        #[arg(action = clap::ArgAction::Set)]
        is_admin: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all configuration
    Show,
    /// Set the server URL
    SetServer { url: String },
    /// Set the auth token
    SetToken { token: String },
    /// Get the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowstate=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = config::Config::load().unwrap_or_default();
    let server = config.server_url(cli.server.as_deref());
    let token = cli.token.clone().or_else(|| config.remote.token.clone());
    let client = ApiClient::new(&server, token)?;

    match cli.command {
        Commands::Config { action } => handle_config_command(action, config)?,
        Commands::Register { email, password } => {
            let password = auth::resolve_password(password)?;
            auth::register(&client, &mut config, Credentials { email, password }).await?;
        }
        Commands::Login { email, password } => {
            let password = auth::resolve_password(password)?;
            auth::login(&client, &mut config, Credentials { email, password }).await?;
        }
        Commands::Logout => auth::logout(&mut config)?,
        Commands::Whoami => auth::whoami(&client, &config).await?,
        Commands::ClaimAdmin => auth::claim_admin(&client, &mut config).await?,
        Commands::Sessions { sort } => {
            let (owner, favorites) = load_favorites(&client).await;
            let sessions = client.videos(sort).await?;
            if sessions.is_empty() {
                println!("No videos yet");
            }
            for session in &sessions {
                println!("{}", format_session(session, favorites.is_favorite(owner.as_deref(), &session.id)));
            }
        }
        Commands::Schedule => {
            let (owner, favorites) = load_favorites(&client).await;
            let schedule = client.schedule().await?;
            println!("\x1b[1mUpcoming\x1b[0m");
            for session in &schedule.upcoming {
                println!("{}", format_session(session, favorites.is_favorite(owner.as_deref(), &session.id)));
            }
            println!("\x1b[1mPast\x1b[0m");
            for session in &schedule.past {
                println!("{}", format_session(session, favorites.is_favorite(owner.as_deref(), &session.id)));
            }
        }
        Commands::GoLive { session_id } => {
            let session = client.go_live(&session_id).await?;
            println!("\x1b[1;31m● LIVE\x1b[0m {} ({})", session.title, session.slug);
        }
        Commands::EndStream { session_id } => {
            let session = client.end_stream(&session_id).await?;
            println!("Stream ended for {} ({})", session.title, session.slug);
        }
        Commands::Favorite { session_id } => {
            let resp = client.toggle_favorite(&session_id).await?;
            if resp.requires_sign_in {
                println!("\x1b[33mSign in to save favorites\x1b[0m (run 'flowstate login')");
            } else if resp.favorited {
                println!("★ Added {} to favorites", resp.session_id);
            } else {
                println!("☆ Removed {} from favorites", resp.session_id);
            }
        }
        Commands::Favorites => {
            let resp = client.favorites().await?;
            if resp.sessions.is_empty() {
                println!("No favorites yet");
            }
            for session in &resp.sessions {
                println!("{}", format_session(session, true));
            }
        }
        Commands::Upload { kind, slug, file } => {
            let uploaded = client.upload(kind, &slug, &file).await?;
            println!("Uploaded {}", uploaded.key);
            println!("{}", uploaded.url);
        }
        Commands::SetAdmin { user_id, is_admin } => {
            let user = client.set_admin(&user_id, is_admin).await?;
            println!(
                "{} is {}",
                user.email,
                if user.is_admin { "now an admin" } else { "no longer an admin" }
            );
            println!("\x1b[90mTheir existing tokens may keep the old role for up to a minute\x1b[0m");
        }
    }

    Ok(())
}

/// The signed-in identity and its favorites. Signed-out or unreachable
/// callers get an empty projection.
async fn load_favorites(client: &ApiClient) -> (Option<String>, FavoriteSet) {
    let mut favorites = FavoriteSet::new();

    let owner = match client.me().await {
        Ok(me) => Some(me.user_id),
        Err(ApiError::NotSignedIn) => None,
        Err(e) => {
            tracing::warn!("Could not resolve the signed-in user: {}", e);
            None
        }
    };

    let ids = match owner {
        Some(_) => match client.favorites().await {
            Ok(resp) => resp.sessions.into_iter().map(|s| s.id).collect(),
            Err(e) => {
                tracing::warn!("Could not load favorites: {}", e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };
    favorites.replace(owner.as_deref(), ids, Utc::now());

    (owner, favorites)
}

fn format_session(session: &SessionInfo, favorite: bool) -> String {
    let mut line = format!(
        "{} {}  \x1b[90m{}  id={}\x1b[0m",
        if favorite { "★" } else { " " },
        session.title,
        session.slug,
        session.id
    );
    if session.streaming_now {
        line.push_str("  \x1b[1;31m● LIVE NOW\x1b[0m");
    } else if let Some(live_at) = session.live_at {
        line.push_str(&format!("  {}", live_at.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(minutes) = session.duration_minutes {
        line.push_str(&format!("  {} min", minutes));
    }
    if let Some(difficulty) = session.difficulty {
        line.push_str(&format!("  {}", difficulty));
    }
    line
}

fn handle_config_command(action: ConfigAction, mut config: config::Config) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("server: {}", config.server_url(None));
            println!("token: {}", config.remote.token.map(|_| "****").unwrap_or_default());
        }
        ConfigAction::SetServer { url } => {
            config.remote.server = Some(url);
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::SetToken { token } => {
            config.remote.token = Some(token);
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Path => {
            let path = config::Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_set_admin_and_sort() {
        let cli = Cli::try_parse_from(["flowstate", "set-admin", "u1", "false"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::SetAdmin { ref user_id, is_admin: false } if user_id == "u1"
        ));

        let cli = Cli::try_parse_from(["flowstate", "sessions", "--sort", "oldest"]).unwrap();
        assert!(matches!(cli.command, Commands::Sessions { sort: VideoSort::Oldest }));

        assert!(Cli::try_parse_from(["flowstate", "sessions", "--sort", "sideways"]).is_err());
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from([
            "flowstate",
            "--server",
            "http://studio:8080",
            "upload",
            "video",
            "morning-flow-1",
            "class.mp4",
        ])
        .unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://studio:8080"));
        match cli.command {
            Commands::Upload { kind, slug, file } => {
                assert_eq!(kind, MediaKind::Video);
                assert_eq!(slug, "morning-flow-1");
                assert_eq!(file, PathBuf::from("class.mp4"));
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn test_format_session_marks() {
        let now = Utc::now();
        let session = SessionInfo {
            id: "s1".into(),
            slug: "flow-1".into(),
            title: "Flow".into(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            duration_minutes: Some(45),
            difficulty: Some(shared::Difficulty::Beginner),
            category_id: None,
            theme_id: None,
            is_published: true,
            is_live: true,
            live_at: Some(now),
            streaming_now: true,
            created_at: now,
            updated_at: now,
        };

        let line = format_session(&session, true);
        assert!(line.starts_with("★ Flow"));
        assert!(line.contains("LIVE NOW"));
        assert!(line.contains("45 min"));
        assert!(line.contains("beginner"));
        assert!(format_session(&session, false).starts_with("  Flow"));
    }
}
