use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use client::net::types::{
    LoginRequest, MyPostsQuery, NewCategory, NewPost, NewTag, PostPatch, PostQuery, PostStatus, RegisterRequest,
};
use client::services::{categories, comments, likes, posts, tags};
use client::util::error_display::{SuggestedAction, describe};
use client::util::slug::slugify;
use client::{ApiError, AuthContext, AuthError, ClientConfig, ConfigError, SessionEvent};
use serde::Serialize;
use tokio::sync::broadcast;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("not signed in; run `blogline auth login`")]
    NotSignedIn,
    #[error("pass --email or --username")]
    MissingIdentity,
    #[error("invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "blogline", about = "Command-line client for the blog platform API")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct GlobalArgs {
    /// API base URL (overrides BLOG_API_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Where the access token is kept between runs.
    #[arg(long, global = true, value_parser = ["memory", "mirror"])]
    persistence: Option<String>,

    #[arg(long, global = true)]
    mirror_path: Option<PathBuf>,

    #[arg(long, short, global = true, env = "BLOG_VERBOSE")]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    Auth(AuthCommand),
    Posts(PostsCommand),
    Comments(CommentsCommand),
    Like { slug: String },
    Unlike { slug: String },
    Categories(TaxonomyCommand),
    Tags(TaxonomyCommand),
}

#[derive(Args, Debug)]
struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand, Debug)]
enum AuthSubcommand {
    Login {
        #[arg(long, conflicts_with = "username")]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    Logout,
    Whoami,
}

#[derive(Args, Debug)]
struct PostsCommand {
    #[command(subcommand)]
    command: PostsSubcommand,
}

#[derive(Subcommand, Debug)]
enum PostsSubcommand {
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        /// Category slug.
        #[arg(long)]
        category: Option<String>,
        /// Tag slug.
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    Mine {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
        /// draft, published or archived.
        #[arg(long)]
        status: Option<PostStatus>,
    },
    Show {
        slug: String,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Category id.
        #[arg(long)]
        category: Option<i64>,
        /// Tag id; repeat for several.
        #[arg(long = "tag")]
        tags: Vec<i64>,
        #[arg(long, default_value_t = false)]
        publish: bool,
    },
    Update {
        slug: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        category: Option<i64>,
    },
    Publish {
        slug: String,
    },
    Unpublish {
        slug: String,
    },
    Delete {
        slug: String,
    },
}

#[derive(Args, Debug)]
struct CommentsCommand {
    #[command(subcommand)]
    command: CommentsSubcommand,
}

#[derive(Subcommand, Debug)]
enum CommentsSubcommand {
    List {
        slug: String,
    },
    Add {
        slug: String,
        #[arg(long)]
        content: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct TaxonomyCommand {
    #[command(subcommand)]
    command: TaxonomySubcommand,
}

#[derive(Subcommand, Debug)]
enum TaxonomySubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        /// Derived from the name when omitted.
        #[arg(long)]
        slug: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli.global, |key| std::env::var(key).ok())?;
    tracing::debug!(base_url = %config.base_url, persistence = ?config.persistence, "config loaded");

    let auth = AuthContext::new(&config)?;
    let mut events = auth.events();
    if needs_session(&cli.command) {
        auth.restore().await;
    }

    let result = dispatch(&auth, cli.command).await;
    if session_expired(&mut events) {
        eprintln!("session expired, log in again");
    }
    result
}

/// Flags win over the environment; the CLI keeps sessions across runs unless
/// told otherwise.
fn build_config<F>(global: &GlobalArgs, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    ClientConfig::from_lookup(|key| {
        let flag = match key {
            "BLOG_API_URL" => global.base_url.clone(),
            "BLOG_TOKEN_PERSISTENCE" => global.persistence.clone(),
            "BLOG_TOKEN_MIRROR_PATH" => global.mirror_path.as_ref().map(|p| p.display().to_string()),
            _ => None,
        };
        flag.or_else(|| env(key))
            .or_else(|| (key == "BLOG_TOKEN_PERSISTENCE").then(|| "mirror".to_owned()))
    })
}

fn needs_session(command: &Command) -> bool {
    !matches!(
        command,
        Command::Auth(AuthCommand {
            command: AuthSubcommand::Login { .. } | AuthSubcommand::Register { .. } | AuthSubcommand::Logout
        })
    )
}

fn session_expired(events: &mut broadcast::Receiver<SessionEvent>) -> bool {
    let mut expired = false;
    while let Ok(event) = events.try_recv() {
        expired |= event == SessionEvent::Expired;
    }
    expired
}

async fn dispatch(auth: &AuthContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Auth(cmd) => run_auth(auth, cmd.command).await,
        Command::Posts(cmd) => run_posts(auth, cmd.command).await,
        Command::Comments(cmd) => run_comments(auth, cmd.command).await,
        Command::Like { slug } => print_json(&likes::like(auth.api(), &slug).await?),
        Command::Unlike { slug } => print_json(&likes::unlike(auth.api(), &slug).await?),
        Command::Categories(cmd) => run_categories(auth, cmd.command).await,
        Command::Tags(cmd) => run_tags(auth, cmd.command).await,
    }
}

async fn run_auth(auth: &AuthContext, command: AuthSubcommand) -> Result<(), CliError> {
    match command {
        AuthSubcommand::Login { email, username, password } => {
            let credentials = match (email, username) {
                (Some(email), _) => LoginRequest::with_email(email, password),
                (None, Some(username)) => LoginRequest::with_username(username, password),
                (None, None) => return Err(CliError::MissingIdentity),
            };
            print_json(&auth.login(&credentials).await?)
        }
        AuthSubcommand::Register { username, email, password, first_name, last_name } => {
            let details = RegisterRequest { username, email, password, first_name, last_name };
            print_json(&auth.register(&details).await?)
        }
        AuthSubcommand::Logout => {
            auth.logout().await;
            print_json(&serde_json::json!({ "signed_out": true }))
        }
        AuthSubcommand::Whoami => {
            let user = auth.current_user().ok_or(CliError::NotSignedIn)?;
            print_json(&user)
        }
    }
}

async fn run_posts(auth: &AuthContext, command: PostsSubcommand) -> Result<(), CliError> {
    let api = auth.api();
    match command {
        PostsSubcommand::List { page, page_size, search, category, tag, author } => {
            let query = PostQuery { page, page_size, search, category, tag, status: None, author };
            print_json(&posts::list_posts(api, &query).await?)
        }
        PostsSubcommand::Mine { page, page_size, status } => {
            let query = MyPostsQuery { page, page_size, status };
            print_json(&posts::my_posts(api, &query).await?)
        }
        PostsSubcommand::Show { slug } => print_json(&posts::get_post(api, &slug).await?),
        PostsSubcommand::Create { title, content, category, tags, publish } => {
            let post = NewPost { title, content, category, tags_input: tags, is_published: publish };
            print_json(&posts::create_post(api, &post).await?)
        }
        PostsSubcommand::Update { slug, title, content, category } => {
            let patch = PostPatch { title, content, category, ..PostPatch::default() };
            print_json(&posts::update_post(api, &slug, &patch).await?)
        }
        PostsSubcommand::Publish { slug } => print_json(&posts::set_published(api, &slug, true).await?),
        PostsSubcommand::Unpublish { slug } => print_json(&posts::set_published(api, &slug, false).await?),
        PostsSubcommand::Delete { slug } => {
            posts::delete_post(api, &slug).await?;
            print_json(&serde_json::json!({ "deleted": slug }))
        }
    }
}

async fn run_comments(auth: &AuthContext, command: CommentsSubcommand) -> Result<(), CliError> {
    let api = auth.api();
    match command {
        CommentsSubcommand::List { slug } => print_json(&comments::list_comments(api, &slug).await?),
        CommentsSubcommand::Add { slug, content } => print_json(&comments::add_comment(api, &slug, &content).await?),
        CommentsSubcommand::Delete { id } => {
            comments::delete_comment(api, id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_categories(auth: &AuthContext, command: TaxonomySubcommand) -> Result<(), CliError> {
    match command {
        TaxonomySubcommand::List => print_json(&categories::list_categories(auth.api()).await?),
        TaxonomySubcommand::Create { name, slug } => {
            let slug = resolve_slug(&name, slug);
            print_json(&categories::create_category(auth.api(), &NewCategory { name, slug }).await?)
        }
    }
}

async fn run_tags(auth: &AuthContext, command: TaxonomySubcommand) -> Result<(), CliError> {
    match command {
        TaxonomySubcommand::List => print_json(&tags::list_tags(auth.api()).await?),
        TaxonomySubcommand::Create { name, slug } => {
            let slug = resolve_slug(&name, slug);
            print_json(&tags::create_tag(auth.api(), &NewTag { name, slug }).await?)
        }
    }
}

fn resolve_slug(name: &str, slug: Option<String>) -> String {
    slug.filter(|s| !s.trim().is_empty()).unwrap_or_else(|| slugify(name))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

fn report(error: &CliError) {
    let api_error = match error {
        CliError::Api(e) => e.clone(),
        CliError::Auth(e) => e.clone().into_api_error(),
        other => {
            eprintln!("error: {other}");
            return;
        }
    };
    let display = describe(&api_error);
    eprintln!("{}: {}", display.title, display.message);
    if let Some(hint) = display.action.and_then(action_hint) {
        eprintln!("hint: {hint}");
    }
    tracing::debug!(code = api_error.error_code(), error = %api_error, "command failed");
}

/// Terminal counterpart of a suggested action. `Home` has none here.
fn action_hint(action: SuggestedAction) -> Option<&'static str> {
    match action {
        SuggestedAction::SignIn => Some("run `blogline auth login`"),
        SuggestedAction::Home => None,
    }
}
