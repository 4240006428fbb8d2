//! CLI commands

use anyhow::{Context as _, Result, bail};
use clap::{Subcommand, ValueEnum};
use ecogaspi_core::{
    ActivityHub, ActivityKind, AppProfile, EndReason, FileStorage, IdleTimer, Session,
    SessionEvent, Settings, UserProfile, UserRole,
};
use ecogaspi_http::types::{
    AnnonceQueue, BusinessCategoryRequest, MerchantListParams, ProductQuery, SortOrder, UploadKind,
    ValidationRequest,
};
use ecogaspi_http::{
    AnnonceService, ApiClient, AuthService, BusinessCategoryService, FilePart, MerchantService,
    ProductService, UploadService,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a phone number and password
    Login {
        #[arg(long)]
        phone: String,

        #[arg(long, env = "ECOGASPI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the stored session
    Logout,

    /// Show the stored session
    Status {
        /// Also ask the backend who the token belongs to
        #[arg(long)]
        remote: bool,
    },

    /// Renew the access token now
    Refresh,

    /// Keep the session open until it idles out; each stdin line counts as activity
    Session,

    /// Merchant administration
    Merchants {
        #[command(subcommand)]
        command: MerchantCommands,
    },

    /// Product catalogue
    Products {
        #[command(subcommand)]
        command: ProductCommands,
    },

    /// Announcement moderation
    Annonces {
        #[command(subcommand)]
        command: AnnonceCommands,
    },

    /// Business categories
    Categories {
        #[command(subcommand)]
        command: CategoryCommands,
    },

    /// Upload a file
    Upload {
        #[arg(value_enum)]
        kind: UploadKindArg,

        file: PathBuf,

        /// Content type sent with the file
        #[arg(long)]
        mime: Option<String>,
    },

    /// Configuration files
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum MerchantCommands {
    /// List merchants
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        verified: Option<bool>,
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long, value_enum)]
        sort_order: Option<SortOrderArg>,
    },
    /// Show one merchant
    Get { id: String },
    /// Mark a merchant as verified
    Verify { id: String },
    /// Suspend a merchant
    Suspend {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Delete a merchant
    Delete { id: String },
    /// Merchant counts
    Stats,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// List products, one page at a time
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "10")]
        size: u32,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// active, inactive or all
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        condition: Option<String>,
    },
    /// Show one product
    Get { id: String },
    /// Approve a product
    Approve { id: String },
    /// Reject a product
    Reject { id: String },
    /// Delete a product
    Delete { id: String },
    /// Products close to their expiry date
    ExpiringSoon,
    /// Product categories
    Categories,
}

#[derive(Subcommand)]
pub enum AnnonceCommands {
    /// List a moderation queue
    List {
        #[arg(value_enum, default_value = "pending")]
        queue: QueueArg,
    },
    /// Show one announcement
    Get { id: i64 },
    /// Approve an announcement
    Approve {
        id: i64,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Reject an announcement
    Reject {
        id: i64,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Suspend an announcement
    Suspend {
        id: i64,
        #[arg(long)]
        reason: String,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Make an announcement visible
    Activate { id: i64 },
    /// Hide an announcement
    Deactivate { id: i64 },
    /// Feature an announcement
    Feature { id: i64 },
    /// Stop featuring an announcement
    Unfeature { id: i64 },
    /// Moderation history of an announcement
    History { id: i64 },
    /// Queue sizes
    Stats,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List business categories
    List,
    /// Show one business category
    Get { id: String },
    /// Create a business category
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Rename or describe a business category
    Update {
        id: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a business category
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Output file path (defaults to <data_dir>/config.json)
        output: Option<PathBuf>,
    },
    /// Print the effective configuration
    Show,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SortOrderArg {
    Asc,
    Desc,
}

impl From<SortOrderArg> for SortOrder {
    fn from(order: SortOrderArg) -> Self {
        match order {
            SortOrderArg::Asc => Self::Asc,
            SortOrderArg::Desc => Self::Desc,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum QueueArg {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl From<QueueArg> for AnnonceQueue {
    fn from(queue: QueueArg) -> Self {
        match queue {
            QueueArg::Pending => Self::Pending,
            QueueArg::Approved => Self::Approved,
            QueueArg::Rejected => Self::Rejected,
            QueueArg::Suspended => Self::Suspended,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum UploadKindArg {
    Image,
    Document,
    Avatar,
}

impl From<UploadKindArg> for UploadKind {
    fn from(kind: UploadKindArg) -> Self {
        match kind {
            UploadKindArg::Image => Self::Image,
            UploadKindArg::Document => Self::Document,
            UploadKindArg::Avatar => Self::Avatar,
        }
    }
}

/// Session and client shared by the commands
struct Context {
    settings: Settings,
    session: Session,
    client: ApiClient,
}

impl Context {
    fn open(settings: Settings) -> Result<Self> {
        let storage = FileStorage::in_dir(&settings.data_dir())
            .context("Failed to open the stored session")?;
        info!(path = %storage.path().display(), "Using credential file");

        let session = Session::new(settings.session.profile, storage);
        session.init();
        let client = ApiClient::from_settings(&settings, session.clone())?;

        Ok(Self {
            settings,
            session,
            client,
        })
    }

    fn require_login(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            bail!("Not logged in; run `ecogaspi login` first");
        }
        Ok(())
    }

    /// Moderator identity taken from the logged-in user
    fn validation(&self, comment: String, reason: Option<String>) -> Result<ValidationRequest> {
        let user = self
            .session
            .user()
            .context("Not logged in; run `ecogaspi login` first")?;
        Ok(ValidationRequest {
            validator_id: user.id.clone(),
            validator_name: user.display_name(),
            comment,
            reason,
        })
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Commands {
    /// Commands that run until the session ends rather than until a reply arrives
    pub const fn is_long_running(&self) -> bool {
        matches!(self, Self::Session)
    }

    pub async fn execute(self, settings: Settings) -> Result<()> {
        match self {
            Self::Config { command } => command.execute(&settings),
            Self::Login { phone, password } => {
                login(&Context::open(settings)?, phone, password).await
            }
            Self::Logout => {
                let ctx = Context::open(settings)?;
                AuthService::new(ctx.client).logout().await;
                println!("Logged out");
                Ok(())
            }
            Self::Status { remote } => status(&Context::open(settings)?, remote).await,
            Self::Refresh => {
                let ctx = Context::open(settings)?;
                ctx.require_login()?;
                AuthService::new(ctx.client).refresh().await?;
                println!("Access token refreshed");
                Ok(())
            }
            Self::Session => run_session(&Context::open(settings)?).await,
            Self::Merchants { command } => {
                let ctx = Context::open(settings)?;
                ctx.require_login()?;
                command.execute(MerchantService::new(ctx.client)).await
            }
            Self::Products { command } => {
                let ctx = Context::open(settings)?;
                ctx.require_login()?;
                command.execute(ProductService::new(ctx.client)).await
            }
            Self::Annonces { command } => {
                let ctx = Context::open(settings)?;
                ctx.require_login()?;
                command.execute(&ctx).await
            }
            Self::Categories { command } => {
                let ctx = Context::open(settings)?;
                ctx.require_login()?;
                command
                    .execute(BusinessCategoryService::new(ctx.client))
                    .await
            }
            Self::Upload { kind, file, mime } => {
                let ctx = Context::open(settings)?;
                ctx.require_login()?;
                upload(&ctx, kind.into(), file, mime).await
            }
        }
    }
}

async fn login(ctx: &Context, phone: String, password: String) -> Result<()> {
    let credentials = AuthService::new(ctx.client.clone())
        .login(phone, password)
        .await?;
    println!(
        "Logged in as {} ({:?})",
        credentials.user.display_name(),
        ctx.settings.session.profile
    );
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    profile: AppProfile,
    api: String,
    authenticated: bool,
    user: Option<String>,
    roles: Vec<UserRole>,
    token_expired: Option<bool>,
}

async fn status(ctx: &Context, remote: bool) -> Result<()> {
    let credentials = ctx.session.credentials();
    let user = ctx.session.user();

    print_json(&StatusReport {
        profile: ctx.session.profile(),
        api: ctx.settings.full_api_url(),
        authenticated: ctx.session.is_authenticated(),
        user: user.as_ref().map(UserProfile::display_name),
        roles: user.map(|u| u.roles).unwrap_or_default(),
        token_expired: credentials.map(|c| c.is_access_token_expired()),
    })?;

    if remote {
        ctx.require_login()?;
        let me = AuthService::new(ctx.client.clone()).me().await?;
        print_json(&me)?;
    }
    Ok(())
}

/// Keep the session alive while stdin shows activity
///
/// Exits when the idle timer ends the session, when a refresh fails, on
/// `quit`, on end of input or on Ctrl-C.
async fn run_session(ctx: &Context) -> Result<()> {
    ctx.require_login()?;

    let hub = ActivityHub::new();
    let timer = IdleTimer::new(hub.clone(), ctx.settings.idle_timeout());
    let session = ctx.session.clone();
    timer.start(move || session.end(EndReason::IdleTimeout));

    let mut events = ctx.session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let auth = AuthService::new(ctx.client.clone());

    println!(
        "Session open; it ends after {}s without input. Commands: me, refresh, quit",
        timer.timeout().as_secs()
    );

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::Ended) | Err(RecvError::Closed) => {
                    println!("Session ended");
                    break;
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                hub.record(ActivityKind::KeyPress);

                match line.trim() {
                    "quit" | "exit" => break,
                    "me" => match auth.me().await {
                        Ok(me) => print_json(&me)?,
                        Err(e) => eprintln!("Error: {e}"),
                    },
                    "refresh" => match auth.refresh().await {
                        Ok(_) => println!("Access token refreshed"),
                        Err(e) => eprintln!("Error: {e}"),
                    },
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    timer.stop();
    Ok(())
}

async fn upload(
    ctx: &Context,
    kind: UploadKind,
    path: PathBuf,
    mime: Option<String>,
) -> Result<()> {
    let bytes = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());

    let mut file = FilePart::new(file_name, bytes);
    if let Some(mime) = mime {
        file = file.mime(mime);
    }

    let stored = UploadService::new(ctx.client.clone())
        .upload(kind, file)
        .await?;
    print_json(&stored)
}

impl MerchantCommands {
    async fn execute(self, merchants: MerchantService) -> Result<()> {
        match self {
            Self::List {
                page,
                limit,
                search,
                status,
                verified,
                sort_by,
                sort_order,
            } => {
                let params = MerchantListParams {
                    page,
                    limit,
                    search,
                    status,
                    verified,
                    sort_by,
                    sort_order: sort_order.map(Into::into),
                };
                print_json(&merchants.list(&params).await?)
            }
            Self::Get { id } => print_json(&merchants.get(&id).await?),
            Self::Verify { id } => print_json(&merchants.verify(&id).await?),
            Self::Suspend { id, reason } => print_json(&merchants.suspend(&id, reason).await?),
            Self::Delete { id } => {
                merchants.delete(&id).await?;
                println!("Deleted merchant {id}");
                Ok(())
            }
            Self::Stats => print_json(&merchants.stats().await?),
        }
    }
}

impl ProductCommands {
    async fn execute(self, products: ProductService) -> Result<()> {
        match self {
            Self::List {
                page,
                size,
                search,
                category,
                status,
                condition,
            } => {
                let query = ProductQuery {
                    page,
                    size,
                    search,
                    category,
                    status,
                    condition,
                };
                print_json(&products.list(&query).await?)
            }
            Self::Get { id } => print_json(&products.get(&id).await?),
            Self::Approve { id } => print_json(&products.approve(&id).await?),
            Self::Reject { id } => print_json(&products.reject(&id).await?),
            Self::Delete { id } => {
                products.delete(&id).await?;
                println!("Deleted product {id}");
                Ok(())
            }
            Self::ExpiringSoon => print_json(&products.expiring_soon().await?),
            Self::Categories => print_json(&products.categories().await?),
        }
    }
}

impl AnnonceCommands {
    async fn execute(self, ctx: &Context) -> Result<()> {
        let annonces = AnnonceService::new(ctx.client.clone());
        match self {
            Self::List { queue } => print_json(&annonces.list(queue.into()).await?),
            Self::Get { id } => print_json(&annonces.get(id).await?),
            Self::Approve { id, comment } => {
                annonces.approve(id, &ctx.validation(comment, None)?).await?;
                println!("Approved announcement {id}");
                Ok(())
            }
            Self::Reject {
                id,
                reason,
                comment,
            } => {
                annonces
                    .reject(id, &ctx.validation(comment, Some(reason))?)
                    .await?;
                println!("Rejected announcement {id}");
                Ok(())
            }
            Self::Suspend {
                id,
                reason,
                comment,
            } => {
                annonces
                    .suspend(id, &ctx.validation(comment, Some(reason))?)
                    .await?;
                println!("Suspended announcement {id}");
                Ok(())
            }
            Self::Activate { id } => print_json(&annonces.activate(id).await?),
            Self::Deactivate { id } => print_json(&annonces.deactivate(id).await?),
            Self::Feature { id } => print_json(&annonces.feature(id).await?),
            Self::Unfeature { id } => print_json(&annonces.unfeature(id).await?),
            Self::History { id } => print_json(&annonces.history(id).await?),
            Self::Stats => print_json(&annonces.stats().await?),
        }
    }
}

impl CategoryCommands {
    async fn execute(self, categories: BusinessCategoryService) -> Result<()> {
        match self {
            Self::List => print_json(&categories.list().await?),
            Self::Get { id } => print_json(&categories.get(&id).await?),
            Self::Create { name, description } => print_json(
                &categories
                    .create(&BusinessCategoryRequest { name, description })
                    .await?,
            ),
            Self::Update {
                id,
                name,
                description,
            } => print_json(
                &categories
                    .update(&id, &BusinessCategoryRequest { name, description })
                    .await?,
            ),
            Self::Delete { id } => {
                categories.delete(&id).await?;
                println!("Deleted business category {id}");
                Ok(())
            }
        }
    }
}

impl ConfigCommands {
    fn execute(self, settings: &Settings) -> Result<()> {
        match self {
            Self::Init { output } => {
                let config_path =
                    output.unwrap_or_else(|| settings.data_dir().join(config::CONFIG_FILE));

                // Create parent directory if it doesn't exist
                if let Some(parent) = config_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                config::generate_default_config(&config_path)?;
                println!("Generated configuration at: {}", config_path.display());
                Ok(())
            }
            Self::Show => print_json(settings),
        }
    }
}
