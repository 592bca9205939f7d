use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use contract::{Product, ProductDraft};
use portal::catalog::ProductCatalog;
use portal::config::{ConfigError, PortalConfig, normalize_base_url};
use portal::flows::{
    ChangePasswordFlow, DashboardFlow, EditUserFlow, ForgotFlow, Form, LoginFlow, RegisterFlow, VerifyFlow,
};
use portal::net::{HttpTransport, PortalApi, Registration, TransportError};
use portal::session::{FileSessionStore, Route, SessionError};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Rejected(String),
    #[error("not logged in; run `portal-cli login` first")]
    NotLoggedIn,
    #[error("already logged in; run `portal-cli logout` first")]
    AlreadyLoggedIn,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("could not clear saved session: {0}")]
    Session(#[from] SessionError),
}

#[derive(Parser, Debug)]
#[command(name = "portal-cli", about = "Account portal and product catalog client")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, env = "PORTAL_BASE_URL")]
    base_url: Option<String>,

    /// Directory holding the saved session.
    #[arg(long, env = "PORTAL_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Request a password reset email.
    Forgot {
        #[arg(long)]
        email: String,
    },
    /// Confirm an email address with the token from the verification link.
    Verify { token: Option<String> },
    ChangePassword {
        #[arg(long)]
        old_password: String,
        #[arg(long)]
        new_password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Show the profile of the logged-in user.
    Whoami,
    /// Update first and/or last name; omitted fields keep their current value.
    EditUser {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    Logout,
    Products(ProductsCommand),
}

#[derive(Args, Debug)]
struct ProductsCommand {
    #[command(subcommand)]
    command: ProductsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProductsSubcommand {
    List,
    Add(ProductFields),
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct ProductFields {
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    price: f64,
}

impl From<ProductFields> for ProductDraft {
    fn from(fields: ProductFields) -> Self {
        Self { name: fields.name, description: fields.description, price: fields.price }
    }
}

struct CliContext {
    api: PortalApi<HttpTransport>,
    store: FileSessionStore,
}

impl CliContext {
    fn build(base_url: Option<String>, session_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = PortalConfig::from_env()?;
        if let Some(base_url) = base_url {
            config.base_url = normalize_base_url(&base_url);
        }
        if let Some(dir) = session_dir {
            config.session_dir = dir;
        }
        tracing::debug!(base_url = %config.base_url, session_dir = %config.session_dir.display(), "cli config");

        let transport = HttpTransport::from_config(&config)?;
        Ok(Self {
            api: PortalApi::new(transport, config.credential_encoding),
            store: FileSessionStore::new(&config.session_dir),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let ctx = CliContext::build(cli.base_url, cli.session_dir)?;

    run(&ctx, cli.command).await
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    let (api, store) = (&ctx.api, &ctx.store);
    match command {
        Command::Login { email, password } => {
            let mut flow = LoginFlow::new(api, store);
            flow.mount();
            finish(flow.submit(&email, &password).await)
        }
        Command::Register { email, password, first_name, last_name } => {
            let mut flow = RegisterFlow::new(api, store);
            flow.mount();
            finish(flow.submit(&Registration { email, password, first_name, last_name }).await)
        }
        Command::Forgot { email } => {
            let mut flow = ForgotFlow::new(api, store);
            flow.mount();
            finish(flow.submit(&email).await)
        }
        Command::Verify { token } => {
            let mut flow = VerifyFlow::new(api);
            finish(flow.run(token.as_deref()).await)
        }
        Command::ChangePassword { old_password, new_password, confirm_password } => {
            let mut flow = ChangePasswordFlow::new(api, store);
            flow.mount().await;
            finish(flow.submit(&old_password, &new_password, &confirm_password).await)
        }
        Command::Whoami => {
            let mut flow = DashboardFlow::new(api, store);
            flow.mount().await;
            match flow.profile() {
                Some(profile) => print_json(&serde_json::to_value(profile)?),
                None => finish(flow.form()),
            }
        }
        Command::EditUser { first_name, last_name } => {
            let mut flow = EditUserFlow::new(api, store);
            flow.mount().await;
            let Some(baseline) = flow.baseline() else {
                return finish(flow.form());
            };
            let first_name = first_name.unwrap_or_else(|| baseline.fname.clone());
            let last_name = last_name.unwrap_or_else(|| baseline.lname.clone());
            finish(flow.save(&first_name, &last_name).await)
        }
        Command::Logout => {
            DashboardFlow::new(api, store).logout()?;
            println!("logged out");
            Ok(())
        }
        Command::Products(products) => run_products(ctx, products).await,
    }
}

async fn run_products(ctx: &CliContext, products: ProductsCommand) -> Result<(), CliError> {
    let mut catalog = ProductCatalog::new(&ctx.api);
    match products.command {
        ProductsSubcommand::List => {
            if catalog.refresh().await {
                return print_json(&serde_json::to_value(catalog.items())?);
            }
        }
        ProductsSubcommand::Add(fields) => {
            if catalog.create(&fields.into()).await {
                return print_json(&serde_json::to_value(catalog.items().last())?);
            }
        }
        ProductsSubcommand::Update { id, fields } => {
            if catalog.refresh().await && catalog.update(id, &fields.into()).await {
                return print_json(&serde_json::to_value(updated_product(catalog.items(), id)?)?);
            }
        }
        ProductsSubcommand::Delete { id } => {
            if catalog.delete(id).await {
                println!("deleted product {id}");
                return Ok(());
            }
        }
    }
    Err(CliError::Rejected(catalog.error().unwrap_or_default().to_owned()))
}

/// The reconciled entry for `id`; absent when the listing no longer has it.
fn updated_product(items: &[Product], id: i64) -> Result<&Product, CliError> {
    items
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| CliError::Rejected(format!("product {id} not found")))
}

/// Turn a settled form into process output.
fn finish(form: &Form) -> Result<(), CliError> {
    if let Some(error) = form.error() {
        return Err(CliError::Rejected(error.to_owned()));
    }
    match (form.redirect_target(), form.notice()) {
        (Some(Route::Login), _) => Err(CliError::NotLoggedIn),
        (Some(Route::Dashboard), None) => Err(CliError::AlreadyLoggedIn),
        (_, notice) => {
            println!("{}", notice_line(notice));
            Ok(())
        }
    }
}

fn notice_line(notice: Option<&str>) -> &str {
    notice.map(str::trim).filter(|n| !n.is_empty()).unwrap_or("ok")
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
