// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use askdata_core::auth::password::hash_password;
use askdata_core::auth::postgres::PgStore;
use askdata_core::auth::session::normalize_email;
use askdata_core::auth::store::{CredentialStore, PrincipalStore};
use askdata_core::models::auth::AdminProvision;
use clap::Parser;
use cli::{Cli, Commands, DbArgs};
use sqlx::postgres::PgPoolOptions;

mod cli;
mod logging;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::CreateAdmin {
            db,
            email,
            password,
        } => {
            let store = connect(&db).await?;
            ensure_password(&password)?;
            let hash = hash_password(&password)?;
            match store.upsert_admin(&normalize_email(&email), &hash).await? {
                AdminProvision::Created(p) => log::info!("created admin {} ({})", p.email, p.id),
                AdminProvision::Updated(p) => log::info!("updated admin {} ({})", p.email, p.id),
            }
        }
        Commands::AddUser {
            db,
            email,
            password,
            admin,
        } => {
            let store = connect(&db).await?;
            ensure_password(&password)?;
            let hash = hash_password(&password)?;
            let p = store
                .create_principal(&normalize_email(&email), &hash, admin)
                .await?;
            log::info!("created user {} ({}) admin={}", p.email, p.id, p.is_admin);
        }
        Commands::RevokeSessions { db, email } => {
            let store = connect(&db).await?;
            let email = normalize_email(&email);
            let found = store
                .find_principal_by_email(&email)
                .await?
                .ok_or_else(|| Error::Custom(format!("no principal with email {email}")))?;
            let revoked = store
                .revoke_all_for_subject(&found.principal.id)
                .await?;
            log::info!("revoked {revoked} session(s) for {email}");
        }
    }

    Ok(())
}

async fn connect(db: &DbArgs) -> Result<PgStore> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&db.database_url)
        .await?;
    askdata_core::migrate::migrate(&pool).await?;
    Ok(PgStore::new(pool))
}

fn ensure_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::Custom("password must not be empty".into()));
    }
    Ok(())
}
