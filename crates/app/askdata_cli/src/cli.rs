use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "askdata", about = "Askdata operator tools", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the admin principal, or update the existing one.
    CreateAdmin {
        #[command(flatten)]
        db: DbArgs,

        #[arg(long, env = "ADMIN_EMAIL")]
        email: String,

        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a principal.
    AddUser {
        #[command(flatten)]
        db: DbArgs,

        #[arg(long)]
        email: String,

        #[arg(long, env = "ASKDATA_USER_PASSWORD", hide_env_values = true)]
        password: String,

        /// Grant the admin flag.
        #[arg(long, default_value_t = false)]
        admin: bool,
    },

    /// Revoke every refresh token held by a principal.
    RevokeSessions {
        #[command(flatten)]
        db: DbArgs,

        #[arg(long)]
        email: String,
    },

    /// Print the CLI version.
    Version,
}

#[derive(Args, Debug)]
pub struct DbArgs {
    /// PostgreSQL connection URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,
}
