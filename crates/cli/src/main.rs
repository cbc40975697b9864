//! `pg-users` entry-point.
//!
//! Connects with the `DB_*` settings (optionally from a `.env` file), lists
//! every user, and disconnects. Takes no arguments beyond `--help` and
//! `--version`; outcomes are reported on stdout.

use anyhow::Result;
use clap::Parser;
use db::{DbConfig, Repository, UserRow};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pg-users",
    about = "List the users stored in the configured Postgres database",
    long_about = "List the users stored in the configured Postgres database.\n\n\
        Connection settings come from DB_HOST, DB_PORT, DB_NAME, DB_USER and \
        DB_PASSWORD (a .env file in the working directory is honoured).",
    version
)]
struct Cli {}

#[tokio::main]
async fn main() {
    let _cli = Cli::parse();

    if let Err(err) = init_tracing() {
        eprintln!("tracing init failed: {err}");
    }

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded .env from {}", path.display()),
        Err(err) if err.not_found() => debug!("No .env file found"),
        Err(err) => println!("⚠️ Ignoring unreadable .env file: {err}"),
    }

    let config = match DbConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("❌ Invalid configuration: {err}");
            return;
        }
    };

    run(config).await;
}

/// Log to stderr, `warn` and above unless `RUST_LOG` says otherwise.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}

async fn run(config: DbConfig) {
    let mut repo = Repository::new(config);

    if let Err(err) = repo.connect().await {
        println!("❌ Error while working with PostgreSQL: {err}");
        return;
    }
    println!("✅ Connected to PostgreSQL");

    match repo.list_users().await {
        Ok(users) => print_users(&users),
        Err(err) => println!("❌ Error while working with PostgreSQL: {err}"),
    }

    repo.disconnect().await;
    println!("\n🔒 PostgreSQL connection closed");
}

fn print_users(users: &[UserRow]) {
    println!("\n📊 Found {} users:\n", users.len());
    for user in users {
        println!("{}", format_user(user));
    }
}

fn format_user(user: &UserRow) -> String {
    let age = user
        .age
        .map(|age| age.to_string())
        .unwrap_or_else(|| "None".to_string());
    format!("ID: {}, Name: {}, Age: {}", user.id, user.name, age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["pg-users", "extra"]).is_err());
        assert!(Cli::try_parse_from(["pg-users"]).is_ok());
    }

    #[test]
    fn user_line_matches_listing_format() {
        let user = UserRow { id: 7, name: "Alice".into(), age: Some(30) };
        assert_eq!(format_user(&user), "ID: 7, Name: Alice, Age: 30");
    }

    #[test]
    fn missing_age_is_rendered_as_none() {
        let user = UserRow { id: 2, name: "Bob".into(), age: None };
        assert_eq!(format_user(&user), "ID: 2, Name: Bob, Age: None");
    }
}
