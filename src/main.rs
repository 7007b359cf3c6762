use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use client_directory::models::{ClientChanges, ClientFilter, ClientPhone, NewClient, PhoneUpdate};
use client_directory::{config, db, Database};

/// Manage clients and their phone numbers in PostgreSQL.
#[derive(Debug, Parser)]
#[command(name = "client-directory", version, about)]
struct Cli {
    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the client and phone tables if they are missing.
    CreateTables,
    /// Drop both tables and all their data.
    DropTables,
    /// Drop the tables if present and create them again.
    ResetTables,
    /// Add a client, optionally with phone numbers.
    AddClient(AddClientArgs),
    /// Change a client's name, email or phone list.
    ChangeClient(ChangeClientArgs),
    /// Delete a client.
    DeleteClient(DeleteClientArgs),
    /// Add a phone number to a client.
    AddPhone(PhoneArgs),
    /// Delete one phone number of a client.
    DeletePhone(PhoneArgs),
    /// Delete every phone number of a client.
    DeletePhones { client_id: i32 },
    /// Find clients by any combination of fields.
    Find(FindArgs),
    /// Run the scripted walkthrough against a fresh schema.
    Demo,
}

#[derive(Debug, Args)]
struct AddClientArgs {
    #[arg(long)]
    first: String,
    #[arg(long)]
    last: String,
    #[arg(long)]
    email: String,
    /// Phone number; repeat for several.
    #[arg(long = "phone")]
    phones: Vec<String>,
}

#[derive(Debug, Args)]
struct ChangeClientArgs {
    client_id: i32,
    #[arg(long)]
    first: Option<String>,
    #[arg(long)]
    last: Option<String>,
    #[arg(long)]
    email: Option<String>,
    /// Replace the phone list with these numbers; repeat for several.
    #[arg(long = "phone", conflicts_with = "clear_phones")]
    phones: Vec<String>,
    /// Remove every phone of the client.
    #[arg(long)]
    clear_phones: bool,
}

impl ChangeClientArgs {
    fn into_changes(self) -> ClientChanges {
        let phones = if self.clear_phones {
            PhoneUpdate::Replace(Vec::new())
        } else if self.phones.is_empty() {
            PhoneUpdate::Keep
        } else {
            PhoneUpdate::Replace(self.phones)
        };

        ClientChanges {
            first_name: self.first,
            last_name: self.last,
            email: self.email,
            phones,
        }
    }
}

#[derive(Debug, Args)]
struct DeleteClientArgs {
    client_id: i32,
    /// Delete the client's phones in the same transaction.
    #[arg(long)]
    cascade: bool,
}

#[derive(Debug, Args)]
struct PhoneArgs {
    client_id: i32,
    number: String,
}

#[derive(Debug, Args)]
struct FindArgs {
    #[arg(long)]
    first: Option<String>,
    #[arg(long)]
    last: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

impl From<FindArgs> for ClientFilter {
    fn from(args: FindArgs) -> Self {
        Self {
            first_name: args.first,
            last_name: args.last,
            email: args.email,
            phone: args.phone,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .init();

    let config = config::init()?;
    let db = db::init(&config).await?;
    tracing::debug!("database connection established");

    let result = run(&db, cli.command).await;

    db.close().await;
    result
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` when set, otherwise the level picked by `-v`
fn log_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose)))
}

async fn run(db: &Database, command: Commands) -> Result<()> {
    match command {
        Commands::CreateTables => db.create_tables().await?,
        Commands::DropTables => db.drop_tables().await?,
        Commands::ResetTables => db.reset_tables().await?,
        Commands::AddClient(args) => {
            let client =
                NewClient::new(&args.first, &args.last, &args.email).with_phones(args.phones);
            let id = db.add_client(&client).await?;
            println!("{id}");
        }
        Commands::ChangeClient(args) => {
            let id = args.client_id;
            db.change_client(id, &args.into_changes()).await?;
        }
        Commands::DeleteClient(args) => {
            if args.cascade {
                let removed = db.delete_client_cascade(args.client_id).await?;
                println!("removed {removed} phone(s)");
            } else {
                let removed = db.delete_client(args.client_id).await?;
                println!("removed {removed} client(s)");
            }
        }
        Commands::AddPhone(args) => {
            let id = db.add_phone(args.client_id, &args.number).await?;
            println!("{id}");
        }
        Commands::DeletePhone(args) => {
            let removed = db.delete_phone(args.client_id, &args.number).await?;
            println!("removed {removed} phone(s)");
        }
        Commands::DeletePhones { client_id } => {
            let removed = db.delete_phones(client_id).await?;
            println!("removed {removed} phone(s)");
        }
        Commands::Find(args) => print_rows(&db.find_client(&args.into()).await?),
        Commands::Demo => demo(db).await?,
    }

    Ok(())
}

/// Walk through every operation once, stopping at the first failure
async fn demo(db: &Database) -> Result<()> {
    db.reset_tables().await?;

    let ivan = db
        .add_client(
            &NewClient::new("Ivan", "Petrov", "petrov@mail.ru")
                .with_phones(["79096785678", "79035678767"]),
        )
        .await?;
    let sergey = db
        .add_client(
            &NewClient::new("Sergey", "Ivanov", "ivanov@mail.ru")
                .with_phones(["79096785670", "79035678798"]),
        )
        .await?;
    let alexey = db
        .add_client(&NewClient::new("Alexey", "Sidorov", "sidorov@mail.ru"))
        .await?;

    db.change_client(
        sergey,
        &ClientChanges {
            first_name: Some("Petr".to_string()),
            last_name: Some("Sokolov".to_string()),
            ..Default::default()
        },
    )
    .await?;

    db.add_phone(ivan, "79267869050").await?;
    db.delete_phone(ivan, "79035678767").await?;
    db.delete_client(alexey).await?;

    let rows = db
        .find_client(&ClientFilter {
            first_name: Some("Ivan".to_string()),
            ..Default::default()
        })
        .await?;
    print_rows(&rows);

    Ok(())
}

fn print_rows(rows: &[ClientPhone]) {
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            row.client_id, row.firstname, row.lastname, row.email, row.number
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Commands {
        Cli::try_parse_from(std::iter::once("client-directory").chain(args.iter().copied()))
            .expect("arguments parse")
            .command
    }

    fn changes(args: &[&str]) -> ClientChanges {
        match parse(args) {
            Commands::ChangeClient(args) => args.into_changes(),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn change_without_phone_flags_keeps_phones() {
        let changes = changes(&["change-client", "2", "--first", "Petr"]);
        assert_eq!(changes.first_name.as_deref(), Some("Petr"));
        assert_eq!(changes.last_name, None);
        assert_eq!(changes.phones, PhoneUpdate::Keep);
    }

    #[test]
    fn repeated_phone_flags_replace_the_list() {
        let changes = changes(&["change-client", "2", "--phone", "1", "--phone", "2"]);
        assert_eq!(
            changes.phones,
            PhoneUpdate::Replace(vec!["1".to_string(), "2".to_string()])
        );
    }

    #[test]
    fn clear_phones_replaces_with_nothing() {
        let changes = changes(&["change-client", "2", "--clear-phones"]);
        assert_eq!(changes.phones, PhoneUpdate::Replace(Vec::new()));
        assert!(!changes.is_empty());
    }

    #[test]
    fn clear_phones_conflicts_with_phone() {
        let result = Cli::try_parse_from([
            "client-directory",
            "change-client",
            "2",
            "--phone",
            "1",
            "--clear-phones",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_picks_the_default_level() {
        assert_eq!(default_log_level(0), "info");
        assert_eq!(default_log_level(1), "debug");
        assert_eq!(default_log_level(5), "trace");
    }

    #[test]
    fn find_flags_become_filters() {
        let args = ["find", "--first", "Ivan", "--phone", "79096785678"];
        let filter: ClientFilter = match parse(&args) {
            Commands::Find(args) => args.into(),
            other => panic!("unexpected command {other:?}"),
        };
        assert_eq!(filter.first_name.as_deref(), Some("Ivan"));
        assert_eq!(filter.last_name, None);
        assert_eq!(filter.email, None);
        assert_eq!(filter.phone.as_deref(), Some("79096785678"));
    }
}
