//! nats-identity CLI: the `nid` command.
//!
//! Issues operators, accounts and users into a local store and generates
//! user credentials from their templates. Every command is a request to the
//! same dispatch layer a server front-end would use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use nats_identity::{
    Backend, DirectoryStorage, NatsIssuer, Operation, Request, Response, SealedStorage, Storage,
};

// ── Directory helpers ─────────────────────────────────────────────────────────

fn default_store_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME not set; pass --store or set NID_HOME")?;
    Ok(PathBuf::from(home).join(".nats-identity"))
}

fn open_storage(dir: &Path, passphrase_env: Option<&str>) -> Result<Arc<dyn Storage>> {
    let directory = DirectoryStorage::new(dir)
        .with_context(|| format!("failed to open store at {}", dir.display()))?;
    let Some(var) = passphrase_env else {
        return Ok(Arc::new(directory));
    };
    let passphrase =
        std::env::var(var).with_context(|| format!("environment variable {var} is not set"))?;
    let sealed = SealedStorage::open(directory, &passphrase).context("failed to unseal store")?;
    Ok(Arc::new(sealed))
}

// ── Time formatting helpers ───────────────────────────────────────────────────

fn unix_to_datetime(secs: i64) -> String {
    match chrono::DateTime::from_timestamp(secs, 0) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{secs} (out of range)"),
    }
}

// ── Request helpers ───────────────────────────────────────────────────────────

fn identity_path(root: &str, operator: &str, account: Option<&str>, user: Option<&str>) -> String {
    let mut path = format!("{root}/operator/{operator}");
    if let Some(account) = account {
        path.push_str(&format!("/account/{account}"));
        if let Some(user) = user {
            path.push_str(&format!("/user/{user}"));
        }
    }
    path
}

fn children_path(root: &str, operator: Option<&str>, account: Option<&str>) -> String {
    match (operator, account) {
        (None, _) => format!("{root}/operator/"),
        (Some(op), None) => format!("{root}/operator/{op}/account/"),
        (Some(op), Some(acc)) => format!("{root}/operator/{op}/account/{acc}/user/"),
    }
}

fn read_body(data: Option<&str>, data_file: Option<&Path>) -> Result<Value> {
    let text = match (data, data_file) {
        (Some(_), Some(_)) => return Err(anyhow!("--data and --data-file are mutually exclusive")),
        (Some(text), None) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        (None, None) => return Ok(Value::Null),
    };
    serde_json::from_str(&text).context("request body is not valid JSON")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// nats-identity CLI. Issue NATS operators, accounts and users, and
/// generate user credentials.
#[derive(Parser, Debug)]
#[command(
    name = "nid",
    about = "nats-identity CLI",
    version,
    long_about = "nid: nats-identity CLI\n\nIssue NATS operators, accounts and users with their nkeys and JWTs,\nand generate user credentials from parameterized claim templates."
)]
struct Cli {
    /// Store directory (default: $HOME/.nats-identity)
    #[arg(long, global = true, env = "NID_HOME")]
    store: Option<PathBuf>,

    /// Name of an environment variable holding a passphrase; values are
    /// encrypted at rest when set
    #[arg(long, global = true)]
    passphrase_env: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage operators
    Operator {
        #[command(subcommand)]
        subcommand: OperatorCommands,
    },

    /// Manage accounts
    Account {
        #[command(subcommand)]
        subcommand: AccountCommands,
    },

    /// Manage user templates
    User {
        #[command(subcommand)]
        subcommand: UserCommands,
    },

    /// Generate credentials for a user
    Creds {
        operator: String,
        account: String,
        user: String,

        /// Template parameters, `k=v,k2=v2` or a JSON object
        #[arg(long, short)]
        parameters: Option<String>,

        /// Write the credentials file here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print the full JSON response instead of the creds text
        #[arg(long)]
        json: bool,
    },

    /// Inspect nkeys (public keys only)
    Nkey {
        #[command(subcommand)]
        subcommand: KeyCommands,
    },

    /// Inspect stored operator and account JWTs
    Jwt {
        #[command(subcommand)]
        subcommand: KeyCommands,
    },
}

#[derive(Subcommand, Debug)]
enum OperatorCommands {
    /// Create or update an operator
    Issue {
        operator: String,
        /// Issue record as JSON
        #[arg(long)]
        data: Option<String>,
        /// Read the issue record from a file
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
    /// Show an operator
    Read { operator: String },
    /// List operators
    List,
    /// Delete an operator with all its accounts and users
    Delete { operator: String },
}

#[derive(Subcommand, Debug)]
enum AccountCommands {
    /// Create or update an account
    Issue {
        operator: String,
        account: String,
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
    /// Show an account
    Read { operator: String, account: String },
    /// List the accounts of an operator
    List { operator: String },
    /// Delete an account with all its users
    Delete { operator: String, account: String },
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// Create or update a user template
    Issue {
        operator: String,
        account: String,
        user: String,
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        data_file: Option<PathBuf>,
    },
    /// Show a user template
    Read {
        operator: String,
        account: String,
        user: String,
    },
    /// List the users of an account
    List { operator: String, account: String },
    /// Delete a user and revoke its key
    Delete {
        operator: String,
        account: String,
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum KeyCommands {
    /// Show one entry
    Read {
        operator: String,
        account: Option<String>,
        user: Option<String>,
    },
    /// List the children of an operator or account (all operators if none)
    List {
        operator: Option<String>,
        account: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = match cli.store {
        Some(dir) => dir,
        None => default_store_dir()?,
    };
    let storage = open_storage(&store, cli.passphrase_env.as_deref())?;
    let backend = Backend::new(NatsIssuer::new(storage));

    match cli.command {
        Commands::Operator { subcommand } => match subcommand {
            OperatorCommands::Issue {
                operator,
                data,
                data_file,
            } => cmd_issue(
                &backend,
                identity_path("issue", &operator, None, None),
                read_body(data.as_deref(), data_file.as_deref())?,
            ),
            OperatorCommands::Read { operator } => cmd_read(
                &backend,
                identity_path("issue", &operator, None, None),
                Value::Null,
            ),
            OperatorCommands::List => cmd_list(&backend, children_path("issue", None, None)),
            OperatorCommands::Delete { operator } => {
                cmd_delete(&backend, identity_path("issue", &operator, None, None))
            }
        },
        Commands::Account { subcommand } => match subcommand {
            AccountCommands::Issue {
                operator,
                account,
                data,
                data_file,
            } => cmd_issue(
                &backend,
                identity_path("issue", &operator, Some(&account), None),
                read_body(data.as_deref(), data_file.as_deref())?,
            ),
            AccountCommands::Read { operator, account } => cmd_read(
                &backend,
                identity_path("issue", &operator, Some(&account), None),
                Value::Null,
            ),
            AccountCommands::List { operator } => {
                cmd_list(&backend, children_path("issue", Some(&operator), None))
            }
            AccountCommands::Delete { operator, account } => cmd_delete(
                &backend,
                identity_path("issue", &operator, Some(&account), None),
            ),
        },
        Commands::User { subcommand } => match subcommand {
            UserCommands::Issue {
                operator,
                account,
                user,
                data,
                data_file,
            } => cmd_issue(
                &backend,
                identity_path("issue", &operator, Some(&account), Some(&user)),
                read_body(data.as_deref(), data_file.as_deref())?,
            ),
            UserCommands::Read {
                operator,
                account,
                user,
            } => cmd_read(
                &backend,
                identity_path("issue", &operator, Some(&account), Some(&user)),
                Value::Null,
            ),
            UserCommands::List { operator, account } => cmd_list(
                &backend,
                children_path("issue", Some(&operator), Some(&account)),
            ),
            UserCommands::Delete {
                operator,
                account,
                user,
            } => cmd_delete(
                &backend,
                identity_path("issue", &operator, Some(&account), Some(&user)),
            ),
        },
        Commands::Creds {
            operator,
            account,
            user,
            parameters,
            output,
            json,
        } => cmd_creds(
            &backend,
            identity_path("creds", &operator, Some(&account), Some(&user)),
            parameters,
            output.as_deref(),
            json,
        ),
        Commands::Nkey { subcommand } => cmd_keys(&backend, "nkey", subcommand),
        Commands::Jwt { subcommand } => cmd_keys(&backend, "jwt", subcommand),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

type CliBackend = Backend<NatsIssuer>;

fn handle(backend: &CliBackend, operation: Operation, path: String, data: Value) -> Result<Value> {
    let response = backend
        .handle(Request::new(operation, path.clone()).with_data(data))
        .with_context(|| format!("{operation} {path} failed"))?;
    Ok(response.into_value())
}

/// `nid {operator|account|user} issue ... [--data JSON]`
fn cmd_issue(backend: &CliBackend, path: String, body: Value) -> Result<()> {
    let value = handle(backend, Operation::Update, path, body)?;
    print_json(&value)
}

fn cmd_read(backend: &CliBackend, path: String, data: Value) -> Result<()> {
    let value = handle(backend, Operation::Read, path, data)?;
    print_json(&value)
}

fn cmd_list(backend: &CliBackend, path: String) -> Result<()> {
    let response = backend
        .handle(Request::new(Operation::List, path.clone()))
        .with_context(|| format!("list {path} failed"))?;
    match response {
        Response::List(keys) if keys.is_empty() => {
            eprintln!("(none)");
        }
        Response::List(keys) => {
            for key in keys {
                println!("{key}");
            }
        }
        other => print_json(&other.into_value())?,
    }
    Ok(())
}

fn cmd_delete(backend: &CliBackend, path: String) -> Result<()> {
    handle(backend, Operation::Delete, path.clone(), Value::Null)?;
    eprintln!("Deleted {path}");
    Ok(())
}

/// `nid creds OP ACC USER [--parameters P] [--output FILE] [--json]`
fn cmd_creds(
    backend: &CliBackend,
    path: String,
    parameters: Option<String>,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let data = match parameters {
        Some(raw) => serde_json::json!({ "parameters": raw }),
        None => Value::Null,
    };
    let value = handle(backend, Operation::Read, path, data)?;
    if json {
        return print_json(&value);
    }

    let creds = value
        .get("creds")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("response carries no credentials"))?;
    match output {
        Some(file) => {
            std::fs::write(file, creds)
                .with_context(|| format!("failed to write {}", file.display()))?;
            eprintln!("Wrote credentials to {}", file.display());
        }
        None => print!("{creds}"),
    }

    match value.get("expiresAt").and_then(Value::as_i64) {
        Some(at) => eprintln!("Expires: {}", unix_to_datetime(at)),
        None => eprintln!("Expires: never"),
    }
    Ok(())
}

/// `nid {nkey|jwt} read OP [ACC [USER]]` and `nid {nkey|jwt} list [OP [ACC]]`
fn cmd_keys(backend: &CliBackend, root: &str, subcommand: KeyCommands) -> Result<()> {
    match subcommand {
        KeyCommands::Read {
            operator,
            account,
            user,
        } => {
            if user.is_some() && account.is_none() {
                return Err(anyhow!("a user requires an account"));
            }
            let path = identity_path(root, &operator, account.as_deref(), user.as_deref());
            cmd_read(backend, path, Value::Null)
        }
        KeyCommands::List { operator, account } => {
            cmd_list(backend, children_path(root, operator.as_deref(), account.as_deref()))
        }
    }
}
