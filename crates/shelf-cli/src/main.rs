mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Bookshelf storefront operator CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env ...). Defaults apply when omitted.
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Order administration
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Account administration
    User {
        #[command(subcommand)]
        cmd: UserCmd,
    },

    /// Print storefront counters and revenue
    Stats,
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity + schema presence
    Status,

    /// Apply embedded SQL migrations
    Migrate,
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Print one order with its items
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Set an order's status (pending | sent | completed | cancelled)
    SetStatus {
        #[arg(long)]
        id: i64,

        #[arg(long)]
        status: String,
    },
}

#[derive(Subcommand)]
enum UserCmd {
    /// Create an admin account; password comes from SHELF_ADMIN_PASSWORD
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let (pool, _) = commands::connect(&cli.config_paths).await?;
            match cmd {
                DbCmd::Status => {
                    let s = shelf_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate => {
                    shelf_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = shelf_config::load_layered_yaml(&path_refs)?;
            // Typed check so a hash is never printed for a config the daemon would reject.
            shelf_config::ShelfSettings::from_loaded(&loaded)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Order { cmd } => {
            let (pool, _) = commands::connect(&cli.config_paths).await?;
            match cmd {
                OrderCmd::Show { id } => commands::order::show(&pool, id).await?,
                OrderCmd::SetStatus { id, status } => {
                    commands::order::set_status(&pool, id, &status).await?
                }
            }
        }

        Commands::User { cmd } => {
            let (pool, _) = commands::connect(&cli.config_paths).await?;
            match cmd {
                UserCmd::CreateAdmin { username, email } => {
                    commands::user::create_admin(&pool, &username, &email).await?
                }
            }
        }

        Commands::Stats => {
            let (pool, _) = commands::connect(&cli.config_paths).await?;
            let s = shelf_db::stats::fetch_stats(&pool).await?;
            println!("total_users={}", s.total_users);
            println!("total_books={}", s.total_books);
            println!("total_orders={}", s.total_orders);
            println!("total_revenue={}", s.total_revenue);
        }
    }

    Ok(())
}
