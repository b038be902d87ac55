mod catalog_cmds;
mod config;
mod plan_cmds;
mod serve_cmd;

use clap::{Args, Parser, Subcommand};

use diet_db::models::MealKind;
use diet_db::pool;

use config::DietConfig;

#[derive(Parser)]
#[command(name = "diet", about = "Weekly meal planner with fair food rotation")]
struct Cli {
    /// Database URL (overrides DIET_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a diet config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = diet_db::config::DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Address the HTTP server binds to
        #[arg(long, default_value = config::ServerSection::DEFAULT_BIND)]
        bind: String,
        /// Port the HTTP server listens on
        #[arg(long, default_value_t = config::ServerSection::DEFAULT_PORT)]
        port: u16,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the database if needed and apply migrations
    DbInit,
    /// Run the HTTP API
    Serve {
        /// Bind address (overrides the config file)
        #[arg(long)]
        bind: Option<String>,
        /// Port (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Ingredient management
    Ingredient {
        #[command(subcommand)]
        command: IngredientCommands,
    },
    /// Food management
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Week plans
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
}

#[derive(Subcommand)]
pub enum IngredientCommands {
    /// Add an ingredient
    Add {
        /// Ingredient name (unique, case-insensitive)
        name: String,
    },
    /// List all ingredients
    List,
    /// Rename an ingredient
    Rename {
        /// Ingredient ID
        id: String,
        /// New name
        name: String,
    },
    /// Remove an ingredient no food uses
    Remove {
        /// Ingredient ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum FoodCommands {
    /// Add a food
    Add {
        /// Food name (unique, case-insensitive)
        name: String,
        /// Meal kinds the food may be served at (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        meals: Vec<MealKind>,
        /// Ingredient IDs (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ingredients: Vec<String>,
    },
    /// List all foods with their ingredients
    List,
    /// Replace a food's name, meal kinds and ingredients
    Update {
        /// Food ID
        id: String,
        /// New name
        #[arg(long)]
        name: String,
        /// Meal kinds (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        meals: Vec<MealKind>,
        /// Ingredient IDs (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ingredients: Vec<String>,
    },
    /// Remove a food no plan uses
    Remove {
        /// Food ID
        id: String,
    },
}

/// Which week a plan command applies to. Defaults to the current week.
#[derive(Args, Debug, Clone)]
pub struct WeekArgs {
    /// Use next week instead of the current one
    #[arg(long, conflicts_with_all = ["year", "week"])]
    upcoming: bool,
    /// ISO week-numbering year
    #[arg(long, requires = "week")]
    year: Option<i32>,
    /// ISO week number (1-53)
    #[arg(long, requires = "year")]
    week: Option<u32>,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate a week plan
    Generate {
        #[command(flatten)]
        week: WeekArgs,
    },
    /// Show a week plan
    Show {
        #[command(flatten)]
        week: WeekArgs,
    },
    /// List stored week plans
    List,
    /// Put a food in one slot by hand
    Replace {
        /// Day of week, 1 (Monday) to 7 (Sunday)
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=7))]
        day: i32,
        /// Meal kind: breakfast, lunch or dinner
        #[arg(long)]
        meal: MealKind,
        /// Food ID
        #[arg(long)]
        food: String,
        #[command(flatten)]
        week: WeekArgs,
    },
    /// Serve this meal's leftovers at the same meal the next day
    Leftover {
        /// Day of week, 1 (Monday) to 7 (Sunday)
        #[arg(long, value_parser = clap::value_parser!(i32).range(1..=7))]
        day: i32,
        /// Meal kind: breakfast, lunch or dinner
        #[arg(long)]
        meal: MealKind,
        /// Remove the leftover link instead
        #[arg(long)]
        off: bool,
        #[command(flatten)]
        week: WeekArgs,
    },
    /// Ingredients needed for a week
    Groceries {
        #[command(flatten)]
        week: WeekArgs,
    },
}

/// Execute the `diet init` command: write config file.
fn cmd_init(db_url: &str, bind: &str, port: u16, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        server: config::ServerSection {
            bind: bind.to_string(),
            port,
        },
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!("  server       = {bind}:{port}");
    println!();
    println!("Next: run `diet db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `diet db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = DietConfig::resolve(cli_db_url)?;

    println!("Initializing diet database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("diet db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init {
            db_url,
            bind,
            port,
            force,
        } => {
            cmd_init(&db_url, &bind, port, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Serve { bind, port } => {
            let resolved = DietConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let bind = bind.unwrap_or(resolved.server.bind);
            let port = port.unwrap_or(resolved.server.port);
            let result = serve_cmd::run_serve(db_pool.clone(), &bind, port).await;
            db_pool.close().await;
            result?;
        }
        Commands::Ingredient { command } => {
            let resolved = DietConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = catalog_cmds::run_ingredient_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Food { command } => {
            let resolved = DietConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = catalog_cmds::run_food_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = DietConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}
