mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;
use vs_core::config::Config;

fn init_logging(verbose: bool, json: bool) {
    // RUST_LOG wins; otherwise pick defaults based on the verbose flag.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(
                "vidstream=trace,vs_server=trace,vs_av=debug,vs_media=debug,vs_db=debug,vs_core=debug,tower_http=debug",
            )
        } else {
            EnvFilter::new("vidstream=info,vs_server=info,vs_av=info,vs_db=info,vs_core=info,tower_http=warn")
        }
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn start_server(config_path: &std::path::Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = Config::load_or_default(Some(config_path));

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidstream {}", env!("CARGO_PKG_VERSION"));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(vs_server::start(config))?;
    Ok(())
}

fn check_tools(config_path: &std::path::Path) -> Result<()> {
    println!("Checking external tools...\n");

    let config = Config::load_or_default(Some(config_path));
    let tools = vs_av::ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Uploads cannot be transcoded until it is installed.");
    }

    Ok(())
}

fn list_videos(config_path: &std::path::Path, json: bool) -> Result<()> {
    let config = Config::load_or_default(Some(config_path));
    let pool = vs_db::pool::init_pool(&config.server.db_path)
        .with_context(|| format!("opening {}", config.server.db_path.display()))?;
    let conn = vs_db::pool::get_conn(&pool)?;
    let videos = vs_db::queries::videos::list_videos(&conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&videos)?);
        return Ok(());
    }

    if videos.is_empty() {
        println!("No videos stored.");
        return Ok(());
    }

    println!("{:<40} {:<8} {:<10} {:>12}  NAME", "FILE", "STATUS", "LAYOUT", "SIZE");
    for v in &videos {
        println!(
            "{:<40} {:<8} {:<10} {:>12}  {}",
            v.file_name, v.status, v.layout, v.size, v.display_name
        );
    }
    Ok(())
}

fn validate_config(path: &std::path::Path) -> Result<()> {
    println!("Validating config: {}", path.display());

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config = Config::from_json(&contents)?;

    println!("✓ Configuration parsed");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Uploads: {}", config.storage.upload_dir.display());
    println!("  Layout: {}", config.transcode.layout);

    let warnings = config.validate();
    for w in &warnings {
        println!("  ! {w}");
    }
    if warnings.is_empty() {
        println!("✓ No warnings");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Start { host, port } => start_server(&cli.config, host, port),
        Commands::CheckTools => check_tools(&cli.config),
        Commands::List { json } => list_videos(&cli.config, json),
        Commands::Validate => validate_config(&cli.config),
    }
}
