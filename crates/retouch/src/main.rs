//! Command-line front end for the retouch backend.
//!
//! Settings come from the environment (a `.env` file in the working
//! directory is loaded first). See [`retouch::config::AppConfig`].
//!
//! # Examples
//!
//! ```sh
//! # Newest editable posts as JSON (live, then cache, then mock)
//! retouch posts --limit 5
//!
//! # Skip the live source
//! retouch posts --cached
//!
//! # Turn a request into an editing instruction
//! retouch analyze --title "Remove the guy in the back" --body "Beach photo"
//!
//! # Edit a remote or local image and keep the result
//! retouch edit --image https://i.redd.it/abc.jpg --prompt "Make the sky purple" --save
//!
//! # Store a file in the uploads directory
//! retouch upload ./photo.png
//!
//! # One cleanup pass, or the recurring janitor until Ctrl-C
//! retouch cleanup
//! retouch janitor
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use retouch::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Browse r/PhotoshopRequest and edit images with a vision model.
#[derive(Parser)]
#[command(name = "retouch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print editable posts as JSON.
    Posts {
        /// Maximum number of submissions requested from the live source
        #[arg(long, default_value_t = 25)]
        limit: u32,

        /// Serve from the cache snapshot (or mock data) without going live
        #[arg(long)]
        cached: bool,
    },

    /// Produce an editing instruction from a request's text.
    Analyze {
        /// Post title
        #[arg(long)]
        title: String,

        /// Post body
        #[arg(long, default_value = "")]
        body: String,
    },

    /// Edit an image and print the result as JSON.
    Edit {
        /// Image URL or local path
        #[arg(long)]
        image: String,

        /// Editing instruction
        #[arg(long)]
        prompt: String,

        /// Also write the edited image into the edited-images directory
        #[arg(long)]
        save: bool,
    },

    /// Copy a file into the uploads directory under a unique name.
    Upload {
        /// File to store
        file: PathBuf,
    },

    /// Run one quota-triggered cleanup pass.
    Cleanup,

    /// Run the cleanup policy on a fixed interval until interrupted.
    Janitor,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();

    match cli.command {
        Command::Posts { limit, cached } => {
            let resolver = config.build_resolver()?;
            let (tier, posts) = resolver.resolve_tiered(limit, cached).await;
            info!("{} posts from {tier} tier", posts.len());
            print_json(&posts)?;
        }
        Command::Analyze { title, body } => {
            let analysis = config.build_analyzer()?.analyze(&title, &body).await?;
            println!("{analysis}");
        }
        Command::Edit {
            image,
            prompt,
            save,
        } => {
            let result = config.build_editor()?.edit(&image, &prompt).await;
            if save && let Some(uri) = &result.edited_image_data {
                let path = save_data_uri(&config.edited_dir, uri)?;
                eprintln!("Saved {}", path.display());
            }
            print_json(&result)?;
        }
        Command::Upload { file } => {
            let bytes = std::fs::read(&file)
                .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let stored = store_upload(&config.uploads_dir, name, &bytes)?;
            println!("{}", stored.display());
        }
        Command::Cleanup => {
            let report = config.build_cleanup_policy().run();
            println!(
                "usage {:.2} MB / {:.0} MB, swept: {}, deleted {} upload(s) and {} edited image(s)",
                report.usage_before_mb,
                report.ceiling_mb,
                report.swept,
                report.uploads_deleted,
                report.edited_deleted,
            );
        }
        Command::Janitor => {
            let every = config.cleanup_interval;
            info!(
                "Starting storage janitor: every {:.1} h, ceiling {} MB",
                every.as_secs_f64() / 3600.0,
                config.max_storage_mb
            );
            let handle = spawn_janitor(config.build_cleanup_policy(), every);
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| format!("failed to listen for Ctrl-C: {e}"))?;
            info!("Shutting down janitor");
            handle.abort();
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json =
        serde_json::to_string_pretty(value).map_err(|e| format!("failed to encode JSON: {e}"))?;
    println!("{json}");
    Ok(())
}
