use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use youtube_resolver::{DownloadIntent, Settings, UnconfiguredArchive, YouTube};

#[derive(Parser)]
#[command(name = "youtube-resolver", about = "Resolve and fetch media through the remote API")]
struct Cli {
    /// Treat LINK as a bare video (or playlist) id
    #[arg(long, global = true)]
    id: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show title, duration and thumbnail
    Info { link: String },
    /// Download audio (default) or video into the cache
    Download {
        link: String,
        #[arg(long)]
        video: bool,
    },
    /// List downloadable formats
    Formats { link: String },
    /// List playlist entry ids
    Playlist {
        link: String,
        #[arg(long, default_value_t = 25)]
        limit: usize,
    },
    /// Estimate total size of all formats
    Size { link: String },
    /// Search by free text
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Re-fetch the remote API address
    Refresh,
}

#[tokio::main]
async fn main() -> ExitCode {
    youtube_resolver::init_tracing();
    let cli = Cli::parse();

    let youtube = match YouTube::new(Settings::from_env(), Arc::new(UnconfiguredArchive)) {
        Ok(youtube) => youtube,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Info { link } => match youtube.details(&link, cli.id).await {
            Ok(details) => {
                println!("{}", details.title);
                println!(
                    "{} ({}s)",
                    details.duration_text.as_deref().unwrap_or("live"),
                    details.duration_seconds
                );
                println!("{}", details.thumbnail);
                println!("{}", details.id);
            }
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        Command::Download { link, video } => {
            youtube.warm_up().await;
            let intent = if video { DownloadIntent::Video } else { DownloadIntent::Default };
            let delivery = youtube.download(&link, intent, cli.id, None, None).await;
            println!("{}", delivery.message);
            if !delivery.success {
                return ExitCode::FAILURE;
            }
        }
        Command::Formats { link } => {
            let (formats, link) = youtube.formats(&link, cli.id).await;
            if formats.is_empty() {
                eprintln!("no formats for {}", link);
                return ExitCode::FAILURE;
            }
            for f in formats {
                let size = f.filesize.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string());
                println!("{:>8}  {:<5} {:>12}  {}", f.format_id, f.ext, size, f.format);
            }
        }
        Command::Playlist { link, limit } => {
            for id in youtube.playlist(&link, limit, cli.id).await {
                println!("{}", id);
            }
        }
        Command::Size { link } => match youtube.file_size(&link, cli.id).await {
            Some(total) => println!("{}", total),
            None => {
                eprintln!("size unavailable");
                return ExitCode::FAILURE;
            }
        },
        Command::Search { query, limit } => match youtube.search(&query, limit).await {
            Ok(results) => {
                for r in results {
                    println!("{}  {:>8}  {}", r.id, r.duration_text.as_deref().unwrap_or("live"), r.title);
                }
            }
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        Command::Refresh => match youtube.refresh_resolver().await {
            Ok(address) => println!("{}", address),
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}
