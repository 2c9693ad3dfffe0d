//! CLI entry point for pubfetch.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pubfetch::{
    ArchiveFetcher, DefaultHttpClient, DefaultResourceContentExtractorFactory, FetchConfig,
    Fetcher, HttpClient, HttpFetcher, HttpRequest, Link, Resource, ResourceContentExtractor,
    ResourceContentExtractorFactory, ResourceExt,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (warn)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Resource bytes go to stdout, logs to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = resolve_config(&args)?;
    let client = DefaultHttpClient::with_config(&config).context("Failed to build HTTP client")?;

    match args.command {
        Command::Ls { source } => {
            let fetcher = open_source(&source, &client, args.password).await?;
            let links = fetcher.links();
            if links.is_empty() && is_remote(&source) {
                info!("remote sources cannot be listed");
            }
            let mut stdout = std::io::stdout().lock();
            for link in links {
                writeln!(
                    stdout,
                    "{}\t{}",
                    link.href,
                    link.media_type.as_deref().unwrap_or("-")
                )?;
            }
            fetcher.close();
        }

        Command::Cat {
            source,
            href,
            range,
            buffer,
        } => {
            let fetcher = open_source(&source, &client, args.password).await?;
            let resource = fetcher.get(&Link::new(href.as_str()));
            let data = match buffer {
                Some(size) => {
                    let size = size.unwrap_or(config.buffer_size);
                    resource.buffered(size).read(range).await
                }
                None => resource.read(range).await,
            }
            .with_context(|| format!("Failed to read '{href}' from '{source}'"))?;

            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await?;
            stdout.flush().await?;
            fetcher.close();
        }

        Command::Text { source, href } => {
            let fetcher = open_source(&source, &client, args.password).await?;
            let resource = fetcher.get(&Link::new(href.as_str()));
            let Some(extractor) = DefaultResourceContentExtractorFactory.create(&resource) else {
                bail!("No text extractor for '{href}': unsupported media type");
            };
            let text = extractor
                .extract_text(&resource)
                .await
                .with_context(|| format!("Failed to extract text of '{href}'"))?;
            println!("{text}");
            resource.close();
            fetcher.close();
        }

        Command::Download { url, output } => {
            download(&client, &url, &output, args.quiet).await?;
        }
    }

    Ok(())
}

fn resolve_config(args: &Args) -> Result<FetchConfig> {
    let mut config = match &args.config {
        Some(path) => FetchConfig::load(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => {
            let (config, path) = FetchConfig::load_default().context("Failed to load config")?;
            if let Some(path) = path {
                debug!(path = %path.display(), "loaded config file");
            }
            config
        }
    };

    if let Some(secs) = args.connect_timeout {
        config.connect_timeout_secs = secs;
    }
    if let Some(secs) = args.read_timeout {
        config.read_timeout_secs = secs;
    }
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = Some(user_agent.clone());
    }
    config.validate()?;
    Ok(config)
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn open_source(
    source: &str,
    client: &DefaultHttpClient,
    password: Option<String>,
) -> Result<Box<dyn Fetcher>> {
    if is_remote(source) {
        let base = Url::parse(source).with_context(|| format!("Invalid base URL '{source}'"))?;
        let client: Arc<dyn HttpClient> = Arc::new(client.clone());
        return Ok(Box::new(HttpFetcher::new(client, Some(base))));
    }

    let path = PathBuf::from(source);
    let fetcher = ArchiveFetcher::open(path, password)
        .await
        .with_context(|| format!("Failed to open '{source}'"))?;
    Ok(Box::new(fetcher))
}

async fn download(client: &DefaultHttpClient, url: &str, output: &Path, quiet: bool) -> Result<()> {
    let request = HttpRequest::parse(url)?;
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create '{}'", output.display()))?;
    let writer = Arc::new(Mutex::new(std::io::BufWriter::new(file)));
    let write_error: Arc<Mutex<Option<std::io::Error>>> = Arc::new(Mutex::new(None));

    let bar = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    bar.set_style(
        ProgressStyle::with_template("{spinner} {bytes} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let on_response_bar = bar.clone();
    let on_chunk_bar = bar.clone();
    let sink = Arc::clone(&writer);
    let error_slot = Arc::clone(&write_error);
    let task = client.progressive_download(
        request,
        None,
        Some(Box::new(move |response| {
            if let Some(length) = response.content_length() {
                on_response_bar.set_length(length);
                on_response_bar.set_style(
                    ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} ({eta})")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
            }
        })),
        Box::new(move |chunk, _progress| {
            on_chunk_bar.inc(chunk.len() as u64);
            let mut slot = error_slot.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none()
                && let Err(error) = sink
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .write_all(&chunk)
            {
                *slot = Some(error);
            }
        }),
    );

    let response = task
        .completion()
        .await
        .with_context(|| format!("Failed to download '{url}'"))?;
    bar.finish_and_clear();

    if let Some(error) = write_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
    {
        return Err(error).with_context(|| format!("Failed to write '{}'", output.display()));
    }
    writer
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .flush()
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    info!(
        url = %response.url,
        status = response.status,
        path = %output.display(),
        "download complete"
    );
    Ok(())
}
