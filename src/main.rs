//! Command-line front end for the boxlab editor core.

use std::path::PathBuf;

use anyhow::{Context, Result};
use boxlab::{AppConfig, AssistConfig, ImageFilter, NoticeLevel, Session};
use boxlab_api::{Backend, HttpBackend, ImageId};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "boxlab")]
#[command(about = "Bounding-box annotation editor")]
pub struct Cli {
    /// Config file (defaults to the user config directory).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Override the backend base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Override the project id.
    #[arg(long, global = true)]
    project: Option<i64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the project's classes.
    Classes,
    /// List images, optionally filtered by status.
    Images {
        #[arg(long, default_value = "all")]
        filter: ImageFilter,
    },
    /// List models usable for label assist.
    Models,
    /// Print one image's annotations and its rendered frame as JSON.
    Show {
        #[arg(long)]
        image: ImageId,
    },
    /// Run label assist over images and save the results.
    Assist {
        #[arg(long, default_value = "unannotated")]
        filter: ImageFilter,
        /// Catalogue key, e.g. `latest`, `trained:3` or `external:/models/a.pt`.
        #[arg(long, default_value = "latest")]
        model: String,
        #[arg(long, default_value_t = boxlab::constants::DEFAULT_ASSIST_CONFIDENCE)]
        confidence: f64,
        /// Keep existing boxes instead of replacing them.
        #[arg(long)]
        keep_existing: bool,
    },
    /// Write the effective configuration to the config file.
    InitConfig,
}

#[derive(Debug, Serialize)]
struct ModelOutput {
    key: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct ShowOutput<'a> {
    image: &'a boxlab_api::ImageInfo,
    annotations: &'a [boxlab::Annotation],
    frame: boxlab::Frame,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    init_logging(&config);

    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }
    if let Some(project) = cli.project {
        config.backend.project_id = project;
    }

    if let Commands::InitConfig = cli.command {
        match cli.config {
            Some(path) => {
                config.save_to_path(&path).context("failed to write config")?;
                println!("{}", path.display());
            }
            None => {
                config.save_to_default_path().context("failed to write config")?;
                if let Some(path) = AppConfig::default_path() {
                    println!("{}", path.display());
                }
            }
        }
        return Ok(());
    }

    let backend = HttpBackend::new(config.backend.base_url.clone()).context("invalid backend URL")?;
    let mut session = Session::from_config(backend, &config);

    match cli.command {
        Commands::Classes => run_classes(&session).await,
        Commands::Images { filter } => run_images(&session, filter).await,
        Commands::Models => run_models(&mut session).await,
        Commands::Show { image } => run_show(&mut session, image).await,
        Commands::Assist {
            filter,
            model,
            confidence,
            keep_existing,
        } => run_assist(&mut session, filter, &model, confidence, !keep_existing).await,
        Commands::InitConfig => Ok(()),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(AppConfig::load_from_default_path().unwrap_or_default()),
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &AppConfig) {
    let level = config.preferences.log_level.to_level_filter();
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

async fn run_classes<B: Backend>(session: &Session<B>) -> Result<()> {
    let classes = session
        .backend()
        .classes(session.project_id())
        .await
        .context("failed to fetch classes")?;
    println!("{}", serde_json::to_string_pretty(&classes)?);
    Ok(())
}

async fn run_images<B: Backend>(session: &Session<B>, filter: ImageFilter) -> Result<()> {
    let images: Vec<_> = session
        .backend()
        .images(session.project_id())
        .await
        .context("failed to fetch images")?
        .into_images()
        .into_iter()
        .filter(|image| filter.matches(image))
        .collect();
    println!("{}", serde_json::to_string_pretty(&images)?);
    Ok(())
}

async fn run_models<B: Backend>(session: &mut Session<B>) -> Result<()> {
    session.refresh_models().await;
    let models: Vec<_> = session
        .catalogue
        .selections()
        .into_iter()
        .map(|model| ModelOutput {
            key: model.key(),
            name: model.display_name(),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&models)?);
    Ok(())
}

async fn run_show<B: Backend>(session: &mut Session<B>, image_id: ImageId) -> Result<()> {
    session.open(ImageFilter::All, Some(image_id)).await?;
    report_notices(session);

    let image = session
        .current_image()
        .filter(|image| image.id == image_id)
        .with_context(|| format!("image {image_id} could not be loaded"))?;
    let output = ShowOutput {
        image,
        annotations: session.state.store.list(),
        frame: session.render(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_assist<B: Backend>(
    session: &mut Session<B>,
    filter: ImageFilter,
    model_key: &str,
    confidence: f64,
    clear_existing: bool,
) -> Result<()> {
    session.open(filter, None).await?;
    report_notices(session);

    let model = session
        .catalogue
        .find(model_key)
        .with_context(|| format!("unknown model '{model_key}' (see `boxlab models`)"))?;
    let mut assist = AssistConfig {
        confidence,
        clear_existing,
        ..AssistConfig::default()
    };
    assist.select_model(model, &session.state.classes);
    session.assist.config = assist;

    let count = session.images().len();
    let mut total = 0;
    for index in 0..count {
        let loaded = (index == 0 && session.state.image.is_some()) || session.load_image(index).await;
        if !loaded {
            report_notices(session);
            continue;
        }
        let added = session.run_single_assist().await;
        report_notices(session);
        total += added?;
        session.save().await?;
        report_notices(session);
    }

    log::info!("Labeled {} images with {} predictions", count, total);
    Ok(())
}

/// Notices are already logged by the session; echo errors for the user.
fn report_notices<B: Backend>(session: &mut Session<B>) {
    for notice in session.take_notices() {
        if notice.level == NoticeLevel::Error {
            eprintln!("{}", notice.message);
        }
    }
}
