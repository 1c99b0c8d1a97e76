//! Dubline - video localization pipeline
//!
//! Entry point for the CLI and the HTTP service.

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use dubline::cli::{Args, Commands};
use dubline::config::Config;
use dubline::error::DublineError;
use dubline::media::MediaProcessorFactory;
use dubline::notify::Mailer;
use dubline::pipeline::{DubRequest, Pipeline, Stage, StageListener};
use dubline::server;
use dubline::summarize::Summarizer;
use dubline::transcribe::TranscriberFactory;
use dubline::workspace::RunWorkspace;

/// Logs stage transitions and draws a bar during synthesis
struct ConsoleListener;

#[async_trait]
impl StageListener for ConsoleListener {
    async fn on_stage(&self, stage: Stage) {
        info!("▶ {}", stage);
    }

    fn segment_progress(&self, total: usize) -> Option<ProgressBar> {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        Some(pb)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    let mut config = Config::load(args.config.as_deref())?;

    match args.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            info!("Starting Dubline server");
            server::serve(config).await?;
        }
        Commands::Process {
            url,
            language,
            voice,
            burn_subtitles,
            email,
        } => {
            config.media.burn_subtitles |= burn_subtitles;
            let mailer = match &email {
                Some(_) => Some(Mailer::new(config.mail.clone())?),
                None => None,
            };

            let pipeline = Pipeline::from_config(&config)?;
            for version in pipeline.check_dependencies().await? {
                info!("Found {}", version);
            }

            let workspace = RunWorkspace::create(&config.workspace.root, Uuid::new_v4()).await?;
            let request = DubRequest { url, language, voice };
            let outcome = pipeline.run(&request, &workspace, &ConsoleListener).await?;

            for warning in &outcome.warnings {
                warn!("{}", warning);
            }
            println!(
                "\nRun {} ({} segments, {:.1}s dubbed audio):",
                outcome.run_id,
                outcome.segments.len(),
                outcome.track_duration.as_secs_f64()
            );
            for artifact in &outcome.artifacts {
                println!("  {:<16} {}", format!("{:?}", artifact.kind), artifact.path.display());
            }

            if let (Some(recipient), Some(mailer)) = (email.as_deref(), mailer) {
                mailer.send(recipient, &outcome.deliverables()).await?;
            }
        }
        Commands::Summarize { url, language } => {
            let summarizer = Summarizer::from_config(&config)?;
            let workspace = RunWorkspace::create(&config.workspace.root, Uuid::new_v4()).await?;
            let result = summarizer
                .summarize(&url, language.as_deref(), &workspace, &ConsoleListener)
                .await;
            if !config.workspace.keep_artifacts {
                workspace.cleanup().await?;
            }
            println!("\n{}", result?);
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.extract_audio(&input, &output).await?;
        }
        Commands::Transcribe { input, output, language } => {
            info!("Transcribing audio: {}", input.display());
            if language.is_some() {
                config.transcriber.language = language;
            }
            let transcriber = TranscriberFactory::create_default(config.transcriber.clone());
            let transcript = transcriber.transcribe(&input).await?;
            tokio::fs::write(&output, serde_json::to_string_pretty(&transcript)?).await?;
            info!("Wrote {} segments to {}", transcript.len(), output.display());
        }
        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(DublineError::Config(format!(
                    "{} already exists (use --force to overwrite)",
                    output.display()
                ))
                .into());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let dubline_dir = std::env::current_dir()?.join(".dubline");
    let log_dir = dubline_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "dubline.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("dubline.log").display()
    );

    Ok(())
}
