use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and background job worker
    Serve {
        /// Override the configured listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Dub a single video URL and print where the results were written
    Process {
        /// Source video URL
        #[arg(short, long)]
        url: String,

        /// Target language (name or ISO code)
        #[arg(short, long, default_value = "hi")]
        language: String,

        /// "male", "female" or a free-text voice description
        #[arg(long, default_value = "female")]
        voice: String,

        /// Also render the subtitles into a second video
        #[arg(long)]
        burn_subtitles: bool,

        /// Email the results to this address (requires [mail] config)
        #[arg(long)]
        email: Option<String>,
    },

    /// Summarize a video and translate the summary
    Summarize {
        /// Source video URL
        #[arg(short, long)]
        url: String,

        /// Summary language (defaults to summarize.default_language)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Extract audio from video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe audio to timestamped segments (JSON)
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output transcript file
        #[arg(short, long)]
        output: PathBuf,

        /// Source language hint
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "dubline.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
