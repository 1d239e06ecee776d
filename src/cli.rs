use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "sumtube",
    about = "YouTube summary client",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show resolved locale, endpoints and state transitions
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the video ID contained in a YouTube URL
    Extract {
        /// YouTube URL
        input: String,
    },

    /// Decide where a page load of URL should land
    Route {
        /// Full page URL (or bare path) as the browser would load it
        url: String,

        /// Browser language tag, e.g. pt-BR (defaults to $LANG)
        #[arg(short, long)]
        lang: Option<String>,

        /// Cookie request header to read the preference from instead of the local store
        #[arg(long)]
        cookie: Option<String>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Request a summary and follow it until the summary page is ready
    Summarize {
        /// YouTube video URL or video ID (reads from stdin if omitted)
        url: Option<String>,

        /// Browser language tag used when no locale preference is stored
        #[arg(short, long)]
        lang: Option<String>,

        /// Summary service base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Site origin the summary page lives on
        #[arg(long)]
        site_url: Option<String>,

        /// Open the finished summary page in the browser
        #[arg(long)]
        open: bool,

        /// Output format: text (default), json (one event per line)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}
