use std::io::{self, BufRead};
use std::path::PathBuf;

use eyre::{Result, bail};
use log::{debug, info, warn};

use sumtube::config::Config;
use sumtube::form::SubmissionForm;
use sumtube::output;
use sumtube::poller::{Navigator, PollingClient};
use sumtube::preference::{CookieJar, FileStore, PreferenceStore};
use sumtube::output::{ProgressEvent, RouteReport};
use sumtube::router::{self, RouteDecision};
use sumtube::summary::HttpStatusSource;
use sumtube::{Locale, VideoId, extract_video_id, locale};

mod cli;

use cli::{Cli, Command, OutputFormat};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("sumtube.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sumtube")
        .join("logs")
}

fn build_after_help() -> String {
    format!(
        "\nFILES:\n  config      {}\n  preference  {}\n  logs        {}",
        sumtube::config::config_path().display(),
        sumtube::preference::default_path().display(),
        log_dir().join("sumtube.log").display()
    )
}

/// Prints the finished page and optionally hands it to the system browser
struct CliNavigator {
    site_url: String,
    open: bool,
    format: OutputFormat,
}

impl Navigator for CliNavigator {
    fn navigate(&self, target: &str) {
        let url = format!("{}{target}", self.site_url.trim_end_matches('/'));
        match self.format {
            OutputFormat::Text => println!("{url}"),
            OutputFormat::Json => println!(
                "{}",
                output::render_json_line(&ProgressEvent::Completed { target, url: &url })
            ),
        }
        if self.open {
            if let Err(e) = open::that(&url) {
                warn!("Could not open browser for {url}: {e}");
                eprintln!("Could not open browser: {e}");
            }
        }
    }
}

fn browser_tag(flag: Option<String>, config: &Config) -> Option<String> {
    flag.or_else(locale::browser_tag_from_env)
        .or_else(|| config.default_lang.clone())
}

fn read_input(arg: Option<String>) -> Result<String> {
    if let Some(input) = arg {
        return Ok(input);
    }
    for line in io::stdin().lock().lines() {
        let line = line?;
        if !line.trim().is_empty() {
            return Ok(line);
        }
    }
    bail!("no URL or video ID provided\n\nUsage: sumtube summarize <URL>\n       echo <URL> | sumtube summarize");
}

fn run_extract(input: &str) -> Result<()> {
    let video_id = extract_video_id(input)
        .ok_or_else(|| eyre::eyre!("could not extract video ID from: {}\n\nSupported formats:\n  https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  https://www.youtube.com/embed/ID\n  https://www.youtube.com/live/ID\n  https://www.youtube.com/shorts/ID", input.trim()))?;
    println!("{video_id}");
    Ok(())
}

/// Route `url` and render the decision. With a Cookie header the preference lives in that
/// header and a refreshed one is reported as Set-Cookie; otherwise the local store is used.
fn route_output(url: &str, tag: Option<&str>, cookie: Option<&str>, format: OutputFormat) -> String {
    let (decision, set_cookie) = match cookie {
        Some(header) => {
            let jar = CookieJar::from_header(header);
            let decision = router::route_url(url, tag, &jar);
            let set_cookie = matches!(decision, RouteDecision::Stay { .. })
                .then(|| jar.record().map(|r| r.set_cookie_header()))
                .flatten();
            (decision, set_cookie)
        }
        None => (router::route_url(url, tag, &FileStore::default()), None),
    };

    match format {
        OutputFormat::Text => match set_cookie {
            Some(header) => format!("{}\nSet-Cookie: {header}", output::render_route(&decision)),
            None => output::render_route(&decision),
        },
        OutputFormat::Json => output::render_json(&RouteReport {
            decision: &decision,
            set_cookie: set_cookie.as_deref(),
        }),
    }
}

fn run_route(url: &str, tag: Option<&str>, cookie: Option<&str>, format: OutputFormat) -> Result<()> {
    println!("{}", route_output(url, tag, cookie, format));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_summarize(
    input: String,
    tag: Option<String>,
    config: &Config,
    api_url: Option<String>,
    site_url: Option<String>,
    open: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    // Bare ids are accepted here for convenience; the form itself only takes URLs.
    let input = match VideoId::parse(&input) {
        Some(id) => id.watch_url(),
        None => input,
    };

    let store = FileStore::default();
    let active: Locale = locale::resolve(tag.as_deref(), store.get_preference().as_deref());

    let api_url = api_url.unwrap_or_else(|| config.api_url().to_string());
    let source = HttpStatusSource::new(reqwest::Client::new(), &api_url);
    let navigator = CliNavigator {
        site_url: site_url.unwrap_or_else(|| config.site_url().to_string()),
        open: open || config.open_browser.unwrap_or(false),
        format,
    };

    if verbose {
        eprintln!("Locale: {active}\nEndpoint: {}", source.endpoint());
    }

    let client = PollingClient::new(source, navigator).with_interval(config.poll_interval());
    let mut form = SubmissionForm::new(client, active);
    form.set_input(input);
    let video_id = form.submit()?;
    debug!("Polling for {video_id}");

    let mut rx = form.subscribe();
    let progress = tokio::spawn(async move {
        let mut last = None;
        while rx.changed().await.is_ok() {
            let view = rx.borrow_and_update().clone();
            if view.metadata != last {
                match (&view.metadata, format) {
                    (Some(meta), OutputFormat::Text) => eprintln!("{}", output::render_progress(meta)),
                    (Some(meta), OutputFormat::Json) => {
                        println!("{}", output::render_json_line(&ProgressEvent::Processing(meta)))
                    }
                    (None, _) => {}
                }
                last = view.metadata;
            }
        }
    });

    let result = form.wait().await;
    progress.abort();

    match result {
        Some(Ok(target)) => {
            info!("Navigated to {target}");
            Ok(())
        }
        Some(Err(e)) => {
            let message = e.user_message();
            Err(eyre::Report::new(e).wrap_err(message))
        }
        None => bail!("nothing was submitted"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();

    if cli.verbose {
        let config_path = sumtube::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    match cli.command {
        Command::Extract { input } => run_extract(&input),
        Command::Route {
            url,
            lang,
            cookie,
            format,
        } => {
            let tag = browser_tag(lang, &config);
            run_route(&url, tag.as_deref(), cookie.as_deref(), format)
        }
        Command::Summarize {
            url,
            lang,
            api_url,
            site_url,
            open,
            format,
        } => {
            let input = read_input(url)?;
            let tag = browser_tag(lang, &config);
            run_summarize(input, tag, &config, api_url, site_url, open, format, cli.verbose).await
        }
    }
}
