//! Punchclock CLI
//!
//! Records one attendance punch on the HR portal and exits.
//!
//! Usage:
//!   punchclock                  # pick the punch from the time of day
//!   punchclock check-in         # force an arrival punch
//!   punchclock check-out        # force a departure punch
//!   punchclock --dry-run        # walk the whole flow but do not click save
//!   punchclock --workdays-only  # do nothing on days off (for schedulers)
//!
//! Exit status: 0 done (or skipped), 1 the run failed, 2 bad configuration.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use punchclock::{
    open_session, ActionCode, CheckInOrchestrator, Config, Credentials, FlowTimings, Schedule,
    Settings, SiteProfile,
};
use tracing::{error, info};

mod logging;
mod summary;

const EXIT_FAILED: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[derive(Parser, Debug)]
#[command(name = "punchclock")]
#[command(about = "⏰ Punchclock - record an attendance punch on the HR portal")]
struct Cli {
    /// check-in, check-out, Time-In, Time-Out, or auto to decide from the time of day
    #[clap(default_value = "auto")]
    punch: String,

    /// Locate the save button but do not click it
    #[clap(long)]
    dry_run: bool,

    /// Skip the run (exit 0) when today is not a configured work day
    #[clap(long)]
    workdays_only: bool,

    /// Submit without the random pre-submit delay
    #[clap(long)]
    no_delay: bool,

    /// Run the browser without a window (overrides HEADLESS)
    #[clap(long)]
    headless: bool,
}

impl Cli {
    /// `None` means decide from the clock.
    fn instruction(&self) -> Result<Option<String>, String> {
        if self.punch.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        match ActionCode::from_label(&self.punch) {
            Some(_) => Ok(Some(self.punch.clone())),
            None => Err(format!(
                "Unknown punch '{}'. Use check-in, check-out, Time-In, Time-Out or auto",
                self.punch
            )),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = run(cli).await;
    std::process::exit(code);
}

async fn run(cli: Cli) -> i32 {
    let (config, settings) = match load_settings() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ {e:#}");
            return EXIT_CONFIG;
        }
    };
    let _log_guard = logging::init_logging(&settings.log_level, settings.log_file.as_deref());

    print_banner();
    if let Some(path) = config.dotenv_path() {
        info!("Using environment file: {}", path.display());
    }

    let instruction = match cli.instruction() {
        Ok(instruction) => instruction,
        Err(message) => {
            error!("{}", message);
            eprintln!("❌ {message}");
            return EXIT_CONFIG;
        }
    };

    if cli.workdays_only {
        match Schedule::from_config(&config) {
            Ok(schedule) => {
                let today = chrono::Local::now().date_naive();
                if !schedule.is_work_day(today) {
                    info!("{} is not a work day; nothing to do", today.format("%A %Y-%m-%d"));
                    println!("⏭️  Not a work day, skipping");
                    return 0;
                }
            }
            Err(e) => {
                error!("Invalid work schedule: {}", e);
                eprintln!("❌ {e}");
                return EXIT_CONFIG;
            }
        }
    }

    let credentials = match settings.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            eprintln!("❌ {e}");
            eprintln!("💡 Set WW_USERNAME and WW_PASSWORD in the environment or a .env file");
            return EXIT_CONFIG;
        }
    };

    match check_in(&cli, &settings, credentials, instruction).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {e:#}");
            EXIT_FAILED
        }
    }
}

fn load_settings() -> Result<(Config, Settings)> {
    let config = Config::load().context("Failed to load configuration")?;
    let settings = Settings::from_config(&config).context("Invalid configuration")?;
    Ok((config, settings))
}

async fn check_in(
    cli: &Cli,
    settings: &Settings,
    credentials: Credentials,
    instruction: Option<String>,
) -> Result<i32> {
    let mut options = settings.driver_options();
    options.headless |= cli.headless;
    info!(
        webdriver = %options.webdriver_url,
        headless = options.headless,
        "Starting browser session"
    );
    let session = open_session(&options)
        .await
        .with_context(|| format!("Could not start a browser via {}", options.webdriver_url))?;

    let mut timings = FlowTimings::from_settings(settings);
    if cli.no_delay {
        timings = timings.without_submit_delay();
    }

    let report = CheckInOrchestrator::new(
        session,
        SiteProfile::default().with_login_url(settings.login_url.clone()),
        credentials,
    )
    .with_timings(timings)
    .with_instruction(instruction)
    .with_dry_run(cli.dry_run)
    .run()
    .await;

    summary::display(&report);
    Ok(report.exit_code())
}

fn print_banner() {
    let now = chrono::Local::now();
    println!("{}", "═".repeat(60));
    println!("{}", "⏰ Punchclock".bold());
    println!("   {}", now.format("%Y-%m-%d %H:%M:%S"));
    println!("{}", "═".repeat(60));
    info!("Punchclock started at {}", now.format("%Y-%m-%d %H:%M:%S"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("punchclock").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_punch_is_auto() {
        let cli = parse(&[]);
        assert_eq!(cli.instruction(), Ok(None));
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_explicit_punch_forms_are_accepted() {
        assert_eq!(
            parse(&["check-out"]).instruction(),
            Ok(Some("check-out".to_string()))
        );
        assert_eq!(
            parse(&["Time-In", "--dry-run"]).instruction(),
            Ok(Some("Time-In".to_string()))
        );
    }

    #[test]
    fn test_unknown_punch_is_rejected() {
        assert!(parse(&["lunch"]).instruction().is_err());
    }
}
