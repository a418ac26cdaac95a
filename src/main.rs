//! Terminal dashboard for Metro Manila weather.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use ncr_core::{Config, Deployment};
use ncr_ui::{render, AppServices, WeatherModel};

/// Current weather and forecasts for NCR municipalities
#[derive(Parser)]
#[command(name = "ncr-weather", version, about)]
struct Cli {
    /// Municipality to show at startup (defaults to ui.default_city).
    #[arg(long)]
    city: Option<String>,

    /// Deployment context: server (SQLite cache) or client (session cache).
    #[arg(long)]
    deployment: Option<Deployment>,

    /// Config file to use instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also load the forecast at startup.
    #[arg(long)]
    forecast: bool,

    /// Print the dashboard once and exit.
    #[arg(long)]
    once: bool,
}

/// Upper bound on waiting for one fetch to report back.
const FETCH_WAIT: Duration = Duration::from_secs(30);

const HELP: &str = "\
Commands:
  list            List municipalities
  select <city>   Select a municipality (served from cache when fresh)
  refresh         Fetch current conditions again
  forecast        Load the forecast
  show            Redraw the dashboard
  help            Show this help
  quit            Exit";

fn main() -> Result<()> {
    let cli = Cli::parse();

    ncr_core::init()?;

    let (mut config, _) = Config::load_validated(cli.config.as_deref())?;
    if let Some(deployment) = cli.deployment {
        config.weather.deployment = deployment;
    }
    let city = cli
        .city
        .clone()
        .unwrap_or_else(|| config.ui.default_city.clone());

    let services = AppServices::init(config)?;
    let mut model = services.weather_model()?;

    tracing::info!("NCR Weather started");

    model.select_city(&city);
    if cli.forecast {
        model.load_forecast();
    }
    settle(&mut model);
    print_dashboard(&mut model);

    if !cli.once {
        run_interactive(&mut model)?;
    }

    drop(model);
    services.shutdown();
    Ok(())
}

/// Wait until every started fetch has reported back.
fn settle(model: &mut WeatherModel) {
    while model.is_busy() {
        if !model.wait_for_message(FETCH_WAIT) {
            tracing::warn!("Gave up waiting for weather results");
            break;
        }
    }
}

fn print_dashboard(model: &mut WeatherModel) {
    model.poll();
    for notification in model.take_notifications() {
        eprintln!("! {}", notification.message);
    }
    println!("{}", render::render_dashboard(model));
}

/// Match `input` to a listed municipality ignoring case; unknown names are
/// passed through so the model reports them.
fn resolve_city(model: &WeatherModel, input: &str) -> String {
    model
        .municipalities()
        .into_iter()
        .find(|name| name.eq_ignore_ascii_case(input))
        .unwrap_or_else(|| input.to_string())
}

fn run_interactive(model: &mut WeatherModel) -> Result<()> {
    println!("{}", HELP);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "" => continue,
            "list" => {
                let selected = model.selected_city().map(str::to_string);
                for name in model.municipalities() {
                    let marker = if selected.as_deref() == Some(name.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {}", marker, name);
                }
            }
            "select" if arg.is_empty() => println!("Usage: select <city>"),
            "select" => {
                let city = resolve_city(model, arg);
                model.select_city(&city);
                settle(model);
                print_dashboard(model);
            }
            "refresh" => {
                model.refresh();
                settle(model);
                print_dashboard(model);
            }
            "forecast" => {
                model.load_forecast();
                settle(model);
                print_dashboard(model);
            }
            "show" => print_dashboard(model),
            "help" => println!("{}", HELP),
            "quit" | "exit" => break,
            other => println!("Unknown command: {} (try \"help\")", other),
        }
    }

    Ok(())
}
