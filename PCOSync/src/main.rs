use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use pcoconfig::Config;
use pcomidi::{MidiConfigExt, SetlistEncoder};
use pcoservices::{
    Error as ServicesError, PlanLocator, PlanningCenterClient, PlanningCenterConfigExt,
    SelectionMode, SelectionPolicy, fetch_plan_songs, locator::utc_today, next_sunday,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let logging = init_logging();
    let config = Config::load_config("")?;
    logging.apply_config(&config)?;

    info!("📁 Using configuration {}", config.file_path().display());

    // ========== Service type ==========
    let client = PlanningCenterClient::from_config(&config)
        .context("cannot build the Planning Center client")?;
    info!("🌐 Planning Center API at {}", client.api_base());
    let locator =
        PlanLocator::new(&client).with_roster_max_pages(config.get_roster_max_pages()?);

    let service_type_name = config.get_service_type_name()?;
    let service_type = match locator.find_service_type(&service_type_name).await {
        Ok(service_type) => service_type,
        Err(ServicesError::NotFound(_)) => {
            println!("Service type '{}' not found.", service_type_name);
            println!("Available service types:");
            for available in locator.list_service_types().await? {
                println!("  - {} ({})", available.name, available.id);
            }
            bail!("service type '{}' not found", service_type_name);
        }
        Err(e) => return Err(e.into()),
    };
    println!("Service type: {} ({})", service_type.name, service_type.id);

    // ========== Plan ==========
    let policy = selection_policy(&config)?;
    let Some(plan) = locator.locate(&service_type.id, &policy).await? else {
        match policy {
            SelectionPolicy::ByRoster { .. } => {
                println!("You are not scheduled on any upcoming plan.")
            }
            SelectionPolicy::ByDate(date) => println!("No plan found for {}.", date),
            SelectionPolicy::NextSunday => println!("No plan found for this Sunday."),
        }
        return Ok(());
    };
    println!(
        "Selected plan: {} - {}",
        plan.title_or_default(),
        plan.dates_or_default()
    );

    // ========== Songs ==========
    let songs = fetch_plan_songs(&client, &service_type.id, &plan.id).await?;
    if songs.is_empty() {
        println!("No songs found in this plan.");
        return Ok(());
    }

    println!("Setlist:");
    for (i, song) in songs.iter().enumerate() {
        println!("{}. {}", i + 1, song.summary());
    }

    // ========== MIDI ==========
    let midi = SetlistEncoder::from_config(&config)?.encode(&songs)?;
    let output = config.get_midi_output_path()?;
    midi.write_to(&output)
        .with_context(|| format!("cannot write {}", output.display()))?;

    println!("MIDI file written to {}", output.display());
    Ok(())
}

const DEFAULT_LOG_LEVEL: &str = "info";

/// Installed subscriber whose filter can follow the configuration
struct Logging {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl Logging {
    /// Switch to `host.logger.min_level` unless RUST_LOG is set
    fn apply_config(&self, config: &Config) -> Result<()> {
        if !self.from_env {
            self.handle.reload(EnvFilter::new(config_log_level(config)))?;
        }
        Ok(())
    }
}

/// Installed before the configuration loads so its messages are kept
fn init_logging() -> Logging {
    let env_filter = EnvFilter::try_from_default_env();
    let from_env = env_filter.is_ok();
    let filter = env_filter.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Logging { handle, from_env }
}

fn config_log_level(config: &Config) -> String {
    config
        .get_log_min_level()
        .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
        .to_lowercase()
}

fn selection_policy(config: &Config) -> Result<SelectionPolicy> {
    match config.get_selection_mode()? {
        SelectionMode::Roster => roster_policy(config),
        SelectionMode::Date => {
            let date = config
                .get_target_date()?
                .ok_or_else(|| anyhow!("setlist.target_date is required for date selection"))?;
            Ok(SelectionPolicy::ByDate(date))
        }
        SelectionMode::NextSunday => Ok(SelectionPolicy::NextSunday),
        SelectionMode::Prompt => prompt_policy(config),
    }
}

fn roster_policy(config: &Config) -> Result<SelectionPolicy> {
    let person_id = config
        .get_roster_person_id()?
        .ok_or_else(|| anyhow!("setlist.person_id is required for roster selection"))?;
    Ok(SelectionPolicy::ByRoster { person_id })
}

fn prompt_policy(config: &Config) -> Result<SelectionPolicy> {
    println!("Choose an option:");
    println!("1 - Next plan I am scheduled for");
    println!("2 - Pick a specific Sunday date");

    match read_line("Enter 1 or 2: ")?.as_str() {
        "1" => roster_policy(config),
        "2" => {
            let suggestion = next_sunday(utc_today());
            let raw = read_line(&format!("Enter the date (YYYY-MM-DD) [{}]: ", suggestion))?;
            if raw.is_empty() {
                return Ok(SelectionPolicy::ByDate(suggestion));
            }
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("'{}' is not a YYYY-MM-DD date", raw))?;
            Ok(SelectionPolicy::ByDate(date))
        }
        other => Err(anyhow!("invalid choice '{}'", other)),
    }
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_log_level_is_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();

        assert_eq!(config_log_level(&config), "info");

        config.set_log_min_level("DEBUG".to_string()).unwrap();
        assert_eq!(config_log_level(&config), "debug");
    }

    #[test]
    fn test_config_level_replaces_startup_filter() {
        let (filter, handle) = reload::Layer::new(EnvFilter::new(DEFAULT_LOG_LEVEL));
        let _subscriber = tracing_subscriber::registry().with(filter);

        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        config.set_log_min_level("WARN".to_string()).unwrap();

        let logging = Logging {
            handle,
            from_env: false,
        };
        logging.apply_config(&config).unwrap();
        assert_eq!(logging.handle.with_current(|f| f.to_string()).unwrap(), "warn");

        // RUST_LOG keeps priority over the configuration
        let (filter, handle) = reload::Layer::new(EnvFilter::new("trace"));
        let _subscriber = tracing_subscriber::registry().with(filter);
        let logging = Logging {
            handle,
            from_env: true,
        };
        logging.apply_config(&config).unwrap();
        assert_eq!(logging.handle.with_current(|f| f.to_string()).unwrap(), "trace");
    }
}
