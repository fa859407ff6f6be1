use std::error::Error;

use clap::Subcommand;
use medireminder_core::{Config, ConfigError};
use serde_json::Value;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dotted key, e.g. "reminders.postpone_delay_min", "feedback.max_pulses",
        /// "history.days_shown" or "ui.sound"
        key: String,
    },
    /// Change one setting and save config.toml
    Set {
        key: String,
        /// New value, parsed as the setting's type (number, true/false or a name)
        value: String,
    },
    /// Print every setting as `key = value`
    List {
        /// Output the whole file as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Overwrite config.toml with the defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List { json } => {
            let config = serde_json::to_value(Config::load()?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                for (key, value) in flatten(&config, "") {
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Reset => {
            Config::load_or_default().reset()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

/// Leaf settings of a config tree under their dotted keys.
fn flatten(value: &Value, prefix: &str) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .flat_map(|(name, child)| {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                flatten(child, &key)
            })
            .collect(),
        Value::String(s) => vec![(prefix.to_string(), s.clone())],
        other => vec![(prefix.to_string(), other.to_string())],
    }
}
