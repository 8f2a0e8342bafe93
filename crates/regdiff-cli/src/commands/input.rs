//! Shared file loading for commands

use regdiff_core::config::RegDiffConfig;
use regdiff_core::logging_facility;
use serde_json::Value;
use std::path::Path;

/// Read a JSON or YAML document; `.yaml`/`.yml` files parse as YAML
pub fn read_document(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value = if is_yaml {
        serde_yaml::from_str(&text)
            .map_err(|e| format!("invalid YAML in {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&text)
            .map_err(|e| format!("invalid JSON in {}: {}", path.display(), e))?
    };
    Ok(value)
}

/// Load the optional config file and start logging with its profile
pub fn load_config(path: Option<&Path>) -> Result<RegDiffConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => RegDiffConfig::load(path)?,
        None => RegDiffConfig::default(),
    };
    logging_facility::init(config.logging.profile);
    Ok(config)
}

/// Write to `output`, or stdout when `None`
pub fn emit(text: &str, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => std::fs::write(path, text)?,
        None => print!("{}", text),
    }
    Ok(())
}
