use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A store location the selector may pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct StoresFile {
    pub stores: Vec<Candidate>,
}

/// Load and validate the candidate stores from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_stores(path: &Path) -> Result<StoresFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::StoresFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let stores_file: StoresFile =
        serde_yaml::from_str(&content).map_err(ConfigError::StoresFileParse)?;

    validate_stores(&stores_file)?;

    Ok(stores_file)
}

fn validate_stores(stores_file: &StoresFile) -> Result<(), ConfigError> {
    if stores_file.stores.is_empty() {
        return Err(ConfigError::Validation(
            "at least one store must be configured".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    for store in &stores_file.stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store name must be non-empty".to_string(),
            ));
        }

        if store.address.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{}' has an empty address",
                store.name
            )));
        }

        if !seen_names.insert(store.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate store name: '{}'",
                store.name
            )));
        }
    }

    Ok(())
}
