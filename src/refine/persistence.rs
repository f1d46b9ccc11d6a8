use super::types::RefineRules;
use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn rules_save_path() -> io::Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine home directory",
        )
    })?;
    Ok(home_dir.join(".refine").join("rules.json"))
}

/// Read and validate rules from `path`.
pub fn load_rules_from(path: &Path) -> Result<RefineRules> {
    let json = fs::read_to_string(path)?;
    let rules: RefineRules = serde_json::from_str(&json)?;
    rules.validate()?;
    Ok(rules)
}

/// Rules from ~/.refine/rules.json, or the built-in game data if that file
/// is missing or unusable.
pub fn load_rules() -> RefineRules {
    let path = match rules_save_path() {
        Ok(p) => p,
        Err(_) => return RefineRules::default(),
    };
    if !path.exists() {
        return RefineRules::default();
    }
    match load_rules_from(&path) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::warn!("ignoring {}: {}", path.display(), e);
            RefineRules::default()
        }
    }
}

pub fn save_rules_to(path: &Path, rules: &RefineRules) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(rules)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn save_rules(rules: &RefineRules) -> Result<PathBuf> {
    let path = rules_save_path()?;
    save_rules_to(&path, rules)?;
    Ok(path)
}
