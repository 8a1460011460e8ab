//! Config command - print or write configuration

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::config::Config;

pub fn execute(config: &Config, example: bool, show: bool, init: Option<PathBuf>) -> Result<()> {
    if let Some(path) = init {
        if path.exists() {
            return Err(anyhow!("Refusing to overwrite existing file: {}", path.display()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Config::default().save_to_file(&path)?;
        log::info!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    if example {
        print!("{}", Config::example_toml()?);
    } else if show {
        print!("{}", config.to_toml()?);
    } else {
        println!("Use --example, --show or --init <PATH>");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("conf").join("minescope.toml");
        execute(&Config::default(), false, false, Some(path.clone()))?;
        let loaded = Config::load(Some(&path))?;
        assert_eq!(loaded.service.timeout_secs, 30);

        assert!(execute(&Config::default(), false, false, Some(path)).is_err());
        Ok(())
    }
}
