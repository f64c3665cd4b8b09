use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env_subst::substitute_env, schema::OpsdeskConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["opsdesk.toml", "opsdesk.yaml", "opsdesk.yml", "opsdesk.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<OpsdeskConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./opsdesk.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/opsdesk/opsdesk.{toml,yaml,yml,json}` (user-global)
///
/// Fails if no config file exists: opsdesk cannot run without a token and
/// an operator pool.
pub fn discover_and_load() -> anyhow::Result<OpsdeskConfig> {
    let Some(path) = find_config_file() else {
        anyhow::bail!(
            "no config file found (looked for {} in the current directory and the user config dir)",
            CONFIG_FILENAMES.join(", ")
        );
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/opsdesk/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "opsdesk") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<OpsdeskConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
