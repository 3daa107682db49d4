use anyhow::{bail, Context as _, Result};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Where inputs come from: process environment + working directory.
#[derive(Debug, Clone)]
pub struct ContextEnv {
    vars: BTreeMap<String, String>,
    cwd: PathBuf,
    xdg_config_home: PathBuf,
}

impl ContextEnv {
    pub fn new() -> Result<Self> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();
        let cwd = std::env::current_dir().context("could not determine working directory")?;
        Self::from_parts(vars, cwd)
    }

    pub fn from_parts(vars: BTreeMap<String, String>, cwd: PathBuf) -> Result<Self> {
        // XDG_CONFIG_HOME: honor if present, else fallback to ~/.config
        let xdg_config_home = match vars.get("XDG_CONFIG_HOME").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(s) => PathBuf::from(s),
            None => {
                let home = vars
                    .get("HOME")
                    .map(PathBuf::from)
                    .or_else(dirs::home_dir)
                    .context("could not determine home directory")?;
                home.join(".config")
            }
        };

        Ok(Self {
            vars,
            cwd,
            xdg_config_home,
        })
    }

    pub fn default_config_path(&self) -> PathBuf {
        self.xdg_config_home.join("showvars").join("config.toml")
    }

    pub fn default_snapshot_path(&self) -> PathBuf {
        self.cwd.join("snapshot.toml")
    }

    /// Config path precedence:
    /// 1) CLI --config (must exist)
    /// 2) SHOWVARS_CONFIG (must exist)
    /// 3) XDG_CONFIG_HOME/showvars/config.toml (only if present)
    pub fn locate_config(&self, cli_config: Option<&PathBuf>) -> Result<Option<PathBuf>> {
        if let Some(p) = cli_config {
            if !p.exists() {
                bail!("--config was provided but file does not exist: {}", p.display());
            }
            return Ok(Some(p.clone()));
        }

        if let Some(p) = self.get_env_path("SHOWVARS_CONFIG") {
            if !p.exists() {
                bail!("SHOWVARS_CONFIG is set but file does not exist: {}", p.display());
            }
            return Ok(Some(p));
        }

        let p = self.default_config_path();
        Ok(p.exists().then_some(p))
    }

    /// Snapshot path precedence: CLI --snapshot, SHOWVARS_SNAPSHOT, ./snapshot.toml.
    pub fn locate_snapshot(&self, cli_snapshot: Option<&PathBuf>) -> Result<PathBuf> {
        let (p, origin) = match (cli_snapshot, self.get_env_path("SHOWVARS_SNAPSHOT")) {
            (Some(p), _) => (self.absolute(p), "--snapshot"),
            (None, Some(p)) => (self.absolute(&p), "SHOWVARS_SNAPSHOT"),
            (None, None) => (self.default_snapshot_path(), "default location"),
        };

        if !p.exists() {
            bail!("snapshot not found ({origin}): {}", p.display());
        }
        Ok(p)
    }

    fn absolute(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.cwd.join(p)
        }
    }

    fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.vars
            .get(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}
