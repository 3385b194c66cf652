use anyhow::{bail, Context as _, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{
    config::{Shell, DEFAULT_CONFIG},
    host::{FixedHostname, HostnameSource, SystemHostname},
};

/// Snapshot of the process environment plus the paths derived from it.
#[derive(Debug, Clone)]
pub struct ContextEnv {
    vars: BTreeMap<String, String>,
    home: PathBuf,
    xdg_config_home: PathBuf,
    shell_guess: Option<Shell>,

    config_path: Option<PathBuf>,
    config_dir: Option<PathBuf>,
}

impl ContextEnv {
    pub fn new() -> Result<Self> {
        let vars: BTreeMap<String, String> = std::env::vars().collect();

        let home = dirs::home_dir()
            .or_else(|| vars.get("HOME").map(PathBuf::from))
            .or_else(|| vars.get("USERPROFILE").map(PathBuf::from))
            .context("could not determine home directory")?;

        Ok(Self::from_vars(vars, home))
    }

    pub fn from_vars(vars: BTreeMap<String, String>, home: PathBuf) -> Self {
        // XDG_CONFIG_HOME: honor if present, else fallback to ~/.config
        let xdg_config_home = match vars
            .get("XDG_CONFIG_HOME")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
        {
            Some(s) => PathBuf::from(s),
            None => home.join(".config"),
        };

        let shell_guess = detect_shell(&vars);

        Self {
            vars,
            home,
            xdg_config_home,
            shell_guess,
            config_path: None,
            config_dir: None,
        }
    }

    // ---------- public getters ----------

    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    pub fn default_config_path(&self) -> PathBuf {
        self.xdg_config_home.join("sswenv").join("config.toml")
    }

    // ---------- locating paths ----------

    /// Config path precedence:
    /// 1) CLI --config (must exist)
    /// 2) SSWENV_CONFIG (must exist)
    /// 3) default XDG_CONFIG_HOME/sswenv/config.toml (created if missing)
    pub fn locate_config(&mut self, cli_config: Option<&Path>) -> Result<PathBuf> {
        if let Some(p) = cli_config {
            if !p.exists() {
                bail!("--config was provided but file does not exist: {}", p.display());
            }
            self.set_config_path(p.to_path_buf());
            return Ok(p.to_path_buf());
        }

        if let Some(p) = self.get_env_path("SSWENV_CONFIG") {
            if !p.exists() {
                bail!("SSWENV_CONFIG is set but file does not exist: {}", p.display());
            }
            self.set_config_path(p.clone());
            return Ok(p);
        }

        let p = self.default_config_path();
        ensure_parent_dir(&p)?;
        if !p.exists() {
            fs::write(&p, DEFAULT_CONFIG)
                .with_context(|| format!("failed to write {}", p.display()))?;
            info!(path = %p.display(), "wrote default config");
        }
        self.set_config_path(p.clone());
        Ok(p)
    }

    fn set_config_path(&mut self, path: PathBuf) {
        debug!(path = %path.display(), "using config");
        self.config_dir = path.parent().map(Path::to_path_buf);
        self.config_path = Some(path);
    }

    fn get_env_path(&self, key: &str) -> Option<PathBuf> {
        self.vars
            .get(key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    // ---------- choices ----------

    /// Shell precedence: CLI, SSWENV_SHELL, $SHELL / PowerShell markers,
    /// then the config default.
    pub fn pick_shell(&self, cli: Option<Shell>, config_default: Shell) -> Shell {
        cli.or_else(|| self.var("SSWENV_SHELL").and_then(Shell::parse))
            .or(self.shell_guess)
            .unwrap_or(config_default)
    }

    /// Host precedence: CLI --host, SSWENV_HOST, then the platform lookup.
    pub fn hostname_source(&self, cli_host: Option<&str>) -> Box<dyn HostnameSource> {
        if let Some(h) = cli_host {
            return Box::new(FixedHostname::new(h));
        }
        if let Some(h) = self.var("SSWENV_HOST") {
            return Box::new(FixedHostname::new(h));
        }
        Box::new(SystemHostname::new(self.vars.clone()))
    }
}

// -------------------- helpers --------------------

fn ensure_parent_dir(p: &Path) -> Result<()> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

fn detect_shell(vars: &BTreeMap<String, String>) -> Option<Shell> {
    if let Some(sh) = vars.get("SHELL").and_then(|s| Shell::from_login_shell(s)) {
        return Some(sh);
    }

    if vars.contains_key("PSModulePath") {
        return Some(Shell::Pwsh);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    fn ctx(pairs: &[(&str, &str)]) -> ContextEnv {
        let vars = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ContextEnv::from_vars(vars, PathBuf::from("/home/ssw"))
    }

    #[test]
    fn default_config_path_follows_xdg() {
        assert_eq!(
            ctx(&[]).default_config_path(),
            PathBuf::from("/home/ssw/.config/sswenv/config.toml")
        );
        assert_eq!(
            ctx(&[("XDG_CONFIG_HOME", "/xdg")]).default_config_path(),
            PathBuf::from("/xdg/sswenv/config.toml")
        );
    }

    #[test]
    fn shell_precedence() {
        let c = ctx(&[("SHELL", "/bin/tcsh"), ("SSWENV_SHELL", "fish")]);
        assert_eq!(c.pick_shell(Some(Shell::Zsh), Shell::Bash), Shell::Zsh);
        assert_eq!(c.pick_shell(None, Shell::Bash), Shell::Fish);

        let c = ctx(&[("SHELL", "/bin/tcsh")]);
        assert_eq!(c.pick_shell(None, Shell::Bash), Shell::Csh);

        let c = ctx(&[("SHELL", "/bin/ksh")]);
        assert_eq!(c.pick_shell(None, Shell::Zsh), Shell::Zsh);
    }

    #[test]
    fn host_precedence() {
        let c = ctx(&[("SSWENV_HOST", "from-env"), ("HOSTNAME", "system")]);
        assert_eq!(c.hostname_source(Some("from-cli")).current_hostname(), "from-cli");
        assert_eq!(c.hostname_source(None).current_hostname(), "from-env");

        let c = ctx(&[("HOSTNAME", "system")]);
        assert_eq!(c.hostname_source(None).current_hostname(), "system");
    }

    #[test]
    fn missing_cli_config_is_an_error() {
        let mut c = ctx(&[]);
        let err = c
            .locate_config(Some(Path::new("/definitely/not/here.toml")))
            .unwrap_err();
        assert!(err.to_string().contains("--config"));
    }

    #[sealed_test]
    fn default_config_is_created_when_missing() -> anyhow::Result<()> {
        let root = std::env::current_dir()?;
        let mut c = ContextEnv::from_vars(
            [("XDG_CONFIG_HOME".to_string(), root.join("xdg").display().to_string())]
                .into_iter()
                .collect(),
            root.clone(),
        );

        let path = c.locate_config(None)?;

        assert_eq!(path, root.join("xdg/sswenv/config.toml"));
        assert_eq!(fs::read_to_string(&path)?, DEFAULT_CONFIG);
        assert_eq!(c.config_dir(), Some(root.join("xdg/sswenv").as_path()));

        Ok(())
    }

    #[sealed_test(env = [("SSWENV_CONFIG", "/no/such/sswenv.toml")])]
    fn missing_env_config_is_an_error() {
        let mut c = ContextEnv::new().unwrap();
        let err = c.locate_config(None).unwrap_err();
        assert!(err.to_string().contains("SSWENV_CONFIG"));
    }
}
