use anyhow::{Context as _, Result};
use std::path::Path;

use crate::{
    config::{Config, Shell},
    context::ContextEnv,
    expand::expand_all,
    export::ToolkitStep,
    host::HostnameSource,
    model::{BaseConfig, EnvMap, HostTable},
    resolve::{resolve_with, ResolvedConfig},
};

/// A loaded config with its base settings and host table built once.
#[derive(Debug)]
pub struct Session {
    pub cfg: Config,
    pub base: BaseConfig,
    pub hosts: HostTable,
    pub shell: Shell,
}

impl Session {
    pub fn load(
        ctx: &mut ContextEnv,
        cli_config: Option<&Path>,
        cli_shell: Option<Shell>,
    ) -> Result<Self> {
        let path = ctx.locate_config(cli_config)?;
        let cfg = Config::load_from_path(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?;
        Self::from_config(ctx, cfg, cli_shell)
    }

    pub fn from_config(ctx: &ContextEnv, cfg: Config, cli_shell: Option<Shell>) -> Result<Self> {
        let base = cfg.base_config()?;
        let hosts = cfg.host_table()?;
        let shell = ctx.pick_shell(cli_shell, cfg.sswenv.default_shell);

        Ok(Self {
            cfg,
            base,
            hosts,
            shell,
        })
    }

    pub fn resolve(&self, source: &dyn HostnameSource) -> ResolvedConfig {
        resolve_with(&self.base, &self.hosts, source)
    }

    /// Values as they will be exported: expanded unless `raw`.
    pub fn export_env(
        &self,
        ctx: &ContextEnv,
        resolved: &ResolvedConfig,
        raw: bool,
    ) -> Result<EnvMap> {
        if raw {
            return Ok(resolved.env().clone());
        }
        expand_all(ctx, resolved, self.shell)
    }

    /// Active toolkit step, expanded under the same `raw` choice as `env`.
    pub fn toolkit(
        &self,
        ctx: &ContextEnv,
        resolved: &ResolvedConfig,
        env: &EnvMap,
        raw: bool,
    ) -> Result<Option<ToolkitStep>> {
        ToolkitStep::from_config(ctx, &self.cfg, resolved.host(), self.shell, env, raw)
    }
}
