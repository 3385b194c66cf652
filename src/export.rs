//! The single boundary where a resolved configuration leaves the crate:
//! as shell text, as JSON, or as the environment of a child process.

use anyhow::{Context as _, Result};
use serde::Serialize;
use std::process::Command;

use crate::{
    config::{Config, Shell},
    context::ContextEnv,
    emit::Emitter,
    expand::Expander,
    model::EnvMap,
    resolve::ResolvedConfig,
};

/// Toolkit setup invocation. The path is expanded like any other value,
/// or left as written when `raw` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolkitStep {
    pub setup: String,
    pub quiet: bool,
}

impl ToolkitStep {
    pub fn from_config(
        ctx: &ContextEnv,
        cfg: &Config,
        host: &str,
        shell: Shell,
        env: &EnvMap,
        raw: bool,
    ) -> Result<Option<Self>> {
        let Some(spec) = cfg.active_toolkit() else {
            return Ok(None);
        };
        let setup = if raw {
            spec.setup.clone()
        } else {
            Expander::new(ctx, host, shell, env)
                .expand(&spec.setup)
                .with_context(|| format!("failed to expand toolkit.setup: {}", spec.setup))?
        };

        Ok(Some(Self {
            setup,
            quiet: spec.quiet,
        }))
    }

    fn args(&self) -> &'static [&'static str] {
        if self.quiet {
            &["/quiet"]
        } else {
            &[]
        }
    }
}

pub fn render_script(
    shell: Shell,
    resolved: &ResolvedConfig,
    env: &EnvMap,
    toolkit: Option<&ToolkitStep>,
) -> String {
    let em = Emitter::new(shell);
    let mut out = String::new();
    em.header(&mut out, "sswenv (generated)");

    match resolved.matched() {
        Some(profile) => em.comment(
            &mut out,
            &format!("host {:?} matched profile {profile:?}", resolved.host()),
        ),
        None => em.comment(
            &mut out,
            &format!("host {:?}: no host profile matched", resolved.host()),
        ),
    }

    for (k, v) in env.iter() {
        em.set_env(&mut out, k.as_str(), v);
    }

    if let Some(step) = toolkit {
        em.blank(&mut out);
        em.comment(&mut out, "--- toolkit setup ---");
        em.source_if_exists(&mut out, &step.setup, step.args());
    }

    out
}

/// `KEY=VALUE` lines, unquoted.
pub fn render_plain(env: &EnvMap) -> String {
    let mut out = String::new();
    for (k, v) in env.iter() {
        out.push_str(k.as_str());
        out.push('=');
        out.push_str(v);
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct JsonView<'a> {
    host: &'a str,
    matched: Option<&'a str>,
    env: &'a EnvMap,
}

pub fn render_json(resolved: &ResolvedConfig, env: &EnvMap) -> Result<String> {
    let view = JsonView {
        host: resolved.host(),
        matched: resolved.matched(),
        env,
    };
    serde_json::to_string_pretty(&view).context("failed to serialize resolved config")
}

/// Set every entry on `cmd`; the current process environment is untouched.
pub fn apply_to_command(cmd: &mut Command, env: &EnvMap) {
    for (k, v) in env.iter() {
        cmd.env(k.as_str(), v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{BaseConfig, ConfigKey, HostMatcher, HostProfile, HostTable},
        resolve::resolve,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (ConfigKey::new(*k).unwrap(), v.to_string()))
            .collect()
    }

    fn scenario(host: &str) -> ResolvedConfig {
        let base = BaseConfig::new(env(&[("SSW", "/opt/ssw"), ("SSWDB", "/opt/ssw/sswdb")]));
        let hosts = HostTable::new(vec![HostProfile::new(
            HostMatcher::new("host-b").unwrap(),
            env(&[("HSI_ARCHIVE_MOUNTED", "false"), ("HSI_DATA_ARCHIVE", "/local")]),
        )]);
        resolve(&base, &hosts, host)
    }

    #[test]
    fn bash_script_with_toolkit() {
        let resolved = scenario("host-b");
        let step = ToolkitStep {
            setup: "/opt/ssw/gen/setup/setup.ssw".into(),
            quiet: true,
        };

        let out = render_script(Shell::Bash, &resolved, resolved.env(), Some(&step));

        assert_eq!(
            out,
            indoc! {r#"
                # sswenv (generated)

                # host "host-b" matched profile "host-b"
                export SSW="/opt/ssw"
                export SSWDB="/opt/ssw/sswdb"
                export HSI_ARCHIVE_MOUNTED="false"
                export HSI_DATA_ARCHIVE="/local"

                # --- toolkit setup ---
                if [ -r "/opt/ssw/gen/setup/setup.ssw" ]; then source "/opt/ssw/gen/setup/setup.ssw" /quiet; fi
            "#}
        );
    }

    #[test]
    fn csh_script_for_unknown_host() {
        let resolved = scenario("elsewhere");
        let step = ToolkitStep {
            setup: "/opt/ssw/gen/setup/setup.ssw".into(),
            quiet: false,
        };

        let out = render_script(Shell::Csh, &resolved, resolved.env(), Some(&step));

        assert_eq!(
            out,
            indoc! {r#"
                # sswenv (generated)

                # host "elsewhere": no host profile matched
                setenv SSW "/opt/ssw"
                setenv SSWDB "/opt/ssw/sswdb"

                # --- toolkit setup ---
                if ( -r "/opt/ssw/gen/setup/setup.ssw" ) source "/opt/ssw/gen/setup/setup.ssw"
            "#}
        );
    }

    #[test]
    fn plain_lines() {
        let resolved = scenario("nope");
        assert_eq!(
            render_plain(resolved.env()),
            "SSW=/opt/ssw\nSSWDB=/opt/ssw/sswdb\n"
        );
    }

    #[test]
    fn json_keeps_order_and_match() -> anyhow::Result<()> {
        let resolved = scenario("host-b");
        let value: serde_json::Value = serde_json::from_str(&render_json(&resolved, resolved.env())?)?;

        assert_eq!(value["host"], "host-b");
        assert_eq!(value["matched"], "host-b");
        let keys: Vec<&str> = value["env"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["SSW", "SSWDB", "HSI_ARCHIVE_MOUNTED", "HSI_DATA_ARCHIVE"]);

        Ok(())
    }

    #[test]
    fn command_receives_env() {
        let resolved = scenario("host-b");
        let mut cmd = Command::new("true");

        apply_to_command(&mut cmd, resolved.env());

        let got: Vec<(String, String)> = cmd
            .get_envs()
            .filter_map(|(k, v)| {
                Some((k.to_str()?.to_string(), v?.to_str()?.to_string()))
            })
            .collect();
        assert_eq!(got.len(), 4);
        assert!(got.contains(&("HSI_DATA_ARCHIVE".to_string(), "/local".to_string())));
    }

    #[test]
    fn toolkit_path_is_expanded() -> anyhow::Result<()> {
        let cfg: Config = indoc! {r#"
            [sswenv]
            schema_version = 1

            [toolkit]
            setup = "{var.SSW}/gen/setup/setup.ssw"
            quiet = false
        "#}
        .parse()?;
        let ctx = ContextEnv::from_vars(Default::default(), PathBuf::from("/home/ssw"));
        let resolved = scenario("host-b");

        let step = ToolkitStep::from_config(&ctx, &cfg, "host-b", Shell::Bash, resolved.env(), false)?;

        assert_eq!(
            step,
            Some(ToolkitStep {
                setup: "/opt/ssw/gen/setup/setup.ssw".into(),
                quiet: false,
            })
        );

        Ok(())
    }

    #[test]
    fn raw_toolkit_path_is_left_alone() -> anyhow::Result<()> {
        let cfg: Config = indoc! {r#"
            [sswenv]
            schema_version = 1

            [toolkit]
            setup = "{var.UNSET_ANYWHERE}/setup.ssw"
        "#}
        .parse()?;
        let ctx = ContextEnv::from_vars(Default::default(), PathBuf::from("/home/ssw"));

        let step = ToolkitStep::from_config(&ctx, &cfg, "", Shell::Bash, &EnvMap::new(), true)?;

        assert_eq!(
            step.map(|s| s.setup),
            Some("{var.UNSET_ANYWHERE}/setup.ssw".to_string())
        );

        Ok(())
    }
}
