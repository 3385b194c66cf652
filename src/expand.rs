use anyhow::{anyhow, bail, Context as _, Result};

use crate::{
    config::Shell,
    context::ContextEnv,
    model::EnvMap,
    resolve::ResolvedConfig,
};

/// Expands `{token}` placeholders in resolved values.
///
/// Tokens: `{home}`, `{host}`, `{shell}`, `{config_dir}` and `{var.NAME}`,
/// where `NAME` is a key expanded earlier in the same mapping or, failing
/// that, a variable of the calling process. `{{` and `}}` are literal braces.
pub struct Expander<'a> {
    pub ctx: &'a ContextEnv,
    pub host: &'a str,
    pub shell: Shell,
    pub done: &'a EnvMap,
}

impl<'a> Expander<'a> {
    pub fn new(ctx: &'a ContextEnv, host: &'a str, shell: Shell, done: &'a EnvMap) -> Self {
        Self {
            ctx,
            host,
            shell,
            done,
        }
    }

    pub fn expand(&self, input: &str) -> Result<String> {
        // Fast path
        if !input.contains('{') && !input.contains('}') {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if let Some(after) = tail.strip_prefix("{{") {
                out.push('{');
                rest = after;
                continue;
            }
            if let Some(after) = tail.strip_prefix("}}") {
                out.push('}');
                rest = after;
                continue;
            }
            if tail.starts_with('}') {
                bail!("unmatched '}}' in: {input}");
            }

            let Some(end) = tail.find('}') else {
                bail!("unclosed token in string: {input}");
            };
            let token = &tail[1..end];
            let repl = self
                .token_value(token)
                .ok_or_else(|| anyhow!("unknown token: {{{token}}} in: {input}"))?;

            out.push_str(&repl);
            rest = &tail[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn token_value(&self, token: &str) -> Option<String> {
        // var.*
        if let Some(name) = token.strip_prefix("var.") {
            return self
                .done
                .get(name)
                .or_else(|| self.ctx.var(name))
                .map(str::to_string);
        }

        match token {
            "home" => Some(self.ctx.home().to_string_lossy().to_string()),
            "host" => Some(self.host.to_string()),
            "shell" => Some(self.shell.to_string()),
            "config_dir" => self
                .ctx
                .config_dir()
                .map(|p| p.to_string_lossy().to_string()),
            _ => None,
        }
    }
}

/// Expand every value of `resolved` in key order.
pub fn expand_all(ctx: &ContextEnv, resolved: &ResolvedConfig, shell: Shell) -> Result<EnvMap> {
    let mut done = EnvMap::new();
    for (k, v) in resolved.env().iter() {
        let value = Expander::new(ctx, resolved.host(), shell, &done)
            .expand(v)
            .with_context(|| format!("failed to expand value for {k}"))?;
        done.set(k.clone(), value);
    }
    Ok(done)
}
