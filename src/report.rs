use std::collections::HashSet;

use crate::{cli::ReportMode, config::Config, model::HostTable};

pub fn build_report(cfg: &Config, mode: ReportMode) -> String {
    match mode {
        ReportMode::Summary => summary(cfg),
        ReportMode::Full => format!("{cfg:#?}\n"),
    }
}

fn summary(cfg: &Config) -> String {
    let mut out = String::new();

    out.push_str("sswenv report (summary)\n");
    out.push_str("=======================\n");
    out.push_str(&format!("schema_version: {}\n", cfg.sswenv.schema_version));
    out.push_str(&format!("default_shell: {}\n", cfg.sswenv.default_shell));

    let retired_base = cfg.base.retired().count();
    out.push_str(&format!(
        "\nbase: entries={} retired={}\n",
        cfg.base.len() - retired_base,
        retired_base
    ));
    for (k, e) in cfg.base.iter() {
        let mark = if e.enabled() { ' ' } else { '-' };
        out.push_str(&format!("  {mark} {k} = {}\n", e.value()));
    }

    let retired_hosts = cfg.retired_hosts().count();
    out.push_str(&format!(
        "\nhosts: profiles={} retired={}\n",
        cfg.hosts.len() - retired_hosts,
        retired_hosts
    ));
    for h in &cfg.hosts {
        out.push_str(&format!(
            "  - {} (matcher={:?}, enabled={}, overrides={})\n",
            h.label(),
            h.matcher,
            h.enabled,
            h.env.len()
        ));
    }

    match &cfg.toolkit {
        Some(t) => out.push_str(&format!(
            "\ntoolkit: setup={} quiet={} enabled={}\n",
            t.setup, t.quiet, t.enabled
        )),
        None => out.push_str("\ntoolkit: <none>\n"),
    }

    out
}

/// One line per declared host: `*` applied, `=` shadowed by an earlier
/// duplicate, `-` retired.
pub fn host_listing(cfg: &Config, table: &HostTable, hostname: &str) -> String {
    let applied = table.first_match(hostname).map(|p| p.matcher.as_str());
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = String::new();

    out.push_str(&format!("current host: {hostname:?}\n"));

    for h in &cfg.hosts {
        let mark = if !h.enabled {
            '-'
        } else if !seen.insert(h.matcher.as_str()) {
            '='
        } else if applied == Some(h.matcher.as_str()) {
            '*'
        } else {
            ' '
        };
        out.push_str(&format!("{mark} {:<32} {}\n", h.matcher, h.label()));
    }

    if applied.is_none() {
        out.push_str("no host profile matched; base settings only\n");
    }

    out
}
