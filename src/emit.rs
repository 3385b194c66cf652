use crate::config::Shell;

/// Writes shell statements for one target shell.
#[derive(Debug, Clone, Copy)]
pub struct Emitter {
    shell: Shell,
}

impl Emitter {
    pub fn new(shell: Shell) -> Self {
        Self { shell }
    }

    pub fn header(&self, out: &mut String, title: &str) {
        out.push_str("# ");
        out.push_str(title);
        out.push('\n');
        out.push('\n');
    }

    pub fn comment(&self, out: &mut String, text: &str) {
        out.push_str("# ");
        out.push_str(text);
        out.push('\n');
    }

    pub fn blank(&self, out: &mut String) {
        out.push('\n');
    }

    pub fn set_env(&self, out: &mut String, key: &str, value: &str) {
        match self.shell {
            Shell::Zsh | Shell::Bash => {
                out.push_str("export ");
                out.push_str(key);
                out.push('=');
                out.push_str(&quote_posix(value));
            }
            Shell::Fish => {
                out.push_str("set -gx ");
                out.push_str(key);
                out.push(' ');
                out.push_str(&quote_fish(value));
            }
            Shell::Pwsh => {
                out.push_str("$env:");
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(&quote_pwsh(&rewrite_env_refs_for_pwsh(value)));
            }
            Shell::Csh => {
                out.push_str("setenv ");
                out.push_str(key);
                out.push(' ');
                out.push_str(&quote_csh(value));
            }
        }
        out.push('\n');
    }

    /// Source `path` with `args` when the file is readable.
    pub fn source_if_exists(&self, out: &mut String, path: &str, args: &[&str]) {
        match self.shell {
            Shell::Zsh | Shell::Bash => {
                let p = quote_posix(path);
                out.push_str(&format!("if [ -r {p} ]; then source {p}"));
                push_args(out, args);
                out.push_str("; fi\n");
            }
            Shell::Fish => {
                let p = quote_fish(path);
                out.push_str(&format!("if test -r {p}; source {p}"));
                push_args(out, args);
                out.push_str("; end\n");
            }
            Shell::Pwsh => {
                let p = quote_pwsh(&rewrite_env_refs_for_pwsh(path));
                out.push_str(&format!("if (Test-Path -Path {p} -PathType Leaf) {{ . {p}"));
                push_args(out, args);
                out.push_str(" }\n");
            }
            Shell::Csh => {
                let p = quote_csh(path);
                out.push_str(&format!("if ( -r {p} ) source {p}"));
                push_args(out, args);
                out.push('\n');
            }
        }
    }
}

fn push_args(out: &mut String, args: &[&str]) {
    for a in args {
        out.push(' ');
        out.push_str(a);
    }
}

// -------------------- quoting helpers --------------------

// Double quotes keep `$VAR` references live for the shell.
fn quote_posix(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if matches!(ch, '\\' | '"') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

// csh has no escape for `"` inside double quotes, so close, escape, reopen.
// A newline must be backslash-continued or the quote is unmatched.
fn quote_csh(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\"\\\"\""),
            '!' => out.push_str("\\!"),
            '\n' => out.push_str("\\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

// fish has no `${NAME}` form; `$NAME""` ends the name at the same place.
fn quote_fish(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut rest = s;
    while let Some(ch) = rest.chars().next() {
        if let Some(name) = braced_name(rest) {
            out.push('$');
            out.push_str(name);
            out.push_str("\"\"");
            rest = &rest[name.len() + 3..];
            continue;
        }
        if matches!(ch, '\\' | '"') {
            out.push('\\');
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out.push('"');
    out
}

// `${NAME}` at the start of `s`, when NAME is a valid variable name.
fn braced_name(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    is_valid_name(name).then_some(name)
}

fn quote_pwsh(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '`' => out.push_str("``"),
            '"' => out.push_str("`\""),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

// -------------------- pwsh env rewrite --------------------

/// `$NAME` becomes `$env:NAME` and `${NAME}` becomes `${env:NAME}`, so a
/// braced reference still ends where it did; anything else is untouched.
fn rewrite_env_refs_for_pwsh(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        if tail.starts_with("env:") {
            out.push('$');
            rest = tail;
            continue;
        }

        if let Some(name) = braced_name(&rest[pos..]) {
            out.push_str("${env:");
            out.push_str(name);
            out.push('}');
            rest = &tail[name.len() + 2..];
            continue;
        }

        let end = tail
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(tail.len());
        let name = &tail[..end];

        if is_valid_name(name) {
            out.push_str("$env:");
            out.push_str(name);
            rest = &tail[end..];
        } else {
            out.push('$');
            rest = tail;
        }
    }

    out.push_str(rest);
    out
}

fn is_valid_name(s: &str) -> bool {
    let mut it = s.chars();
    match it.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    it.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    fn set(shell: Shell, key: &str, value: &str) -> String {
        let mut out = String::new();
        Emitter::new(shell).set_env(&mut out, key, value);
        out
    }

    #[test_case(Shell::Bash, "export SSW=\"/usr/local/ssw\"\n"; "bash")]
    #[test_case(Shell::Zsh, "export SSW=\"/usr/local/ssw\"\n"; "zsh")]
    #[test_case(Shell::Fish, "set -gx SSW \"/usr/local/ssw\"\n"; "fish")]
    #[test_case(Shell::Pwsh, "$env:SSW = \"/usr/local/ssw\"\n"; "pwsh")]
    #[test_case(Shell::Csh, "setenv SSW \"/usr/local/ssw\"\n"; "csh")]
    #[test]
    fn set_env_per_shell(shell: Shell, expected: &str) {
        pretty_assertions::assert_eq!(set(shell, "SSW", "/usr/local/ssw"), expected);
    }

    #[test]
    fn instrument_list_stays_one_word() {
        pretty_assertions::assert_eq!(
            set(Shell::Bash, "SSW_INSTR", "gen hessi xray spex"),
            "export SSW_INSTR=\"gen hessi xray spex\"\n"
        );
    }

    #[test]
    fn posix_quotes_are_escaped() {
        pretty_assertions::assert_eq!(set(Shell::Bash, "K", r#"a"b\c"#), "export K=\"a\\\"b\\\\c\"\n");
    }

    #[test]
    fn csh_quotes_are_spliced() {
        pretty_assertions::assert_eq!(set(Shell::Csh, "K", r#"a"b!"#), "setenv K \"a\"\\\"\"b\\!\"\n");
    }

    #[test_case("$SSW/sswdb", "$env:SSW/sswdb"; "bare ref")]
    #[test_case("${SSW}db", "${env:SSW}db"; "braced ref")]
    #[test_case("${1}", "${1}"; "braced non-name")]
    #[test_case("$env:SSW", "$env:SSW"; "already pwsh")]
    #[test_case("cost $5", "cost $5"; "not a name")]
    #[test_case("${", "${"; "unclosed brace")]
    #[test]
    fn pwsh_rewrites_env_refs(input: &str, expected: &str) {
        pretty_assertions::assert_eq!(rewrite_env_refs_for_pwsh(input), expected);
    }

    #[test_case(Shell::Bash, "if [ -r \"/ssw/setup.ssw\" ]; then source \"/ssw/setup.ssw\" /quiet; fi\n"; "bash")]
    #[test_case(Shell::Fish, "if test -r \"/ssw/setup.ssw\"; source \"/ssw/setup.ssw\" /quiet; end\n"; "fish")]
    #[test_case(Shell::Pwsh, "if (Test-Path -Path \"/ssw/setup.ssw\" -PathType Leaf) { . \"/ssw/setup.ssw\" /quiet }\n"; "pwsh")]
    #[test_case(Shell::Csh, "if ( -r \"/ssw/setup.ssw\" ) source \"/ssw/setup.ssw\" /quiet\n"; "csh")]
    #[test]
    fn source_with_quiet_flag(shell: Shell, expected: &str) {
        let mut out = String::new();
        Emitter::new(shell).source_if_exists(&mut out, "/ssw/setup.ssw", &["/quiet"]);
        pretty_assertions::assert_eq!(out, expected);
    }

    #[test]
    fn source_without_args() {
        let mut out = String::new();
        Emitter::new(Shell::Csh).source_if_exists(&mut out, "/ssw/setup.ssw", &[]);
        pretty_assertions::assert_eq!(out, "if ( -r \"/ssw/setup.ssw\" ) source \"/ssw/setup.ssw\"\n");
    }

    #[test]
    fn csh_newline_is_continued() {
        pretty_assertions::assert_eq!(set(Shell::Csh, "K", "a\nb"), "setenv K \"a\\\nb\"\n");
    }

    #[test]
    fn pwsh_braced_ref_keeps_its_boundary() {
        pretty_assertions::assert_eq!(
            set(Shell::Pwsh, "SSWDB", "${SSW}db"),
            "$env:SSWDB = \"${env:SSW}db\"\n"
        );
    }

    #[test_case("${SSW}db", "set -gx K \"$SSW\"\"db\"\n"; "braced ref")]
    #[test_case("$SSW/db", "set -gx K \"$SSW/db\"\n"; "bare ref")]
    #[test_case("${bad-name}", "set -gx K \"${bad-name}\"\n"; "braced non-name")]
    #[test_case("a\"b", "set -gx K \"a\\\"b\"\n"; "quote")]
    #[test]
    fn fish_quoting(value: &str, expected: &str) {
        pretty_assertions::assert_eq!(set(Shell::Fish, "K", value), expected);
    }
}
