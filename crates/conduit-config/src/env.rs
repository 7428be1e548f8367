use std::sync::OnceLock;

use regex::{Captures, Regex};

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `${NAME}` or `${NAME:-fallback}`
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("placeholder pattern is valid")
    })
}

/// Substitute `${NAME}` and `${NAME:-fallback}` placeholders from the process environment
///
/// Runs on the raw TOML text before deserialization. Comment lines are left
/// alone so a commented-out secret does not have to be set.
pub fn expand_env(input: &str) -> anyhow::Result<String> {
    let mut lines = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
            continue;
        }
        lines.push(expand_line(line)?);
    }

    Ok(lines.join("\n"))
}

fn expand_line(line: &str) -> anyhow::Result<String> {
    let mut missing = None;

    let expanded = placeholder().replace_all(line, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (std::env::var(name), caps.get(2)) {
            (Ok(value), _) => value,
            (Err(_), Some(fallback)) => fallback.as_str().to_owned(),
            (Err(_), None) => {
                missing.get_or_insert_with(|| name.to_owned());
                String::new()
            }
        }
    });

    if let Some(name) = missing {
        anyhow::bail!("environment variable `{name}` is not set and has no default");
    }

    Ok(expanded.into_owned())
}
