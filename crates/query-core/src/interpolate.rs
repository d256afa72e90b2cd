use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Read-only view of environment variables consumed by [`interpolate`].
pub type Environment = HashMap<String, String>;

static VAR_RE: OnceLock<Regex> = OnceLock::new();

fn var_re() -> &'static Regex {
    VAR_RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}|\$([A-Z_][A-Z0-9_]*)").unwrap())
}

/// Snapshot the current process environment.
///
/// Taken once at start-up and passed around explicitly so the interpolator
/// never reads ambient state.
pub fn process_environment() -> Environment {
    std::env::vars().collect()
}

/// Expand `${NAME}` and `$NAME` references in `raw` against `env`.
///
/// Bare references only match `[A-Z_][A-Z0-9_]*`. Unknown names are left in
/// place verbatim, and substituted values are not expanded again.
pub fn interpolate(raw: &str, env: &Environment) -> String {
    var_re()
        .replace_all(raw, |caps: &Captures| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            match env.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}
