pub mod generate;
pub mod parse;
pub mod types;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use generate::generate_default_config;
pub use parse::{load_config, parse_config, validate_config, ConfigError};
pub use types::{Config, IoConfig, OutputConfig, PipelineConfig};

const USER_CONFIG: &str = ".config/nem12sql/config.yml";
const SYSTEM_CONFIG: &str = "/etc/nem12sql/config.yml";

/// Matches `$env{VAR_NAME}` where VAR_NAME starts with a letter or underscore
pub(crate) fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Expands environment variables in a string.
/// Supports $env{VAR_NAME} syntax.
/// If an environment variable is not set, it's left unchanged.
pub fn expand_env_vars(text: &str) -> String {
    env_var_pattern()
        .replace_all(text, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Replace a leading `~` component with the home directory. Paths such as
/// `~user/x` or `a/~/b` are returned as given, as is everything when no home
/// directory is known.
pub fn expand_tilde(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) if rest.as_os_str().is_empty() => home,
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Resolves the config file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided, with tilde expansion)
/// 2. ~/.config/nem12sql/config.yml
/// 3. /etc/nem12sql/config.yml
///
/// `None` means no file was found and built-in defaults apply.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        // Expand tilde if present
        return Some(expand_tilde(path));
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from(SYSTEM_CONFIG);
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Per-user config location, if a home directory is known
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home_dir| home_dir.join(USER_CONFIG))
}

/// Load the resolved config file, or defaults when there is none
pub fn load_or_default(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    match resolve_config_path(explicit) {
        Some(path) => load_config(&path),
        None => Ok(Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_expand_env_vars_in_output_paths() {
        std::env::set_var("NEM12SQL_MOD_OUT_DIR", "/srv/loads");
        let result = expand_env_vars(
            "copy_path: $env{NEM12SQL_MOD_OUT_DIR}/copy.csv\n\
             insert_path: $env{NEM12SQL_MOD_UNSET}/meters.sql",
        );
        // Unset variables are left for the unexpanded-variable check
        assert_eq!(
            result,
            "copy_path: /srv/loads/copy.csv\ninsert_path: $env{NEM12SQL_MOD_UNSET}/meters.sql"
        );
        std::env::remove_var("NEM12SQL_MOD_OUT_DIR");
    }

    #[test]
    fn test_expand_env_vars_ignores_shell_syntax() {
        // Shell-style ${VAR} is left for the shell
        let result = expand_env_vars("${HOME}/out.sql");
        assert_eq!(result, "${HOME}/out.sql");
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let resolved = resolve_config_path(Some(Path::new("/srv/nem12sql.yml")));
        assert_eq!(resolved, Some(PathBuf::from("/srv/nem12sql.yml")));
    }

    #[test]
    fn test_load_or_default_with_explicit_missing_file() {
        let result = load_or_default(Some(Path::new("/nonexistent/config.yml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_expand_tilde_only_rewrites_home_prefix() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde(Path::new("~/nem12sql/copy.csv")),
                home.join("nem12sql/copy.csv")
            );
            assert_eq!(expand_tilde(Path::new("~")), home);
        }
        for unchanged in ["/srv/nem12sql/copy.csv", "loads/~/copy.csv", "~meters/copy.csv"] {
            assert_eq!(expand_tilde(Path::new(unchanged)), Path::new(unchanged));
        }
    }
}
