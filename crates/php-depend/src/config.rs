//! Run configuration.
//!
//! Read from a JSON document with kebab-case keys. Every key is optional:
//!
//! ```json
//! { "cache-dir": ".php-depend", "ignore-annotations": false, "abort-on-error": false }
//! ```

use std::path::{Path, PathBuf};

use php_depend_parser::ParserOptions;
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Directory of the on-disk parse cache. Parse results are kept in
    /// memory for the run when unset.
    pub cache_dir: Option<PathBuf>,
    /// Skip `@return`, `@var` and `@throws` doc-comment types.
    pub ignore_annotations: bool,
    /// Stop at the first file that fails instead of recording it and
    /// moving on.
    pub abort_on_error: bool,
}

impl Config {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            ignore_annotations: self.ignore_annotations,
        }
    }
}

/// Load a config file. A relative `cache-dir` is taken relative to the
/// file's directory.
pub fn load_config(path: &Path) -> Result<Config, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_config_str(&content, base_dir)
}

/// Parse config JSON, resolving a relative `cache-dir` against `base_dir`.
pub fn parse_config_str(content: &str, base_dir: &Path) -> Result<Config, String> {
    let mut config: Config =
        serde_json::from_str(content).map_err(|e| format!("Invalid config: {}", e))?;
    if let Some(dir) = config.cache_dir.take() {
        config.cache_dir = Some(if dir.is_relative() {
            base_dir.join(dir)
        } else {
            dir
        });
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config_str("{}", Path::new("/project")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.parser_options().ignore_annotations);
    }

    #[test]
    fn test_kebab_case_keys() {
        let json = r#"{
            "cache-dir": "/tmp/cache",
            "ignore-annotations": true,
            "abort-on-error": true
        }"#;
        let config = parse_config_str(json, Path::new("/project")).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cache")));
        assert!(config.ignore_annotations);
        assert!(config.abort_on_error);
        assert!(config.parser_options().ignore_annotations);
    }

    #[test]
    fn test_relative_cache_dir_joins_base() {
        let config =
            parse_config_str(r#"{"cache-dir": ".cache"}"#, Path::new("/project")).unwrap();
        assert_eq!(config.cache_dir, Some(PathBuf::from("/project/.cache")));
    }

    #[test]
    fn test_invalid_documents() {
        let err = parse_config_str("{ nope", Path::new(".")).unwrap_err();
        assert!(err.starts_with("Invalid config"));

        let err = parse_config_str(r#"{"cache_dir": "x"}"#, Path::new(".")).unwrap_err();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("php-depend.json");
        std::fs::write(&path, r#"{"cache-dir": "cache", "abort-on-error": true}"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cache_dir, Some(dir.path().join("cache")));
        assert!(config.abort_on_error);

        let missing = load_config(&dir.path().join("missing.json")).unwrap_err();
        assert!(missing.starts_with("Failed to read"));
    }
}
