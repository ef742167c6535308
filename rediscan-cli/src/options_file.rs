//! Scan options read from a file.

use std::{fs, path::Path};

use anyhow::{Context, anyhow};
use rediscan_core::ScanOptions;

/// Load scan options from a TOML or JSON file.
///
/// The extension picks the parser; anything else tries TOML first, then
/// JSON. Missing keys keep their defaults.
pub fn load_from_file(path: &Path) -> anyhow::Result<ScanOptions> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scan options from {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&contents)
            .with_context(|| format!("invalid scan options {}", path.display())),
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| anyhow!("invalid scan options {}: {}", path.display(), err)),
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

/// Parse options as TOML, falling back to JSON. `origin` names the source in
/// errors.
pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<ScanOptions> {
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse scan options {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
url = "redis://cache:6379/1"
match = "session:*"
ignore_value = true
rounds = 0
ttl_lte = "30m"
"#
        )
        .unwrap();

        let options = load_from_file(file.path()).unwrap();
        assert_eq!(options.url, "redis://cache:6379/1");
        assert_eq!(options.match_pattern, "session:*");
        assert!(options.ignore_value);
        assert_eq!(options.rounds, 0);
        assert_eq!(options.ttl_lte.as_deref(), Some("30m"));
        assert_eq!(options.count, ScanOptions::default().count);
    }

    #[test]
    fn json_file_is_parsed_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"limit": 25, "key_regexp": "^order:"}}"#).unwrap();

        let options = load_from_file(file.path()).unwrap();
        assert_eq!(options.limit, 25);
        assert_eq!(options.key_regexp.as_deref(), Some("^order:"));
    }

    #[test]
    fn unknown_extension_falls_back_to_json() {
        let options = parse_from_str(r#"{"count": 7}"#, "inline").expect("json parses");
        assert_eq!(options.count, 7);

        let err = parse_from_str("count = [", "inline").unwrap_err();
        assert!(err.to_string().contains("toml error"));
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = load_from_file(Path::new("/nonexistent/rediscan.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rediscan.toml"));
    }
}
