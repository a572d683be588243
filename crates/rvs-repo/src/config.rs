//! The repository config file: a small `[section] key = value` format.
//!
//! Only the subset rvs itself writes is supported: sections, simple keys,
//! `#`/`;` comments, and whitespace around `=`. Lookup keys are
//! `section.key`, case-insensitive in the section and key parts.

use std::collections::HashMap;
use std::path::Path;

use crate::RepoError;

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, String>,
}

impl Config {
    /// Load from `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, RepoError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(RepoError::Io(e)),
        };
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        let mut section = String::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                if let Some(name) = rest.strip_suffix(']') {
                    section = name.trim().to_ascii_lowercase();
                }
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = format!("{section}.{}", key.trim().to_ascii_lowercase());
                values.insert(key, value.trim().to_string());
            }
        }
        Self { values }
    }

    /// Look up `section.key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_keys() {
        let config = Config::parse(
            "[core]\n\trepositoryformatversion = 0\n[user]\n\tname = A Coder\n\temail = a@b.c\n",
        );
        assert_eq!(config.get("core.repositoryformatversion"), Some("0"));
        assert_eq!(config.get("user.name"), Some("A Coder"));
        assert_eq!(config.get("user.email"), Some("a@b.c"));
        assert_eq!(config.get("user.missing"), None);
    }

    #[test]
    fn section_lookup_is_case_insensitive() {
        let config = Config::parse("[User]\nName = X\n");
        assert_eq!(config.get("user.name"), Some("X"));
        assert_eq!(config.get("USER.NAME"), Some("X"));
    }

    #[test]
    fn comments_are_skipped() {
        let config = Config::parse("# comment\n[a]\n; another\nk = v\n");
        assert_eq!(config.get("a.k"), Some("v"));
    }

    #[test]
    fn missing_file_is_empty() {
        let config = Config::load(Path::new("/no/such/config")).unwrap();
        assert_eq!(config.get("user.name"), None);
    }
}
