use codescout_embeddings::RemoteEmbeddingConfig;
use codescout_indexer::WatcherConfig;
use std::env;
use std::path::PathBuf;

/// Hard cap on concurrently tracked projects unless overridden.
pub const DEFAULT_MAX_PROJECTS: usize = 20;

const CACHE_DIR_NAME: &str = "codescout";

/// Process-wide settings, sourced from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Root directory holding one store subdirectory per project.
    pub cache_dir: PathBuf,
    pub max_projects: usize,
    /// Project used when a request carries no explicit path.
    pub default_path: Option<PathBuf>,
    /// Projects indexed eagerly at startup.
    pub warm_paths: Vec<PathBuf>,
    pub embedding: RemoteEmbeddingConfig,
    pub watcher: WatcherConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_projects: DEFAULT_MAX_PROJECTS,
            default_path: None,
            warm_paths: Vec::new(),
            embedding: RemoteEmbeddingConfig::default(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl ServiceConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| env::var(key).ok());
        config.embedding = RemoteEmbeddingConfig::from_env();
        config
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("CODESCOUT_CACHE_DIR").filter(|v| !v.trim().is_empty()) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("CODESCOUT_MAX_PROJECTS") {
            match raw.trim().parse::<usize>() {
                Ok(value) if value > 0 => config.max_projects = value,
                _ => log::warn!("ignoring CODESCOUT_MAX_PROJECTS={raw:?}: expected a positive integer"),
            }
        }
        config.default_path = lookup("CODESCOUT_DEFAULT_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        if let Some(raw) = lookup("CODESCOUT_WARM_PATHS") {
            config.warm_paths = parse_warm_paths(&raw);
        }

        config
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CACHE_DIR_NAME)
}

/// PATH-style list of project roots, deduplicated in order.
fn parse_warm_paths(raw: &str) -> Vec<PathBuf> {
    let mut seen = Vec::new();
    for path in env::split_paths(raw) {
        if path.as_os_str().is_empty() || seen.contains(&path) {
            continue;
        }
        seen.push(path);
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = ServiceConfig::from_lookup(|_| None);
        assert_eq!(config.max_projects, DEFAULT_MAX_PROJECTS);
        assert_eq!(config.default_path, None);
        assert!(config.warm_paths.is_empty());
        assert!(config.cache_dir.ends_with(CACHE_DIR_NAME));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("CODESCOUT_CACHE_DIR", "/tmp/scout-cache"),
            ("CODESCOUT_MAX_PROJECTS", "5"),
            ("CODESCOUT_DEFAULT_PATH", "/work/repo"),
        ]));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/scout-cache"));
        assert_eq!(config.max_projects, 5);
        assert_eq!(config.default_path, Some(PathBuf::from("/work/repo")));
    }

    #[test]
    fn invalid_max_projects_keeps_the_default() {
        let config = ServiceConfig::from_lookup(lookup(&[("CODESCOUT_MAX_PROJECTS", "zero")]));
        assert_eq!(config.max_projects, DEFAULT_MAX_PROJECTS);

        let config = ServiceConfig::from_lookup(lookup(&[("CODESCOUT_MAX_PROJECTS", "0")]));
        assert_eq!(config.max_projects, DEFAULT_MAX_PROJECTS);
    }

    #[test]
    fn warm_paths_split_and_dedupe() {
        let config = ServiceConfig::from_lookup(lookup(&[(
            "CODESCOUT_WARM_PATHS",
            "/work/a:/work/b:/work/a",
        )]));
        assert_eq!(
            config.warm_paths,
            vec![PathBuf::from("/work/a"), PathBuf::from("/work/b")]
        );
    }
}
