//! File-iteration driver for php-depend.
//!
//! An [`Engine`] takes each file through the parse cache, the parser and
//! the builder, and applies the configured policy to files that fail.

pub mod config;

pub use config::{load_config, parse_config_str, Config};

use std::path::Path;

use php_depend_index::{content_hash, Builder, BuilderError, Cache, FileCache, MemoryCache, UnitId};
use php_depend_parser::{parse_source, ParseError, SourceUnit};
use thiserror::Error;

/// Why a file contributed nothing to the model.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Tokenizer and grammar errors. Both carry the file already.
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{path}: {source}")]
    Builder {
        path: String,
        #[source]
        source: BuilderError,
    },
}

impl AnalysisError {
    pub fn path(&self) -> &str {
        match self {
            AnalysisError::Io { path, .. } | AnalysisError::Builder { path, .. } => path,
            AnalysisError::Parse(error) => error.file(),
        }
    }
}

/// File counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Files tokenized and parsed during this run.
    pub parsed: usize,
    /// Files registered straight from the cache.
    pub cached: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn total(&self) -> usize {
        self.parsed + self.cached + self.failed
    }
}

/// One analysis run: a builder, a parse cache and the config they run under.
pub struct Engine {
    config: Config,
    builder: Builder,
    cache: Box<dyn Cache>,
    errors: Vec<AnalysisError>,
    stats: RunStats,
}

impl Engine {
    /// Engine with the cache the config asks for: on disk under
    /// `cache-dir`, otherwise in memory.
    pub fn new(config: Config) -> Self {
        let cache: Box<dyn Cache> = match &config.cache_dir {
            Some(dir) => Box::new(FileCache::new(dir.clone())),
            None => Box::new(MemoryCache::new()),
        };
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: Config, cache: Box<dyn Cache>) -> Self {
        Engine {
            config,
            builder: Builder::new(),
            cache,
            errors: Vec::new(),
            stats: RunStats::default(),
        }
    }

    /// Analyze one file's contents.
    ///
    /// Returns the registered unit, or `None` when the file failed and was
    /// recorded in [`errors`](Self::errors). With `abort-on-error` set the
    /// failure is returned instead.
    pub fn analyze_source(
        &mut self,
        path: &str,
        source: &str,
    ) -> Result<Option<UnitId>, AnalysisError> {
        let result = self.process(path, source);
        self.settle(result)
    }

    /// Read and analyze one file.
    pub fn analyze_file(&mut self, path: &Path) -> Result<Option<UnitId>, AnalysisError> {
        let display = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(source) => self.analyze_source(&display, &source),
            Err(source) => self.settle(Err(AnalysisError::Io {
                path: display,
                source,
            })),
        }
    }

    /// Analyze the given files in order. Paths are taken as they are; no
    /// directory is walked.
    pub fn analyze_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<RunStats, AnalysisError> {
        tracing::info!("Analyzing {} PHP files", paths.len());
        for path in paths {
            self.analyze_file(path.as_ref())?;
        }
        tracing::info!(
            "Analysis complete: {} parsed, {} from cache, {} failed",
            self.stats.parsed,
            self.stats.cached,
            self.stats.failed
        );
        Ok(self.stats)
    }

    /// Build the effective method table of every declared type and collect
    /// the trait collisions that surface.
    pub fn method_errors(&self) -> Vec<BuilderError> {
        self.builder
            .types()
            .filter(|ty| ty.declaration.is_some())
            .filter_map(|ty| self.builder.effective_methods(ty.id).err())
            .collect()
    }

    pub fn builder(&self) -> &Builder {
        &self.builder
    }

    pub fn into_builder(self) -> Builder {
        self.builder
    }

    /// Files that failed and were skipped, in the order they were seen.
    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn process(&mut self, path: &str, source: &str) -> Result<UnitId, AnalysisError> {
        let options = self.config.parser_options();
        let id = content_hash(&options, source);

        let (unit, from_cache) = match self.cache.restore(&id) {
            Some(unit) => {
                tracing::debug!("Cache hit for {}", path);
                (retarget(unit, path), true)
            }
            None => {
                let unit = parse_source(path, source, options)?;
                if let Err(e) = self.cache.store(&id, &unit) {
                    tracing::warn!("Failed to cache {}: {}", path, e);
                }
                (unit, false)
            }
        };

        let declared = unit.types.len() + unit.functions.len();
        let unit_id = self
            .builder
            .register_unit(unit)
            .map_err(|source| AnalysisError::Builder {
                path: path.to_string(),
                source,
            })?;
        if from_cache {
            self.stats.cached += 1;
        } else {
            self.stats.parsed += 1;
        }
        tracing::debug!("Indexed {}: {} declarations", path, declared);
        Ok(unit_id)
    }

    fn settle(
        &mut self,
        result: Result<UnitId, AnalysisError>,
    ) -> Result<Option<UnitId>, AnalysisError> {
        match result {
            Ok(unit) => Ok(Some(unit)),
            Err(error) => {
                self.stats.failed += 1;
                if self.config.abort_on_error {
                    return Err(error);
                }
                tracing::warn!("Skipping {}", error);
                self.errors.push(error);
                Ok(None)
            }
        }
    }
}

/// A cache entry is keyed by content only, so the same file may come back
/// under another path.
fn retarget(mut unit: SourceUnit, path: &str) -> SourceUnit {
    if unit.path != path {
        unit.path = path.to_string();
        unit.ast.node_mut(unit.root).image = path.to_string();
    }
    unit
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_depend_index::Resolved;

    #[test]
    fn test_failed_file_is_recorded_and_skipped() {
        let mut engine = Engine::new(Config::default());
        assert!(engine
            .analyze_source("ok.php", "<?php class A {}")
            .unwrap()
            .is_some());
        assert!(engine
            .analyze_source("bad.php", "<?php class B {")
            .unwrap()
            .is_none());

        assert_eq!(engine.errors().len(), 1);
        assert_eq!(engine.errors()[0].path(), "bad.php");
        assert!(engine.builder().find_type("B").is_none());
        assert_eq!(
            engine.stats(),
            RunStats {
                parsed: 1,
                cached: 0,
                failed: 1
            }
        );
    }

    #[test]
    fn test_abort_on_error_returns_failure() {
        let config = Config {
            abort_on_error: true,
            ..Config::default()
        };
        let mut engine = Engine::new(config);
        let err = engine
            .analyze_source("bad.php", "<?php $x = ;")
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse(_)));
        assert!(engine.errors().is_empty());
        assert_eq!(engine.stats().failed, 1);
    }

    #[test]
    fn test_identical_contents_hit_the_memory_cache() {
        let mut engine = Engine::new(Config::default());
        engine
            .analyze_source("a.php", "<?php namespace A; class X {}")
            .unwrap();
        let unit = engine
            .analyze_source("copy/a.php", "<?php namespace A; class X {}")
            .unwrap()
            .unwrap();

        assert_eq!(engine.stats().cached, 1);
        let restored = engine.builder().unit(unit);
        assert_eq!(restored.path, "copy/a.php");
        assert_eq!(restored.ast.image(restored.root), "copy/a.php");
    }

    #[test]
    fn test_frozen_name_rejects_later_file() {
        let mut engine = Engine::new(Config::default());
        engine
            .analyze_source("a.php", "<?php class A extends B {}")
            .unwrap();
        let a = engine.builder().find_type("A").unwrap();
        assert!(matches!(
            engine.builder().parent_class(a),
            Some(Resolved::Unknown(_))
        ));

        assert!(engine
            .analyze_source("b.php", "<?php interface B {}")
            .unwrap()
            .is_none());
        assert!(matches!(
            engine.errors()[0],
            AnalysisError::Builder {
                source: BuilderError::BuilderFrozen { .. },
                ..
            }
        ));
        assert_eq!(engine.builder().units().count(), 1);
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Engine::new(Config::default());
        let stats = engine
            .analyze_paths(&[dir.path().join("missing.php")])
            .unwrap();
        assert_eq!(stats.failed, 1);
        assert!(matches!(engine.errors()[0], AnalysisError::Io { .. }));
    }
}
