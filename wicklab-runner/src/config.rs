//! TOML search configuration.
//!
//! ```toml
//! [search]
//! trials = 500
//! seed = 7
//! strategy = "random"
//!
//! [params]
//! tick_size = 0.25
//! tick_value = 0.50
//!
//! [space.target_rr]
//! kind = "float_range"
//! min = 1.5
//! max = 2.5
//! step = 0.5
//! ```
//!
//! `[params]` is the base Parameter Set every proposal starts from. Each
//! `[space.<name>]` table replaces that dimension of the default search
//! space; `kind = "fixed"` pins it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use wicklab_core::ParameterSet;

use crate::search::{ParamDomain, SearchError, SearchSettings, SearchSpace, StrategyKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// `[search]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchSection {
    pub trials: usize,
    pub seed: u64,
    pub strategy: StrategyKind,
    pub batch_size: usize,
    pub threads: Option<usize>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            trials: 100,
            seed: 42,
            strategy: StrategyKind::Random,
            batch_size: 0,
            threads: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub search: SearchSection,
    pub params: ParameterSet,
    pub space: BTreeMap<String, ParamDomain>,
}

impl SearchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.search_space()?;
        config.params.clone().validated().map_err(SearchError::from)?;
        Ok(config)
    }

    /// Default space with the `[space]` overrides applied, validated.
    pub fn search_space(&self) -> Result<SearchSpace, SearchError> {
        let mut space = SearchSpace::default_space();
        for (name, domain) in &self.space {
            space.set(name, domain.clone());
        }
        space.validate_with(&self.params)?;
        Ok(space)
    }

    pub fn settings(&self) -> SearchSettings {
        SearchSettings {
            trials: self.search.trials,
            batch_size: self.search.batch_size,
            threads: self.search.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wicklab_core::params::StopMethod;
    use wicklab_core::ParamValue;

    #[test]
    fn empty_config_uses_defaults() {
        let config = SearchConfig::from_toml("").unwrap();
        assert_eq!(config.search.trials, 100);
        assert_eq!(config.search.seed, 42);
        assert_eq!(config.search.strategy, StrategyKind::Random);
        assert_eq!(config.params, ParameterSet::default());
        assert_eq!(config.search_space().unwrap(), SearchSpace::default_space());
    }

    #[test]
    fn full_config_parses() {
        let config = SearchConfig::from_toml(
            r#"
            [search]
            trials = 250
            seed = 7
            strategy = "grid"
            threads = 2

            [params]
            tick_size = 0.5
            stop_method = "fixed_ticks"

            [space.target_rr]
            kind = "float_range"
            min = 1.5
            max = 2.5
            step = 0.5

            [space.stop_method]
            kind = "fixed"
            value = "fixed_ticks"
            "#,
        )
        .unwrap();
        assert_eq!(config.search.trials, 250);
        assert_eq!(config.search.strategy, StrategyKind::Grid);
        assert_eq!(config.settings().threads, Some(2));
        assert_eq!(config.params.tick_size, 0.5);
        assert_eq!(config.params.stop_method, StopMethod::FixedTicks);

        let space = config.search_space().unwrap();
        assert_eq!(space.len(), SearchSpace::default_space().len());
        assert_eq!(space.get("target_rr").unwrap().cardinality(), 3);
        assert_eq!(
            space.get("stop_method"),
            Some(&ParamDomain::Fixed {
                value: ParamValue::Choice("fixed_ticks".into())
            })
        );
    }

    #[test]
    fn unknown_space_dimension_is_rejected() {
        let err = SearchConfig::from_toml(
            r#"
            [space.lookback]
            kind = "int_range"
            min = 1
            max = 5
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Search(SearchError::UnknownParameter(ref n)) if n == "lookback"
        ));
    }

    #[test]
    fn space_override_with_invalid_values_is_rejected_at_load() {
        let err = SearchConfig::from_toml(
            r#"
[space.displacement_length]
kind = "int_range"
min = 1
max = 3
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Search(SearchError::Param(_))));

        // Valid once the whole range is at least two bars.
        assert!(SearchConfig::from_toml(
            "[space.displacement_length]\nkind = \"int_range\"\nmin = 2\nmax = 3\n"
        )
        .is_ok());
    }

    #[test]
    fn bad_base_params_are_rejected() {
        assert!(SearchConfig::from_toml("[params]\ntick_size = 0.0\n").is_err());
        assert!(matches!(
            SearchConfig::from_toml("[search]\nstrategy = \"annealing\"\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = SearchConfig::from_file(Path::new("/nonexistent/search.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
