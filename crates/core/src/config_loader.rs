use std::path::Path;

use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `AXIOM_NULL_MODEL__N_PERMUTATIONS=5000`.
pub const ENV_PREFIX: &str = "AXIOM_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from built-in defaults and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment override cannot be parsed.
    pub fn load() -> Result<AppConfig> {
        Self::figment(None)
            .extract()
            .context("Failed to load configuration")
    }

    /// Loads configuration layering defaults, a TOML file and environment variables.
    ///
    /// A missing file is not an error; its layer is simply empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment override cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let path = path.as_ref();
        Self::figment(Some(path))
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    #[test]
    fn defaults_apply_without_sources() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().expect("defaults load");
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.null_model.n_permutations, 1000);
            assert_eq!(config.null_model.block_size, 7);
            assert!((config.fdr.alpha - 0.05).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "axiom.toml",
                r#"
                [null_model]
                n_permutations = 5000
                direction = "greater"
                seed = 42

                [fdr]
                alpha = 0.1
                "#,
            )?;

            let config = ConfigLoader::load_from("axiom.toml").expect("toml loads");
            assert_eq!(config.null_model.n_permutations, 5000);
            assert_eq!(config.null_model.direction, Direction::Greater);
            assert_eq!(config.null_model.seed, Some(42));
            assert_eq!(config.null_model.block_size, 7);
            assert!((config.fdr.alpha - 0.1).abs() < f64::EPSILON);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("axiom.toml", "[null_model]\nblock_size = 14\n")?;
            jail.set_env("AXIOM_NULL_MODEL__BLOCK_SIZE", "28");

            let config = ConfigLoader::load_from("axiom.toml").expect("env loads");
            assert_eq!(config.null_model.block_size, 28);
            Ok(())
        });
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("does-not-exist.toml").expect("loads");
            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_value_reports_error() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("axiom.toml", "[null_model]\nn_permutations = \"many\"\n")?;
            assert!(ConfigLoader::load_from("axiom.toml").is_err());
            Ok(())
        });
    }
}
