/*! Configuration files.

Engine flags can be loaded from a TOML file like this:

```toml
[regex]
case_insensitive = true
diacritics_insensitive = false
auto_word_boundaries = true
```

Missing keys take the values from [`Config::default`].
 */

use std::path::Path;

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::re::{Flag, Flags};

/// Configuration for the regexp engine.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Options that control how patterns are compiled.
    pub regex: RegexConfig,
}

/// Options that control how patterns are compiled.
#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RegexConfig {
    /// Match letters regardless of their case.
    pub case_insensitive: bool,
    /// Match letters regardless of their diacritics.
    pub diacritics_insensitive: bool,
    /// Match only at word boundaries.
    pub auto_word_boundaries: bool,
}

impl Config {
    /// Returns the compilation flags that correspond to this configuration.
    pub fn flags(&self) -> Flags {
        let mut flags = Flags::none();
        if self.regex.case_insensitive {
            flags.set(Flag::CaseInsensitive);
        }
        if self.regex.diacritics_insensitive {
            flags.set(Flag::DiacriticsInsensitive);
        }
        if self.regex.auto_word_boundaries {
            flags.set(Flag::AutoWordBoundaries);
        }
        flags
    }
}

/// Load config file from a given path. Path must contain a valid TOML file or
/// this function will propagate the error.
pub fn load_config_from_file(
    config_file: &Path,
) -> Result<Config, figment::Error> {
    let config: Config =
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file_exact(config_file))
            .extract()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::{load_config_from_file, Config};
    use crate::re::{Flag, Flags};

    #[test]
    fn flags_from_config() {
        let mut config = Config::default();
        assert_eq!(config.flags(), Flags::none());

        config.regex.case_insensitive = true;
        config.regex.auto_word_boundaries = true;
        assert_eq!(
            config.flags(),
            Flag::CaseInsensitive | Flag::AutoWordBoundaries
        );
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir()
            .join(format!("ling-regex-config-{}.toml", std::process::id()));

        fs::write(&path, "[regex]\ndiacritics_insensitive = true\n").unwrap();
        let config = load_config_from_file(&path);
        fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert!(config.regex.diacritics_insensitive);
        assert!(!config.regex.case_insensitive);
        assert_eq!(config.flags(), Flags::from(Flag::DiacriticsInsensitive));
    }

    #[test]
    fn missing_file() {
        assert!(load_config_from_file(
            std::env::temp_dir().join("ling-regex-missing.toml").as_path()
        )
        .is_err());
    }
}
