use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    id_factory::{IdFactory, IdStrategy},
    identifier::IdSyntax,
};

/// Default publication template.
pub const DEFAULT_TEMPLATE: &str = "**[{id}]**\n\n{content}\n\n**-- End of requirement**\n";

/// How requirement fragments are laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// One `<id>.<ext>` file holding the body.
    #[default]
    File,
    /// One `<id>/` directory holding a `<field>.<ext>` file per field.
    Directory,
}

/// Configuration for splitting, merging and publishing documents.
///
/// Values come from a `prk.toml` file at the fragment root and may be
/// overridden on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Identifier pattern, with `%d` marking the numeric slot.
    pub pattern: String,

    /// Minimum number of digits in the slot of generated identifiers.
    pub digits: usize,

    /// Extension of fragment files, without the dot.
    pub extension: String,

    /// Fragment layout used when writing.
    pub storage: StorageMode,

    /// Whether the transposed matrix lists identifiers no requirement cites.
    pub sparse: bool,

    /// Whether stray inline requirement marks are passed through rather than
    /// dropped by `merge` and `yield`.
    pub permissive: bool,

    /// Whether identifiers may contain underscores.
    pub allow_underscore: bool,

    /// How anonymous requirements are named.
    pub strategy: IdStrategy,

    /// Publication template; `{id}` and `{content}` are substituted.
    pub template: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            digits: default_digits(),
            extension: default_extension(),
            storage: StorageMode::default(),
            sparse: false,
            permissive: false,
            allow_underscore: false,
            strategy: IdStrategy::default(),
            template: default_template(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// The identifier character class in force.
    #[must_use]
    pub const fn syntax(&self) -> IdSyntax {
        if self.allow_underscore {
            IdSyntax::Underscore
        } else {
            IdSyntax::Strict
        }
    }

    /// Builds an empty identifier factory configured from these settings.
    ///
    /// An invalid pattern or width is logged and the default kept.
    #[must_use]
    pub fn id_factory(&self) -> IdFactory {
        let mut factory = IdFactory::new(self.syntax());
        factory.configure(&self.pattern, self.digits);
        factory.set_strategy(self.strategy);
        factory
    }
}

fn default_pattern() -> String {
    "REQ-%d".to_string()
}

const fn default_digits() -> usize {
    3
}

fn default_extension() -> String {
    "prk".to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default = "default_pattern")]
        pattern: String,

        #[serde(default = "default_digits")]
        digits: usize,

        #[serde(default = "default_extension")]
        extension: String,

        #[serde(default)]
        storage: StorageMode,

        #[serde(default)]
        sparse: bool,

        #[serde(default)]
        permissive: bool,

        #[serde(default)]
        allow_underscore: bool,

        #[serde(default)]
        strategy: IdStrategy,

        #[serde(default = "default_template")]
        template: String,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                pattern,
                digits,
                extension,
                storage,
                sparse,
                permissive,
                allow_underscore,
                strategy,
                template,
            } => Self {
                pattern,
                digits,
                extension,
                storage,
                sparse,
                permissive,
                allow_underscore,
                strategy,
                template,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        let Config {
            pattern,
            digits,
            extension,
            storage,
            sparse,
            permissive,
            allow_underscore,
            strategy,
            template,
        } = config;
        Self::V1 {
            pattern,
            digits,
            extension,
            storage,
            sparse,
            permissive,
            allow_underscore,
            strategy,
            template,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\npattern = \"SRS-%d\"\ndigits = 4\nstorage = \"directory\"\nsparse = true\npermissive = true\nstrategy = \"sequential\"\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.pattern, "SRS-%d");
        assert_eq!(config.digits, 4);
        assert_eq!(config.storage, StorageMode::Directory);
        assert_eq!(config.strategy, IdStrategy::Sequential);
        assert!(config.sparse);
        assert!(config.permissive);
        assert!(!config.allow_underscore);
        assert_eq!(config.extension, "prk");
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\ndigits = \"three\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prk.toml");
        let config = Config {
            allow_underscore: true,
            template: "[{id}] {content}\n".to_string(),
            ..Config::default()
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn factory_follows_configuration() {
        let config = Config {
            pattern: "SYS-%d".to_string(),
            digits: 2,
            strategy: IdStrategy::Sequential,
            ..Config::default()
        };
        let mut factory = config.id_factory();
        assert_eq!(factory.allocate("anything").unwrap().as_str(), "SYS-00");
    }
}
