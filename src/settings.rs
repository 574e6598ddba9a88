//! Settings, and building a seeded resolver from them.
//!
//! Settings are read from an optional TOML file, then overridden by environment variables
//! prefixed with `RESOLVER__`, with `__` separating nested keys: `RESOLVER__LOG__FILTER=debug`
//! sets `log.filter`.
//!
//! ```toml
//! [log]
//! filter = "resolver=debug"
//!
//! [seed]
//! dataset = "empty"
//! path = "seed.toml"
//! ```
//!
//! A seed file maps entity names to lists of records:
//!
//! ```toml
//! [[Author]]
//! id = 3
//! name = "Aldous Huxley"
//!
//! [[Book]]
//! title = "Brave New World"
//! author_id = 3
//! ```

use crate::{
    errors::{CreateError, SelectionError, SettingsError, ValidationError},
    library,
    resolver::Resolver,
    schema::ID,
    value::Value,
};
use config::{Config, Environment, File, FileFormat, Map};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

/// The prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "RESOLVER";

/// Every setting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Logging.
    pub log: LogSettings,
    /// Initial data.
    pub seed: SeedSettings,
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// A `tracing` filter directive, e.g. `info` or `resolver=debug`.
    pub filter: String,
}

impl Default for LogSettings {
    #[inline]
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

/// Initial data settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    /// The built-in dataset to load first.
    pub dataset: Dataset,
    /// A seed file to load after the dataset.
    pub path: Option<PathBuf>,
}

/// A built-in dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    /// The authors and books of [`library::seed`].
    #[default]
    Library,
    /// Nothing.
    Empty,
}

impl Settings {
    /// Load settings from an optional file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if a value has the wrong shape.
    #[inline]
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        Self::load_with(path, None)
    }

    /// Like [`load`](Self::load), but reading environment variables from `env` instead of the
    /// process environment when it is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if a value has the wrong shape.
    #[inline]
    pub fn load_with(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Build a library resolver and load the configured data into it.
    ///
    /// # Errors
    ///
    /// Returns an error if the seed file cannot be read or one of its records is rejected.
    #[inline]
    pub fn resolver(&self) -> Result<Resolver, SettingsError> {
        let resolver = Resolver::new(library::schema()?);
        match self.seed.dataset {
            Dataset::Library => library::seed(&resolver)?,
            Dataset::Empty => {},
        }
        if let Some(path) = &self.seed.path {
            let records = seed_file(&resolver, path)?;
            info!(path = %path.display(), records, "loaded seed file");
        }
        Ok(resolver)
    }
}

/// Load the records of a seed file. Returns the number of records loaded.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if a record is rejected. Records
/// before the rejected one stay loaded.
#[inline]
pub fn seed_file(resolver: &Resolver, path: &Path) -> Result<usize, SettingsError> {
    let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_owned(),
        source,
    })?;
    seed_str(resolver, &text)
}

/// Load the records of a seed document. Returns the number of records loaded.
///
/// Records are loaded in order within each entity type, and entity types in name order. A record
/// may give its key explicitly. Unknown entity types and keys repeated within the document are
/// rejected before anything is loaded.
///
/// # Errors
///
/// Returns an error if the document cannot be parsed, or if a record is rejected. Records before
/// a rejected one stay loaded.
#[inline]
pub fn seed_str(resolver: &Resolver, text: &str) -> Result<usize, SettingsError> {
    let entities: BTreeMap<String, Vec<BTreeMap<String, Value>>> = toml::from_str(text)?;
    check_document(resolver, &entities)?;

    let mut records = 0;
    for (entity, rows) in entities {
        for row in rows {
            drop(resolver.seed(&entity, row)?);
            records += 1;
        }
    }
    Ok(records)
}

/// Check the entity names and explicit keys of a parsed seed document.
fn check_document(
    resolver: &Resolver,
    entities: &BTreeMap<String, Vec<BTreeMap<String, Value>>>,
) -> Result<(), SettingsError> {
    for (entity, rows) in entities {
        if resolver.schema().entity(entity).is_none() {
            let err = SelectionError::UnknownEntity(entity.as_str().into());
            return Err(CreateError::from(err).into());
        }

        let mut keys = HashSet::with_capacity(rows.len());
        for key in rows.iter().filter_map(|row| row.get(ID)?.as_int()) {
            if !keys.insert(key) {
                return Err(ValidationError::DuplicateKey {
                    entity: entity.as_str().into(),
                    key,
                }
                .into());
            }
        }
    }
    Ok(())
}
