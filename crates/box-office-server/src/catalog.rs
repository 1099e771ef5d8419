use std::path::Path;

use box_office_core::{Config, ShowId};
use eyre::{Result, WrapErr};
use serde::Deserialize;

/// Catalog file, e.g.
///
/// ```toml
/// shows = ["NSY103", "RCP105", "NFP121"]
/// min-seats = 16
/// max-seats = 30
/// ```
#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CatalogFile {
    pub shows: Vec<String>,
    #[serde(default)]
    pub min_seats: Option<u8>,
    #[serde(default)]
    pub max_seats: Option<u8>,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("cannot read catalog {}", path.display()))?;
        Self::parse(&contents).wrap_err_with(|| format!("invalid catalog {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Replace the catalog of `config`, and the seat range if given
    pub fn apply(&self, config: &mut Config) -> Result<()> {
        config.catalog = self
            .shows
            .iter()
            .map(|id| ShowId::new(id))
            .collect::<Result<_, _>>()?;
        if let Some(min) = self.min_seats {
            config.min_seats = min;
        }
        if let Some(max) = self.max_seats {
            config.max_seats = max;
        }
        Ok(config.validate()?)
    }
}

#[cfg(test)]
mod tests {
    use box_office_core::Error;

    use super::*;

    #[test]
    fn full_catalog() {
        let file = CatalogFile::parse(
            r#"
            shows = ["NSY103", "RCP105"]
            min-seats = 5
            max-seats = 10
            "#,
        )
        .unwrap();
        let mut config = Config::default();
        file.apply(&mut config).unwrap();

        let ids: Vec<_> = config.catalog.iter().map(ShowId::as_str).collect();
        assert_eq!(ids, ["NSY103", "RCP105"]);
        assert_eq!((config.min_seats, config.max_seats), (5, 10));
    }

    #[test]
    fn seat_range_defaults_are_kept() {
        let file = CatalogFile::parse(r#"shows = ["ABC123"]"#).unwrap();
        let mut config = Config::default();
        file.apply(&mut config).unwrap();
        assert_eq!((config.min_seats, config.max_seats), (16, 30));
    }

    #[test]
    fn invalid_catalogs_are_rejected() {
        let mut config = Config::default();

        let file = CatalogFile::parse(r#"shows = ["TOOLONG1"]"#).unwrap();
        let err = file.apply(&mut config).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidShowId(_))));

        let file = CatalogFile::parse(r#"shows = ["ABC123", "ABC123"]"#).unwrap();
        let err = file.apply(&mut config).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::DuplicateShow(_))));

        let file = CatalogFile::parse(r#"shows = []"#).unwrap();
        assert!(file.apply(&mut config).is_err());

        assert!(CatalogFile::parse(r#"show = ["ABC123"]"#).is_err());
    }
}
