// Error taxonomy for the territory library
// Input validation, store access and aggregate state

use std::path::PathBuf;

/// Every failure the library can report.
///
/// The binary wraps these in `anyhow` with extra context; library callers can
/// match on the variant to tell bad input apart from a broken store.
#[derive(Debug, thiserror::Error)]
pub enum TerritoryError {
    /// The input has no header row with the resident columns.
    #[error("input is not a resident table: missing column(s) {}", missing.join(", "))]
    NotTabular { missing: Vec<String> },

    /// A row could not be turned into a resident record.
    #[error("invalid record at line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    /// The resident table has zero rows.
    #[error("resident table is empty")]
    EmptyInput,

    /// An aggregate was requested before it was computed.
    #[error("{0} not computed yet")]
    NotComputed(&'static str),

    /// Connection or statement failure against the table store.
    #[error("store access failed ({context}): {source}")]
    StoreAccess {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The log sink or filter could not be installed.
    #[error("logging setup failed: {0}")]
    LoggingSetup(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TerritoryError {
    pub fn is_store_access(&self) -> bool {
        matches!(self, TerritoryError::StoreAccess { .. })
    }

    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            TerritoryError::NotTabular { .. }
                | TerritoryError::InvalidRecord { .. }
                | TerritoryError::EmptyInput
                | TerritoryError::Csv(_)
                | TerritoryError::Config { .. }
                | TerritoryError::Io { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TerritoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let missing = TerritoryError::NotTabular {
            missing: vec!["RUA".to_string(), "IDD".to_string()],
        };
        assert!(missing.is_input_validation());
        assert!(!missing.is_store_access());
        assert_eq!(
            missing.to_string(),
            "input is not a resident table: missing column(s) RUA, IDD"
        );

        let store = TerritoryError::StoreAccess {
            context: "open territorio.db".to_string(),
            source: rusqlite::Error::InvalidQuery,
        };
        assert!(store.is_store_access());
        assert!(!store.is_input_validation());

        let config = TerritoryError::Config {
            path: "territorio.toml".into(),
            source: toml::from_str::<toml::Value>("[database").unwrap_err(),
        };
        assert!(config.is_input_validation());
        assert!(config.to_string().starts_with("invalid config file territorio.toml"));

        assert_eq!(
            TerritoryError::NotComputed("street counts").to_string(),
            "street counts not computed yet"
        );
    }
}
