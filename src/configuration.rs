//! Named options of the validators and of the stores
//!
//! Options are read from a flat JSON object, keys being `<component>.<option>`:
//!
//! ```json
//! { "calendar_coverage.max_days_without_service": 14, "stop_times.mode": "unsorted" }
//! ```
use anyhow::Context;
use chrono::NaiveDate;
use gtfs_model::fields::parse_date;
use gtfs_store::{DaoOptions, StoreMode, StoreOptions};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Type of an option value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Integer,
    Float,
    /// `YYYYMMDD`
    Date,
    Text,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            OptionKind::Bool => "bool",
            OptionKind::Integer => "integer",
            OptionKind::Float => "float",
            OptionKind::Date => "date",
            OptionKind::Text => "text",
        })
    }
}

/// Declaration of an option; `name` is relative to its component
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    /// Default value, as printed by `--list-validators`
    pub default: &'static str,
    pub description: &'static str,
}

/// Options of the data access object
pub const DAO_OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "stop_times.mode",
        kind: OptionKind::Text,
        default: "auto",
        description: "Layout of the stop times: packed, unsorted or auto",
    },
    OptionSpec {
        name: "stop_times.max_interleaving",
        kind: OptionKind::Integer,
        default: "100",
        description: "Trips of stop_times.txt kept open at the same time by the packed layout",
    },
    OptionSpec {
        name: "shape_points.mode",
        kind: OptionKind::Text,
        default: "auto",
        description: "Layout of the shape points: packed, unsorted or auto",
    },
    OptionSpec {
        name: "shape_points.max_interleaving",
        kind: OptionKind::Integer,
        default: "100",
        description: "Shapes of shapes.txt kept open at the same time by the packed layout",
    },
    OptionSpec {
        name: "dao.max_late_recurrences",
        kind: OptionKind::Integer,
        default: "10",
        description: "Parents coming back after being packed before the auto mode switches to unsorted",
    },
];

/// Values of the options, by `<component>.<option>` key
///
/// A missing key gives the default value, as does a value of the wrong type (with a warning).
#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    values: FxHashMap<String, Value>,
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object of scalars
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let object: serde_json::Map<String, Value> =
            serde_json::from_str(json).context("configuration must be a JSON object")?;
        Ok(Self {
            values: object.into_iter().collect(),
        })
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("impossible to read configuration {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("invalid configuration {}", path.display()))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    fn lookup<T>(
        &self,
        key: &str,
        expected: OptionKind,
        default: T,
        read: impl FnOnce(&Value) -> Option<T>,
    ) -> T {
        match self.values.get(key) {
            None => default,
            Some(value) => read(value).unwrap_or_else(|| {
                log::warn!(
                    "option {}: {} is not a valid {}, default value used",
                    key,
                    value,
                    expected
                );
                default
            }),
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        self.lookup(key, OptionKind::Bool, default, Value::as_bool)
    }

    pub fn integer(&self, key: &str, default: i64) -> i64 {
        self.lookup(key, OptionKind::Integer, default, Value::as_i64)
    }

    pub fn float(&self, key: &str, default: f64) -> f64 {
        self.lookup(key, OptionKind::Float, default, Value::as_f64)
    }

    pub fn text(&self, key: &str, default: &str) -> String {
        self.lookup(key, OptionKind::Text, default.to_owned(), |v| {
            v.as_str().map(str::to_owned)
        })
    }

    /// A date written `YYYYMMDD`, `None` if absent
    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.lookup(key, OptionKind::Date, None, |v| {
            v.as_str().and_then(|s| parse_date(s).ok()).map(Some)
        })
    }

    fn store_options(&self, prefix: &str) -> StoreOptions {
        let defaults = StoreOptions::default();
        let mode = self.lookup(
            &format!("{}.mode", prefix),
            OptionKind::Text,
            defaults.mode,
            |v| v.as_str().and_then(|s| s.parse::<StoreMode>().ok()),
        );
        StoreOptions {
            mode,
            max_interleaving: self
                .integer(
                    &format!("{}.max_interleaving", prefix),
                    defaults.max_interleaving as i64,
                )
                .max(1) as usize,
            max_late_recurrences: self
                .integer(
                    "dao.max_late_recurrences",
                    defaults.max_late_recurrences as i64,
                )
                .max(0) as usize,
        }
    }

    /// Options of the DAO, see [DAO_OPTIONS]
    pub fn dao_options(&self, verbose: bool) -> DaoOptions {
        DaoOptions {
            stop_times: self.store_options("stop_times"),
            shape_points: self.store_options("shape_points"),
            verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_values_with_defaults() {
        let config = ValidatorConfig::from_json_str(
            r#"{
                "calendar_coverage.max_days_without_service": 14,
                "calendar_coverage.check_expired": "yes",
                "calendar_coverage.expired_cutoff_date": "20240301",
                "stop_times.mode": "unsorted",
                "shape_points.max_interleaving": 0
            }"#,
        )
        .unwrap();
        assert_eq!(14, config.integer("calendar_coverage.max_days_without_service", 7));
        assert!(config.bool("calendar_coverage.check_expired", true));
        assert_eq!(
            NaiveDate::from_ymd_opt(2024, 3, 1),
            config.date("calendar_coverage.expired_cutoff_date")
        );
        assert_eq!(None, config.date("calendar_coverage.future_cutoff_date"));
        assert_eq!(2.0, config.float("transfer.max_speed", 2.0));

        let dao = config.dao_options(false);
        assert_eq!(StoreMode::Unsorted, dao.stop_times.mode);
        assert_eq!(100, dao.stop_times.max_interleaving);
        assert_eq!(StoreMode::Auto, dao.shape_points.mode);
        assert_eq!(1, dao.shape_points.max_interleaving);
    }

    #[test]
    fn not_an_object() {
        assert!(ValidatorConfig::from_json_str("[1, 2]").is_err());
        assert!(ValidatorConfig::from_json_str("{").is_err());
    }
}
