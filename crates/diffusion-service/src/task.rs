//! Execution context and the unit-of-work boundary.
//!
//! User-facing parameters are mapped onto context keys through a fixed table:
//!
//! | parameter        | context key      | value                     |
//! |------------------|------------------|---------------------------|
//! | `heatColumnName` | `heatColumnName` | selection (chosen column) |
//! | `time`           | `time`           | number                    |

#![allow(missing_docs)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::envelope::ErrorRecord;
use crate::resolver::Target;

pub const HEAT_COLUMN_NAME: &str = "heatColumnName";
pub const TIME: &str = "time";

/// Body of the `*_with_options` routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffusionParameters {
    pub heat_column_name: String,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    /// A list option with one chosen entry.
    Selection {
        choices: Vec<String>,
        selected: String,
    },
    Number(f64),
}

/// Named options handed to a unit of work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    values: IndexMap<SmolStr, ContextValue>,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_parameters(parameters: &DiffusionParameters) -> Self {
        let mut context = Self::new();
        context.insert(
            HEAT_COLUMN_NAME,
            ContextValue::Selection {
                choices: vec![parameters.heat_column_name.clone()],
                selected: parameters.heat_column_name.clone(),
            },
        );
        context.insert(TIME, ContextValue::Number(parameters.time));
        context
    }

    pub fn insert(&mut self, key: &str, value: ContextValue) {
        self.values.insert(SmolStr::new(key), value);
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    /// Chosen entry of a selection option.
    pub fn selected(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            ContextValue::Selection { selected, .. } => Some(selected.as_str()),
            ContextValue::Number(_) => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            ContextValue::Number(value) => Some(*value),
            ContextValue::Selection { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// Terminal failure of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskFault {
    /// Pre-classified records, appended verbatim to the envelope.
    #[error("service reported {} error(s)", .0.len())]
    Service(Vec<ErrorRecord>),

    /// Any other failure; collapsed into one task execution record.
    #[error("{0}")]
    Execution(SmolStr),
}

/// Externally supplied analysis routine, run synchronously to completion.
pub trait UnitOfWork: Send + Sync {
    fn run(&self, target: &Target, context: &ExecutionContext) -> Result<(), TaskFault>;
}
