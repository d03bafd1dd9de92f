//! # Sheet Schema
//!
//! The column layout of a sheet, loaded once at startup from TOML or built
//! in code. Only the layout is described here, never the contents.
//!
//! ```toml
//! [config]
//! min_column_capacity = 64
//!
//! [[column]]
//! id = 0
//! name = "position"
//! kind = "filled"
//! element = "vec3"
//!
//! [[column]]
//! id = 3
//! name = "burning"
//! kind = "sparse"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::column::{ColumnId, ColumnKind, ElementType, TypeInfo};
use crate::error::{CheckPolicy, SheetError, SheetResult};

/// Sheet-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Number of column slots. `0` derives it from the schema.
    pub column_capacity: usize,
    /// Entity capacity every new column starts with.
    pub min_column_capacity: usize,
    /// How detected errors are surfaced.
    pub check_policy: CheckPolicy,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            column_capacity: 0,
            min_column_capacity: 1,
            check_policy: CheckPolicy::Report,
        }
    }
}

/// Layout of one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Slot in the sheet.
    pub id: ColumnId,
    /// Display name used in diagnostics.
    #[serde(default)]
    pub name: Option<String>,
    /// Storage shape.
    pub kind: ColumnKind,
    /// Payload type; required unless `kind` is `sparse`.
    #[serde(default)]
    pub element: Option<ElementType>,
    /// Re-zero vacated rows.
    #[serde(default)]
    pub zeroed: bool,
}

impl ColumnSchema {
    /// A dense column of `element`.
    #[must_use]
    pub const fn filled(id: ColumnId, element: ElementType) -> Self {
        Self::new(id, ColumnKind::Filled, Some(element))
    }

    /// A payload-free sparse column.
    #[must_use]
    pub const fn sparse(id: ColumnId) -> Self {
        Self::new(id, ColumnKind::Sparse, None)
    }

    /// A sparse column carrying `element`.
    #[must_use]
    pub const fn sparse_with_data(id: ColumnId, element: ElementType) -> Self {
        Self::new(id, ColumnKind::SparseWithData, Some(element))
    }

    const fn new(id: ColumnId, kind: ColumnKind, element: Option<ElementType>) -> Self {
        Self {
            id,
            name: None,
            kind,
            element,
            zeroed: false,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Turns on re-zeroing of vacated rows.
    #[must_use]
    pub fn zero_on_alloc(mut self) -> Self {
        self.zeroed = true;
        self
    }

    /// Element descriptor, if the column carries a payload.
    #[must_use]
    pub fn type_info(&self) -> Option<TypeInfo> {
        self.element
            .map(|element| element.type_info().with_zeroed(self.zeroed))
    }
}

/// Complete sheet layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSchema {
    /// Sheet-wide settings.
    #[serde(default)]
    pub config: SheetConfig,
    /// Column layouts, written as `[[column]]` tables.
    #[serde(default, rename = "column")]
    pub columns: Vec<ColumnSchema>,
}

impl SheetSchema {
    /// An empty schema with `config`.
    #[must_use]
    pub const fn new(config: SheetConfig) -> Self {
        Self {
            config,
            columns: Vec::new(),
        }
    }

    /// Appends a column layout.
    #[must_use]
    pub fn with_column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Parses and validates a TOML schema.
    ///
    /// # Errors
    ///
    /// [`SheetError::Config`] on malformed TOML or an invalid layout.
    pub fn from_toml_str(source: &str) -> SheetResult<Self> {
        let schema: Self = toml::from_str(source).map_err(|e| {
            CheckPolicy::Report.report(SheetError::Config(format!("failed to parse schema: {e}")))
        })?;
        schema.validate()?;
        Ok(schema)
    }

    /// Reads, parses and validates a TOML schema file.
    ///
    /// # Errors
    ///
    /// [`SheetError::Config`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> SheetResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| {
            CheckPolicy::Report.report(SheetError::Config(format!(
                "failed to read schema {}: {e}",
                path.display()
            )))
        })?;
        tracing::info!(path = %path.display(), "loading sheet schema");
        Self::from_toml_str(&source)
    }

    /// Checks the layout is self-consistent.
    ///
    /// # Errors
    ///
    /// [`SheetError::Config`] for a duplicate id, a payload kind without an
    /// element, a sparse column with one, or an id past a fixed
    /// `column_capacity`.
    pub fn validate(&self) -> SheetResult<()> {
        let policy = self.config.check_policy;
        let mut seen = HashSet::new();
        for column in &self.columns {
            let id = column.id;
            if !seen.insert(id) {
                return policy.fail(SheetError::Config(format!("column {id} declared twice")));
            }
            match (column.kind.has_payload(), column.element) {
                (true, None) => {
                    return policy.fail(SheetError::Config(format!(
                        "column {id} is {} but has no element type",
                        column.kind
                    )));
                }
                (false, Some(element)) => {
                    return policy.fail(SheetError::Config(format!(
                        "column {id} is sparse but declares element {element:?}"
                    )));
                }
                _ => {}
            }
            let fixed = self.config.column_capacity;
            if fixed != 0 && id.index() >= fixed {
                return policy.fail(SheetError::Config(format!(
                    "column {id} does not fit in column_capacity {fixed}"
                )));
            }
        }
        Ok(())
    }

    /// Column slots the sheet needs: the configured capacity, or one past
    /// the highest declared id if that is larger.
    #[must_use]
    pub fn column_capacity(&self) -> usize {
        let needed = self
            .columns
            .iter()
            .map(|c| c.id.index() + 1)
            .max()
            .unwrap_or(0);
        needed.max(self.config.column_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
        [config]
        min_column_capacity = 8
        check_policy = "report"

        [[column]]
        id = 0
        name = "position"
        kind = "filled"
        element = "vec3"

        [[column]]
        id = 4
        kind = "sparse"

        [[column]]
        id = 2
        kind = "sparse_with_data"
        element = "entity"
        zeroed = true
    "#;

    #[test]
    fn test_parse_schema() {
        let schema = SheetSchema::from_toml_str(SCHEMA).unwrap();
        assert_eq!(schema.config.min_column_capacity, 8);
        assert_eq!(schema.columns.len(), 3);
        assert_eq!(schema.columns[0].name.as_deref(), Some("position"));
        assert_eq!(schema.column_capacity(), 5);
        let target = schema.columns[2].type_info().unwrap();
        assert!(target.zeroed());
        assert!(target.is_entity_ref());
    }

    #[test]
    fn test_config_defaults() {
        let schema = SheetSchema::from_toml_str("").unwrap();
        assert_eq!(schema.config, SheetConfig::default());
        assert!(schema.columns.is_empty());
    }

    #[test]
    fn test_rejects_missing_element() {
        let bad = "[[column]]\nid = 1\nkind = \"filled\"\n";
        assert!(matches!(
            SheetSchema::from_toml_str(bad),
            Err(SheetError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let schema = SheetSchema::default()
            .with_column(ColumnSchema::sparse(ColumnId::new(1)))
            .with_column(ColumnSchema::filled(ColumnId::new(1), ElementType::F32));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_fixed_capacity() {
        let schema = SheetSchema::new(SheetConfig {
            column_capacity: 2,
            ..SheetConfig::default()
        })
        .with_column(ColumnSchema::sparse(ColumnId::new(2)));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(SheetSchema::from_toml_str("[[column]\nid = ").is_err());
    }
}
