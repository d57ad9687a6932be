//! Column directive tokens

use serde::Serialize;

use super::SchemaError;

/// Target of a foreign-key directive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyTarget {
    pub table: String,
    pub column: String,
}

impl ForeignKeyTarget {
    /// Render as `table(column)`
    pub fn reference(&self) -> String {
        format!("{}({})", self.table, self.column)
    }
}

/// Parsed directives for one source column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnDirectives {
    pub ignore: bool,
    pub not_null: bool,
    pub unique: bool,
    pub foreign_key: Option<ForeignKeyTarget>,
    pub force_datetime: bool,
    /// Replace `"a-b"` with the midpoint of the range
    pub range_midpoint: bool,
}

impl ColumnDirectives {
    /// Parse the directive tokens declared for a column
    pub fn parse<S: AsRef<str>>(
        layout: &str,
        column: &str,
        tokens: &[S],
    ) -> Result<Self, SchemaError> {
        let mut directives = ColumnDirectives::default();
        for token in tokens {
            let token = token.as_ref().trim();
            match token {
                "ignore" => directives.ignore = true,
                "not_null" => directives.not_null = true,
                "unique" => directives.unique = true,
                "astype-datetime" => directives.force_datetime = true,
                "range-midpoint" => directives.range_midpoint = true,
                _ => {
                    if let Some(target) = token.strip_prefix("fk-") {
                        directives.foreign_key = Some(parse_foreign_key(target).ok_or_else(
                            || SchemaError::MalformedForeignKey {
                                layout: layout.to_string(),
                                column: column.to_string(),
                                token: token.to_string(),
                            },
                        )?);
                    } else {
                        return Err(SchemaError::InvalidDirective {
                            layout: layout.to_string(),
                            column: column.to_string(),
                            token: token.to_string(),
                        });
                    }
                }
            }
        }
        Ok(directives)
    }
}

fn parse_foreign_key(target: &str) -> Option<ForeignKeyTarget> {
    let (table, column) = target.split_once('.')?;
    if table.is_empty() || column.is_empty() || column.contains('.') {
        return None;
    }
    Some(ForeignKeyTarget {
        table: table.to_string(),
        column: column.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_tokens() {
        let d = ColumnDirectives::parse(
            "Sample",
            "Glass ID",
            &["not_null", "unique", "fk-GlassID.glass_id", "range-midpoint"],
        )
        .unwrap();
        assert!(d.not_null && d.unique && d.range_midpoint);
        assert!(!d.ignore && !d.force_datetime);
        let fk = d.foreign_key.unwrap();
        assert_eq!(fk.table, "GlassID");
        assert_eq!(fk.column, "glass_id");
        assert_eq!(fk.reference(), "GlassID(glass_id)");
    }

    #[test]
    fn test_unknown_token_is_rejected() {
        let err = ColumnDirectives::parse("Sample", "x", &["nullable"]).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDirective { token, .. } if token == "nullable"));
    }

    #[test]
    fn test_malformed_foreign_key() {
        for token in ["fk-GlassID", "fk-.id", "fk-GlassID.", "fk-a.b.c"] {
            let err = ColumnDirectives::parse("Sample", "x", &[token]).unwrap_err();
            assert!(matches!(err, SchemaError::MalformedForeignKey { .. }), "{token}");
        }
    }

    #[test]
    fn test_no_tokens_is_default() {
        let tokens: [&str; 0] = [];
        assert_eq!(
            ColumnDirectives::parse("Sample", "x", &tokens).unwrap(),
            ColumnDirectives::default()
        );
    }
}
