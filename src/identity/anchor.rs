//! Metadata anchor lookup-or-create

use std::sync::MutexGuard;

use duckdb::params_from_iter;
use duckdb::types::Value;
use serde::Serialize;
use tracing::{debug, warn};

use super::LinkFields;
use crate::store::StoreError;

/// Outcome of resolving link fields to an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnchorResolution {
    /// No link fields were derived
    Unlinked,
    /// Exactly one anchor matched
    Existing(i64),
    /// No anchor matched and a new one was inserted
    Created(i64),
    /// Several anchors matched; the record stays unlinked
    Ambiguous { matches: usize },
}

impl AnchorResolution {
    /// Anchor id to store on the record, if any
    pub fn anchor_id(&self) -> Option<i64> {
        match self {
            AnchorResolution::Existing(id) | AnchorResolution::Created(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, AnchorResolution::Ambiguous { .. })
    }
}

/// Resolves link fields against `metadata_anchors`
pub struct AnchorResolver;

impl AnchorResolver {
    /// Find or create the anchor for the given fields
    ///
    /// The caller must hold the store write lock for the whole call; the
    /// guard parameter makes that explicit.
    pub fn resolve(
        conn: &duckdb::Connection,
        _lock: &MutexGuard<'_, ()>,
        fields: &LinkFields,
    ) -> Result<AnchorResolution, StoreError> {
        if fields.is_empty() {
            return Ok(AnchorResolution::Unlinked);
        }

        let mut ids = Self::find(conn, fields, false)?;
        if ids.is_empty() && fields.day_counter.is_some() && fields.camera_tag.is_some() {
            ids = Self::find(conn, fields, true)?;
        }

        match ids.as_slice() {
            [] => {
                let id = Self::create(conn, fields)?;
                debug!(anchor_id = id, ?fields, "Created metadata anchor");
                Ok(AnchorResolution::Created(id))
            }
            [id] => Ok(AnchorResolution::Existing(*id)),
            _ => {
                warn!(matches = ids.len(), ?fields, "Ambiguous metadata anchor link");
                Ok(AnchorResolution::Ambiguous { matches: ids.len() })
            }
        }
    }

    /// Query anchor ids matching the present fields
    ///
    /// With `either_tag`, day counter and camera tag are alternatives
    /// instead of both being required.
    fn find(
        conn: &duckdb::Connection,
        fields: &LinkFields,
        either_tag: bool,
    ) -> Result<Vec<i64>, StoreError> {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        if let Some(date) = fields.datestamp {
            clauses.push("datestamp = CAST(? AS DATE)".to_string());
            params.push(Value::Text(date.format("%Y-%m-%d").to_string()));
        }
        match (fields.day_counter, &fields.camera_tag) {
            (Some(counter), Some(tag)) if either_tag => {
                clauses.push("(day_counter = ? OR camera_tag = ?)".to_string());
                params.push(Value::BigInt(counter));
                params.push(Value::Text(tag.clone()));
            }
            (counter, tag) => {
                if let Some(counter) = counter {
                    clauses.push("day_counter = ?".to_string());
                    params.push(Value::BigInt(counter));
                }
                if let Some(tag) = tag {
                    clauses.push("camera_tag = ?".to_string());
                    params.push(Value::Text(tag.clone()));
                }
            }
        }

        let sql = format!(
            "SELECT id FROM metadata_anchors WHERE {} ORDER BY id",
            clauses.join(" AND ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn create(conn: &duckdb::Connection, fields: &LinkFields) -> Result<i64, StoreError> {
        let id: i64 = conn.query_row("SELECT nextval('metadata_anchors_id_seq')", [], |row| {
            row.get(0)
        })?;
        let date = fields.datestamp.map(|d| d.format("%Y-%m-%d").to_string());
        conn.execute(
            "INSERT INTO metadata_anchors (id, datestamp, day_counter, camera_tag) \
             VALUES (?, CAST(? AS DATE), ?, ?)",
            duckdb::params![id, date, fields.day_counter, fields.camera_tag],
        )?;
        Ok(id)
    }
}
