//! Layout-by-layout conversion into synthesized tables

use std::sync::Arc;
use std::time::Instant;

use duckdb::params_from_iter;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::{ConvertConfig, ConvertError, ConvertReport, LayoutReport, RecordSource};
use crate::identity::{AnchorResolver, LinkFields};
use crate::inference::ScalarValue;
use crate::layout::{Layout, LayoutConfig};
use crate::normalize::{Batch, BatchGrouper, RecordNormalizer};
use crate::store::{StoreHandle, quote_identifier, table_exists};
use crate::synthesis::{ANCHOR_ID_COLUMN, LayoutProfile, SchemaSynthesizer, TableSpec};

/// Converts every configured layout from a record source into the store
pub struct BulkConverter {
    store: Arc<StoreHandle>,
    layouts: LayoutConfig,
    config: ConvertConfig,
}

impl BulkConverter {
    pub fn new(store: Arc<StoreHandle>, layouts: LayoutConfig, config: ConvertConfig) -> Self {
        Self {
            store,
            layouts,
            config,
        }
    }

    /// Run the conversion
    ///
    /// Layouts are processed in configuration order so foreign keys can
    /// reference tables created earlier in the run.
    pub fn run(&self, source: &dyn RecordSource) -> Result<ConvertReport, ConvertError> {
        let run_id = Uuid::new_v4().to_string();
        let _span = info_span!(
            "convert_run",
            run_id = %run_id,
            target = %self.store.target(),
            strict = self.config.strict
        )
        .entered();

        let start = Instant::now();
        let mut report = ConvertReport::new(&run_id);
        info!(layouts = self.layouts.len(), "Starting conversion");

        self.store.ensure_tables(false)?;
        let mut conn = self.store.connect()?;

        if self.config.drop_existing {
            report.dropped_tables = self.drop_layout_tables(&conn)?;
        }

        let mut synthesizer = SchemaSynthesizer::new();
        for layout in &self.layouts.layouts {
            let _layout_span = info_span!("convert_layout", layout = %layout.name).entered();
            info!(layout = %layout.name, "Adding entries from layout");
            let layout_report =
                self.convert_layout(&mut conn, &mut synthesizer, layout, source, &mut report)?;
            report.layouts.push(layout_report);
        }

        report.duration = start.elapsed();
        info!(
            inserted = report.total_inserted(),
            rejected = report.total_rejected(),
            duration_ms = report.duration.as_millis() as u64,
            "Conversion completed"
        );
        Ok(report)
    }

    /// Drop the layout tables that exist, dependents first
    fn drop_layout_tables(&self, conn: &duckdb::Connection) -> Result<Vec<String>, ConvertError> {
        let _guard = self.store.lock()?;
        let mut existing = Vec::new();
        for layout in self.layouts.layouts.iter().rev() {
            if table_exists(conn, &layout.table_name)? {
                existing.push(layout.table_name.clone());
            }
        }
        if !existing.is_empty() {
            warn!(tables = %existing.join(", "), "Dropping tables");
            for table in &existing {
                conn.execute_batch(&format!("DROP TABLE {};", quote_identifier(table)))?;
            }
        }
        Ok(existing)
    }

    fn convert_layout(
        &self,
        conn: &mut duckdb::Connection,
        synthesizer: &mut SchemaSynthesizer,
        layout: &Layout,
        source: &dyn RecordSource,
        report: &mut ConvertReport,
    ) -> Result<LayoutReport, ConvertError> {
        let records = source.fetch_layout(&layout.name)?;
        let profile = LayoutProfile::from_records(layout, &records);
        let table = synthesizer.synthesize(layout, &profile)?;

        let mut layout_report = LayoutReport {
            layout: layout.name.clone(),
            table: table.name.clone(),
            fetched: records.len(),
            ..Default::default()
        };

        {
            let _guard = self.store.lock()?;
            if table_exists(conn, &table.name)? {
                return Err(ConvertError::TableExists(table.name.clone()));
            }
            conn.execute_batch(&table.create_sql())?;
        }

        let normalizer = RecordNormalizer::new(layout, &table);
        let mut grouper = BatchGrouper::new();
        for (index, record) in records.iter().enumerate() {
            match normalizer.normalize(record) {
                Ok(None) => layout_report.empty += 1,
                Ok(Some(mut row)) => {
                    if let Some(link) = &layout.anchor_link {
                        let fields = LinkFields::from_record(record, link);
                        let guard = self.store.lock()?;
                        let resolution = AnchorResolver::resolve(conn, &guard, &fields)?;
                        drop(guard);
                        if let Some(anchor_id) = resolution.anchor_id() {
                            row.insert(ANCHOR_ID_COLUMN, ScalarValue::Integer(anchor_id));
                            layout_report.linked += 1;
                        }
                        if resolution.is_ambiguous() {
                            layout_report.ambiguous += 1;
                        }
                    }
                    grouper.push(row);
                }
                Err(e) if self.config.strict => {
                    return Err(ConvertError::Normalization {
                        layout: layout.name.clone(),
                        record: index,
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(layout = %layout.name, record = index, error = %e, "Skipping invalid record");
                    layout_report.rejected += 1;
                    report.add_error(format!("{} record {}: {}", layout.name, index, e));
                }
            }
        }

        for batch in grouper.into_batches() {
            self.insert_batch(conn, &table, &batch)?;
            layout_report.inserted += batch.len();
            layout_report.batches += 1;
        }

        info!(
            table = %table.name,
            fetched = layout_report.fetched,
            inserted = layout_report.inserted,
            empty = layout_report.empty,
            rejected = layout_report.rejected,
            batches = layout_report.batches,
            "Layout converted"
        );
        Ok(layout_report)
    }

    /// Insert one batch in a single transaction
    fn insert_batch(
        &self,
        conn: &mut duckdb::Connection,
        table: &TableSpec,
        batch: &Batch,
    ) -> Result<(), ConvertError> {
        let _guard = self.store.lock()?;
        let bulk_error = |e: duckdb::Error| ConvertError::BulkInsert {
            table: table.name.clone(),
            rows: batch.len(),
            reason: e.to_string(),
        };

        let tx = conn.transaction().map_err(bulk_error)?;
        {
            let mut stmt = tx
                .prepare(&table.insert_sql(&batch.columns))
                .map_err(bulk_error)?;
            for row in &batch.rows {
                stmt.execute(params_from_iter(row.values_for(&batch.columns)))
                    .map_err(bulk_error)?;
            }
        }
        tx.commit().map_err(bulk_error)?;

        debug!(
            table = %table.name,
            rows = batch.len(),
            columns = ?batch.columns,
            "Inserted batch"
        );
        Ok(())
    }
}
