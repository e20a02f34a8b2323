//! Idempotent deployment of the catalog schema and its CSV contents.
//!
//! Tables deploy cluster by cluster, dimensions before the facts that
//! reference them: transformers, cables, current breakers, then the flat
//! contacts table. An existing table is left untouched unless a clear
//! install was requested.

use std::path::{Path, PathBuf};

use tracing::info;

use tkz_core::error::TkzResult;

use crate::base_ops::TableOps;
use crate::schema::{self, TableDef};
use crate::session::{Dialect, Engine};

/// The CSV catalog shipped with this crate.
pub fn default_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Equipment categories in deployment order; the empty category reads its
/// files from the data directory root.
const CLUSTERS: &[(&str, &[&TableDef])] = &[
    (
        "transformer_catalog",
        &[
            &schema::POWER_NOMINAL,
            &schema::VOLTAGE_NOMINAL,
            &schema::SCHEME,
            &schema::TRANSFORMER,
        ],
    ),
    (
        "cable_catalog",
        &[
            &schema::MARK,
            &schema::AMOUNT,
            &schema::RANGE_VAL,
            &schema::CABLE,
        ],
    ),
    (
        "current_breaker_catalog",
        &[
            &schema::DEVICE,
            &schema::CURRENT_NOMINAL,
            &schema::CURRENT_BREAKER,
        ],
    ),
    ("", &[&schema::OTHER_CONTACT]),
];

/// Deploy the catalog. With `clear` every table is dropped, recreated and
/// refilled from its CSV file; otherwise only missing tables are deployed.
pub fn db_install(engine: &Engine, data_dir: &Path, clear: bool) -> TkzResult<()> {
    if engine.dialect() == Dialect::Sqlite {
        bootstrap_sequence_registry(engine)?;
    }
    for &(category, tables) in CLUSTERS {
        let dir = if category.is_empty() {
            data_dir.to_path_buf()
        } else {
            data_dir.join(category)
        };
        for &table in tables {
            deploy_if_absent(engine, table, &dir.join(table.csv_file_name()), clear)?;
        }
    }
    info!("catalog deployment finished");
    Ok(())
}

fn deploy_if_absent(
    engine: &Engine,
    table: &'static TableDef,
    csv_path: &Path,
    full: bool,
) -> TkzResult<()> {
    let exists = engine.session_scope(true, |session| session.table_exists(table.table_name()))?;
    if full || !exists {
        let ops = TableOps::new(table, engine);
        ops.create_table(full, full)?;
        ops.insert_table(None, Some(csv_path))?;
    }
    Ok(())
}

/// The `sqlite_sequence` registry only comes into existence once some
/// AUTOINCREMENT table has been created; a throwaway table forces that
/// before any sequence repair might need it.
fn bootstrap_sequence_registry(engine: &Engine) -> TkzResult<()> {
    engine.session_scope(true, |session| {
        session.execute(
            "CREATE TABLE IF NOT EXISTS sequence_probe (id INTEGER PRIMARY KEY AUTOINCREMENT)",
            &[],
        )?;
        session.execute("DROP TABLE sequence_probe", &[])?;
        Ok(())
    })
}
