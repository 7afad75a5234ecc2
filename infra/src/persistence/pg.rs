use anyhow::{format_err, Context, Result};
use log::*;
use r2d2::Pool;
use r2d2_postgres::{PostgresConnectionManager, TlsMode};
use serde_json::Value;

use super::{ConcurrencyError, Storage};
use crate::documents::Version;

const SETUP_SQL: &str = include_str!("persistence.sql");
const LOAD_SQL: &str = "SELECT body FROM documents WHERE id = $1";
const INSERT_SQL: &str = "INSERT INTO documents (id, body) \
                          SELECT $1, jsonb_set($2::jsonb, '{_version}', to_jsonb(to_hex(txid_current()))) \
                          WHERE NOT EXISTS ( \
                              SELECT 1 FROM documents d WHERE d.id = $1 \
                          )";
const UPDATE_SQL: &str = "UPDATE documents \
                          SET body = jsonb_set($2::jsonb, '{_version}', to_jsonb(to_hex(txid_current()))) \
                          WHERE id = $1 \
                          AND body -> '_version' = to_jsonb($3::text)";
const VERSION_SQL: &str = "SELECT to_hex(txid_current())";

/// Records as rows of a `documents` table, versioned by the id of the
/// transaction that last wrote them.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: Pool<PostgresConnectionManager>,
}

impl PgStore {
    pub fn connect(url: &str, pool_size: u32) -> Result<Self> {
        let manager = PostgresConnectionManager::new(url, TlsMode::None)
            .context("postgres connection parameters")?;
        let builder = Pool::builder().max_size(pool_size);
        debug!("Pool builder: {:?}", builder);
        let pool = builder.build(manager).context("build pool")?;
        Ok(PgStore { pool })
    }

    pub fn with_pool(pool: Pool<PostgresConnectionManager>) -> Self {
        PgStore { pool }
    }
}

impl Storage for PgStore {
    fn setup(&self) -> Result<()> {
        debug!("Init schema");
        self.pool.get()?.batch_execute(SETUP_SQL)?;
        Ok(())
    }

    fn fetch(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.pool.get()?;
        let load = conn.prepare_cached(LOAD_SQL)?;
        let res = load.query(&[&key])?;

        if let Some(row) = res.iter().next() {
            let body: Value = row
                .get_opt(0)
                .ok_or_else(|| format_err!("Missing body column for {}?", key))??;
            Ok(Some(body))
        } else {
            Ok(None)
        }
    }

    fn store(&self, key: &str, body: &Value, expected: &Version) -> Result<Version> {
        let conn = self.pool.get()?;
        let t = conn.transaction()?;
        let nrows = if expected.is_unsaved() {
            t.prepare_cached(INSERT_SQL)?.execute(&[&key, body])?
        } else {
            t.prepare_cached(UPDATE_SQL)?
                .execute(&[&key, body, &expected.as_str()])?
        };
        debug!("Write to {} modified {} rows", key, nrows);
        if nrows != 1 {
            warn!("Write to {} impacted {} rows not 1", key, nrows);
            return Err(ConcurrencyError.into());
        }

        let res = t.prepare_cached(VERSION_SQL)?.query(&[])?;
        let version: String = res
            .iter()
            .next()
            .ok_or_else(|| format_err!("Missing version row?"))?
            .get_opt(0)
            .ok_or_else(|| format_err!("Missing version column?"))??;
        t.commit()?;
        Ok(Version::from_raw(version))
    }
}
