//! PostgreSQL bar cache adapter.

use crate::domain::error::ScannerError;
use crate::domain::ohlcv::Bar;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::BarStore;
use chrono::{DateTime, Utc};
use postgres::types::ToSql;
use postgres::NoTls;
use r2d2::{Pool, PooledConnection};
use r2d2_postgres::PostgresConnectionManager;

type Manager = PostgresConnectionManager<NoTls>;

pub struct PostgresAdapter {
    pool: Pool<Manager>,
}

fn query_err(e: postgres::Error) -> ScannerError {
    ScannerError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScannerError> {
        let connection_string = config
            .get_string("postgres", "connection_string")
            .ok_or_else(|| ScannerError::ConfigMissing {
                section: "postgres".into(),
                key: "connection_string".into(),
            })?;

        let pg_config: postgres::Config =
            connection_string
                .parse()
                .map_err(|e: postgres::Error| ScannerError::ConfigInvalid {
                    section: "postgres".into(),
                    key: "connection_string".into(),
                    reason: e.to_string(),
                })?;
        let pool_size = config.get_int("postgres", "pool_size", 4).max(1) as u32;

        let pool = Pool::builder()
            .max_size(pool_size)
            .build(PostgresConnectionManager::new(pg_config, NoTls))
            .map_err(|e: r2d2::Error| ScannerError::Database {
                reason: e.to_string(),
            })?;

        let adapter = Self { pool };
        adapter
            .conn()?
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS public.quote (
                    symbol TEXT NOT NULL,
                    ts TIMESTAMPTZ NOT NULL,
                    open DOUBLE PRECISION NOT NULL,
                    high DOUBLE PRECISION NOT NULL,
                    low DOUBLE PRECISION NOT NULL,
                    close DOUBLE PRECISION NOT NULL,
                    volume BIGINT NOT NULL,
                    rth BOOLEAN,
                    PRIMARY KEY (symbol, ts)
                )",
            )
            .map_err(query_err)?;

        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<Manager>, ScannerError> {
        self.pool.get().map_err(|e: r2d2::Error| ScannerError::Database {
            reason: e.to_string(),
        })
    }
}

impl BarStore for PostgresAdapter {
    fn insert_bars(&self, symbol: &str, bars: &[Bar]) -> Result<usize, ScannerError> {
        let mut client = self.conn()?;
        let mut tx = client.transaction().map_err(query_err)?;
        let stmt = tx
            .prepare(
                "INSERT INTO public.quote (symbol, ts, open, high, low, close, volume, rth)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (symbol, ts) DO NOTHING",
            )
            .map_err(query_err)?;

        let mut written = 0u64;
        for bar in bars {
            let params: &[&(dyn ToSql + Sync)] = &[
                &symbol, &bar.ts, &bar.open, &bar.high, &bar.low, &bar.close, &bar.volume,
                &bar.rth,
            ];
            written += tx.execute(&stmt, params).map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(written as usize)
    }

    fn fetch_between(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, ScannerError> {
        let query = "SELECT ts, open, high, low, close, volume, rth \
                     FROM public.quote \
                     WHERE symbol = $1 AND ts >= $2 AND ts <= $3 \
                     ORDER BY ts ASC";

        let params: &[&(dyn ToSql + Sync)] = &[&symbol, &start, &end];
        let rows = self
            .conn()?
            .query(query, params)
            .map_err(query_err)?;

        Ok(rows
            .into_iter()
            .map(|row| Bar {
                ts: row.get(0),
                open: row.get(1),
                high: row.get(2),
                low: row.get(3),
                close: row.get(4),
                volume: row.get(5),
                rth: row.get(6),
            })
            .collect())
    }

    fn data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>, usize)>, ScannerError> {
        let query = "SELECT MIN(ts), MAX(ts), COUNT(*) FROM public.quote WHERE symbol = $1";

        let rows = self
            .conn()?
            .query(query, &[&symbol])
            .map_err(query_err)?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let min: Option<DateTime<Utc>> = row.get(0);
        let max: Option<DateTime<Utc>> = row.get(1);
        let count: i64 = row.get(2);

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => Ok(Some((min, max, count as usize))),
            _ => Ok(None),
        }
    }

    fn list_symbols(&self) -> Result<Vec<String>, ScannerError> {
        let rows = self
            .conn()?
            .query("SELECT DISTINCT symbol FROM public.quote ORDER BY symbol", &[])
            .map_err(query_err)?;

        Ok(rows.into_iter().map(|row| row.get(0)).collect())
    }
}
