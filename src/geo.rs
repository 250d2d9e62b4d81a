use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::PostgresConfig;
use crate::models::{Poi, PoiRow};

/// Nearest-POI lookup against the PostGIS `shops` table (C2). Grounded on
/// `_find_nearest_shop` in `operators.py`: the same `ST_Distance` geography
/// cast, ordered ascending with `LIMIT 1`.
#[derive(Clone)]
pub struct SpatialIndex {
    pool: PgPool,
}

impl SpatialIndex {
    /// Pool sized 2–10 connections, 10s acquire timeout (spec.md §5's
    /// "connection pool of 2–10 connections; command timeout 10 s").
    pub async fn connect(cfg: &PostgresConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(2)
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(cfg.connect_options())
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the closest shop to `(lat, lon)`, or `None` if `shops` is empty.
    pub async fn nearest(&self, lat: f64, lon: f64) -> anyhow::Result<Option<Poi>> {
        const QUERY: &str = r#"
            SELECT
              shop_id,
              shop_name,
              category,
              ST_Distance(
                geom::geography,
                ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography
              ) AS distance
            FROM shops
            ORDER BY distance
            LIMIT 1
        "#;

        let row = sqlx::query_as::<_, PoiRow>(QUERY)
            .bind(lon)
            .bind(lat)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Poi::from))
    }
}
