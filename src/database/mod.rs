use std::path::Path;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{debug, info};

use crate::models::{CanonicalYearRecord, Company};

const RECORD_COLUMNS: &str = "year, share_price, sales, shares_issued, current_assets, \
     current_liabilities, financial_debts, equity, intangible_assets, net_income, dividends, eps";

/// SQLite store for companies and their canonical yearly records.
#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (or create) the database file and make sure the schema exists.
    pub async fn new(database_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true)
                    .foreign_keys(true),
            )
            .await
            .with_context(|| format!("opening database {}", database_path))?;

        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

        let db = Self { pool };
        db.run_migrations().await?;
        info!("Database initialized at {}", database_path);

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS companies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                industry TEXT,
                country TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS financials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company_id INTEGER NOT NULL,
                last_update DATETIME DEFAULT CURRENT_TIMESTAMP,
                year INTEGER NOT NULL,
                share_price REAL,
                sales REAL,
                shares_issued INTEGER,
                current_assets REAL,
                current_liabilities REAL,
                financial_debts REAL,
                equity REAL,
                intangible_assets REAL,
                net_income REAL,
                dividends REAL,
                eps REAL,
                FOREIGN KEY (company_id) REFERENCES companies(id),
                UNIQUE(company_id, year)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS update_last_update
            AFTER UPDATE ON financials
            FOR EACH ROW
            BEGIN
                UPDATE financials
                SET last_update = CURRENT_TIMESTAMP
                WHERE id = OLD.id;
            END
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_financials_company_year ON financials(company_id, year)",
        )
        .execute(&self.pool)
        .await?;

        debug!("Database migrations completed");
        Ok(())
    }

    /// Register a company and return its id. Re-registering keeps known profile
    /// values unless new ones are supplied.
    pub async fn add_company(
        &self,
        name: &str,
        industry: Option<&str>,
        country: Option<&str>,
    ) -> Result<i64> {
        sqlx::query(
            "INSERT INTO companies (name, industry, country) VALUES (?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
                 industry = COALESCE(excluded.industry, industry),
                 country = COALESCE(excluded.country, country)",
        )
        .bind(name)
        .bind(industry)
        .bind(country)
        .execute(&self.pool)
        .await?;

        self.get_company_id(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Company '{}' vanished after insert", name))
    }

    pub async fn get_company_id(&self, name: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM companies WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            r#"
            SELECT c.id, c.name, c.industry, c.country,
                   COUNT(f.id) AS years,
                   MAX(f.last_update) AS last_update
            FROM companies c
            LEFT JOIN financials f ON f.company_id = c.id
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(companies)
    }

    pub async fn count_companies(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert or update one row per (company, year). Creates the company if needed.
    pub async fn upsert_financials(
        &self,
        company: &str,
        records: &[CanonicalYearRecord],
    ) -> Result<usize> {
        let company_id = self.add_company(company, None, None).await?;
        let mut tx = self.pool.begin().await?;

        for record in records {
            sqlx::query(&format!(
                r#"
                INSERT INTO financials (company_id, {RECORD_COLUMNS})
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(company_id, year) DO UPDATE SET
                    share_price = excluded.share_price,
                    sales = excluded.sales,
                    shares_issued = excluded.shares_issued,
                    current_assets = excluded.current_assets,
                    current_liabilities = excluded.current_liabilities,
                    financial_debts = excluded.financial_debts,
                    equity = excluded.equity,
                    intangible_assets = excluded.intangible_assets,
                    net_income = excluded.net_income,
                    dividends = excluded.dividends,
                    eps = excluded.eps
                "#
            ))
            .bind(company_id)
            .bind(record.year)
            .bind(record.share_price)
            .bind(record.sales)
            .bind(record.shares_issued)
            .bind(record.current_assets)
            .bind(record.current_liabilities)
            .bind(record.financial_debts)
            .bind(record.equity)
            .bind(record.intangible_assets)
            .bind(record.net_income)
            .bind(record.dividends)
            .bind(record.eps)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Stored {} yearly records for {}", records.len(), company);
        Ok(records.len())
    }

    /// Records for a company ascending by year, optionally limited to one year.
    /// An unknown company has no records.
    pub async fn get_financials(
        &self,
        company: &str,
        year: Option<i32>,
    ) -> Result<Vec<CanonicalYearRecord>> {
        let Some(company_id) = self.get_company_id(company).await? else {
            return Ok(Vec::new());
        };

        let records = match year {
            Some(year) => {
                sqlx::query_as::<_, CanonicalYearRecord>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM financials WHERE company_id = ? AND year = ?"
                ))
                .bind(company_id)
                .bind(year)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CanonicalYearRecord>(&format!(
                    "SELECT {RECORD_COLUMNS} FROM financials WHERE company_id = ? ORDER BY year"
                ))
                .bind(company_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }

    /// Remove a company and its financials. Returns false if it was unknown.
    pub async fn delete_company(&self, name: &str) -> Result<bool> {
        let Some(company_id) = self.get_company_id(name).await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM financials WHERE company_id = ?")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM companies WHERE id = ?")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted company '{}' and associated financials", name);
        Ok(true)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
