use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Company, CompanyChanges, CompanyError, CompanyId, NewCompany, Result, store::CompanyStore,
};

const COLUMNS: &str =
    "id, name, description, amount_of_employees, registered, company_type, created_at, updated_at";

/// PostgreSQL-backed company store.
#[derive(Clone)]
pub struct PostgresCompanyStore {
    pool: PgPool,
}

impl PostgresCompanyStore {
    /// Creates a new PostgreSQL company store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_company(row: PgRow) -> Result<Company> {
        let amount: i64 = row.try_get("amount_of_employees").map_err(classify)?;
        let company_type: String = row.try_get("company_type").map_err(classify)?;

        Ok(Company {
            id: CompanyId::from_uuid(row.try_get::<Uuid, _>("id").map_err(classify)?),
            name: row.try_get("name").map_err(classify)?,
            description: row.try_get("description").map_err(classify)?,
            amount_of_employees: u32::try_from(amount).map_err(CompanyError::transaction)?,
            registered: row.try_get("registered").map_err(classify)?,
            company_type: company_type
                .parse()
                .map_err(|_| {
                    CompanyError::transaction(format!(
                        "stored company type {company_type:?} is unknown"
                    ))
                })?,
            created_at: row.try_get("created_at").map_err(classify)?,
            updated_at: row.try_get("updated_at").map_err(classify)?,
        })
    }
}

/// Maps a sqlx failure onto the error taxonomy.
///
/// Unique violations are reported by the callers, which know the name that
/// collided; here they fall through to `TransactionFailed`.
fn classify(err: sqlx::Error) -> CompanyError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            tracing::warn!(error = %err, "database unreachable");
            CompanyError::StoreUnavailable
        }
        other => CompanyError::transaction(other),
    }
}

fn classify_write(err: sqlx::Error, name: &str) -> CompanyError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return CompanyError::AlreadyExists(name.to_string());
    }
    classify(err)
}

#[async_trait]
impl CompanyStore for PostgresCompanyStore {
    #[tracing::instrument(skip(self, company), fields(name = %company.name))]
    async fn create(&self, company: NewCompany) -> Result<Company> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO companies ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(CompanyId::new().as_uuid())
        .bind(&company.name)
        .bind(&company.description)
        .bind(i64::from(company.amount_of_employees))
        .bind(company.registered)
        .bind(company.company_type.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify_write(e, &company.name))?;

        Self::row_to_company(row)
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update(&self, id: CompanyId, changes: CompanyChanges) -> Result<Company> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM companies WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?
        .ok_or(CompanyError::NotFound(id))?;

        if changes.conflicts_with(id) {
            return Err(CompanyError::IdentityMismatch(id));
        }

        let mut merged = Self::row_to_company(row)?;
        changes.apply_to(&mut merged, Utc::now());

        let row = sqlx::query(&format!(
            r#"
            UPDATE companies
            SET name = $2, description = $3, amount_of_employees = $4,
                registered = $5, company_type = $6, updated_at = $7
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&merged.name)
        .bind(&merged.description)
        .bind(i64::from(merged.amount_of_employees))
        .bind(merged.registered)
        .bind(merged.company_type.as_str())
        .bind(merged.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify_write(e, &merged.name))?;

        let updated = Self::row_to_company(row)?;
        tx.commit().await.map_err(classify)?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: CompanyId) -> Result<()> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(classify)?;

        if result.rows_affected() == 0 {
            return Err(CompanyError::NotFound(id));
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, id: CompanyId) -> Result<Company> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM companies WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?
            .ok_or(CompanyError::NotFound(id))?;

        Self::row_to_company(row)
    }
}
