// src/db/employee_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::employee::{BiometricModality, CreateEmployeePayload, Employee, LinkedAccount};

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_employee<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &CreateEmployeePayload,
    ) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees (tenant_id, name, badge_code, department, role, photo_url, linked_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(&payload.name)
            .bind(&payload.badge_code)
            .bind(&payload.department)
            .bind(&payload.role)
            .bind(&payload.photo_url)
            .bind(payload.linked_user_id)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::DuplicateCode(payload.badge_code.clone());
                    }
                }
                AppError::DatabaseError(e)
            })
    }

    pub async fn list_employees(&self, tenant_id: Uuid) -> Result<Vec<Employee>, AppError> {
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE tenant_id = $1 ORDER BY name",
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(employees)
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE tenant_id = $1 AND id = $2",
        )
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    /// Busca o portador do crachá SEM filtrar por empresa.
    ///
    /// A decisão de escopo (TenantMismatch) fica com o serviço; se o mesmo código
    /// existir em mais de uma empresa, a da sessão tem preferência.
    pub async fn find_badge_holder<'e, E>(
        &self,
        executor: E,
        badge_code: &str,
        employee_id: Option<Uuid>,
        preferred_tenant: Option<Uuid>,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT * FROM employees
            WHERE badge_code = $1 OR id = $2
            ORDER BY (tenant_id = $3) DESC NULLS LAST, created_at
            LIMIT 1
            "#,
        )
            .bind(badge_code)
            .bind(employee_id)
            .bind(preferred_tenant)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    pub async fn find_linked_account<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
    ) -> Result<Option<LinkedAccount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account = sqlx::query_as::<_, LinkedAccount>(
            "SELECT id, email, full_name FROM users WHERE id = $1",
        )
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
        Ok(account)
    }

    pub async fn find_by_biometric_reference<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        modality: BiometricModality,
        reference: &str,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT e.* FROM employees e
            JOIN employee_biometrics b ON b.employee_id = e.id
            WHERE e.tenant_id = $1 AND b.modality = $2 AND b.reference = $3
            LIMIT 1
            "#,
        )
            .bind(tenant_id)
            .bind(modality)
            .bind(reference)
            .fetch_optional(executor)
            .await?;
        Ok(employee)
    }

    /// Grava (ou sobrescreve) a referência biométrica do colaborador.
    pub async fn upsert_biometric_reference<'e, E>(
        &self,
        executor: E,
        employee_id: Uuid,
        modality: BiometricModality,
        reference: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO employee_biometrics (employee_id, modality, reference)
            VALUES ($1, $2, $3)
            ON CONFLICT (employee_id, modality)
            DO UPDATE SET reference = EXCLUDED.reference, updated_at = NOW()
            "#,
        )
            .bind(employee_id)
            .bind(modality)
            .bind(reference)
            .execute(executor)
            .await?;
        Ok(())
    }
}
