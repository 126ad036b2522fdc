// src/services/registry_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    db::{EmployeeRepository, ItemRepository, OperationsRepository},
    flow::QrCodec,
    models::{
        employee::{CreateEmployeePayload, Employee, EmployeeBadge},
        flow::{CreateFlowItemPayload, EntityKind, PersistedOperation, StoredFlowItem},
        session::Session,
    },
};

/// Cadastros que o fluxo consulta: colaboradores e itens.
#[derive(Clone)]
pub struct RegistryService {
    employee_repo: EmployeeRepository,
    item_repo: ItemRepository,
    operations_repo: OperationsRepository,
    codec: QrCodec,
    pool: PgPool,
}

impl RegistryService {
    pub fn new(
        employee_repo: EmployeeRepository,
        item_repo: ItemRepository,
        operations_repo: OperationsRepository,
        codec: QrCodec,
        pool: PgPool,
    ) -> Self {
        Self { employee_repo, item_repo, operations_repo, codec, pool }
    }

    /// Cria o colaborador e devolve o payload a imprimir no crachá.
    pub async fn create_employee(
        &self,
        session: &Session,
        payload: &CreateEmployeePayload,
    ) -> Result<EmployeeBadge, AppError> {
        let mut tx = begin_scoped(&self.pool, session).await?;
        let employee = self.employee_repo
            .create_employee(&mut *tx, session.tenant_id, payload)
            .await?;
        tx.commit().await?;

        let qr_payload = self.codec.encode(EntityKind::Employee, &employee.badge_code, None);
        tracing::info!(employee_id = %employee.id, "Colaborador cadastrado");

        Ok(EmployeeBadge { employee, qr_payload })
    }

    pub async fn list_employees(&self, session: &Session) -> Result<Vec<Employee>, AppError> {
        self.employee_repo.list_employees(session.tenant_id).await
    }

    pub async fn employee_records(&self, session: &Session, employee_id: Uuid) -> Result<Vec<PersistedOperation>, AppError> {
        self.employee_repo
            .find_by_id(&self.pool, session.tenant_id, employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;
        self.operations_repo.list_for_employee(session.tenant_id, employee_id).await
    }

    pub async fn create_item(
        &self,
        session: &Session,
        payload: &CreateFlowItemPayload,
    ) -> Result<StoredFlowItem, AppError> {
        let mut tx = begin_scoped(&self.pool, session).await?;
        let item = self.item_repo.create_item(&mut *tx, session.tenant_id, payload).await?;
        tx.commit().await?;
        tracing::info!(item_id = %item.id, kind = ?item.kind, "Item cadastrado");
        Ok(item)
    }

    pub async fn list_items(&self, session: &Session) -> Result<Vec<StoredFlowItem>, AppError> {
        self.item_repo.list_items(session.tenant_id).await
    }

    /// Payload do QR para qualquer entidade (crachá ou etiqueta de ativo).
    pub fn qr_payload(&self, kind: EntityKind, entity_id: &str) -> String {
        self.codec.encode(kind, entity_id, None)
    }
}
