// src/services/term_service.rs

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    db::{term_repo::NewSignature, AuditRepository, EmployeeRepository, TermRepository},
    flow::term,
    models::{
        audit::NewAuditEntry,
        session::Session,
        term::{SignatureRequest, SignedTerm, TermSignature, TermTemplate},
    },
};

#[derive(Clone)]
pub struct TermService {
    term_repo: TermRepository,
    employee_repo: EmployeeRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl TermService {
    pub fn new(
        term_repo: TermRepository,
        employee_repo: EmployeeRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { term_repo, employee_repo, audit_repo, pool }
    }

    pub async fn create_template(&self, session: &Session, title: &str, body: &str) -> Result<TermTemplate, AppError> {
        let mut tx = begin_scoped(&self.pool, session).await?;
        let template = self.term_repo.create_template(&mut *tx, session.tenant_id, title, body).await?;
        tx.commit().await?;
        tracing::info!(term_id = %template.id, version = template.version, "Modelo de termo criado");
        Ok(template)
    }

    pub async fn list_templates(&self, session: &Session) -> Result<Vec<TermTemplate>, AppError> {
        self.term_repo.list_templates(session.tenant_id).await
    }

    pub async fn find_template(&self, session: &Session, term_id: Uuid) -> Result<TermTemplate, AppError> {
        self.term_repo
            .find_active_template(&self.pool, session.tenant_id, term_id)
            .await?
            .ok_or(AppError::TermNotFound)
    }

    /// Gera o termo assinado: renderiza com os dados do servidor, calcula o hash
    /// e grava assinatura + auditoria na mesma transação.
    pub async fn request_signature(&self, session: &Session, request: &SignatureRequest) -> Result<SignedTerm, AppError> {
        let mut tx = begin_scoped(&self.pool, session).await?;

        // Nada é escrito antes de as duas buscas darem certo
        let employee = self.employee_repo
            .find_by_id(&mut *tx, session.tenant_id, request.employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;
        let template = self.term_repo
            .find_active_template(&mut *tx, session.tenant_id, request.term_id)
            .await?
            .ok_or(AppError::TermNotFound)?;

        let signed_at = Utc::now();
        let unsigned_body = term::render_preview(&template.body, &employee, &request.items, signed_at.date_naive());
        let hash = term::validation_hash(
            session.tenant_id,
            employee.id,
            template.id,
            template.version,
            &unsigned_body,
            &signed_at,
        );
        let rendered_body = term::render(
            &template.body,
            &employee,
            &request.items,
            signed_at.date_naive(),
            &term::signature_line(&employee, &signed_at, &hash),
        );

        let signature = self.term_repo
            .insert_signature(
                &mut *tx,
                &NewSignature {
                    tenant_id: session.tenant_id,
                    employee_id: employee.id,
                    template: &template,
                    reference_type: &request.reference_type,
                    reference_id: request.reference_id,
                    rendered_body: &rendered_body,
                    validation_hash: &hash,
                    user_agent: session.user_agent.as_deref(),
                    ip_address: session.ip_address.as_deref(),
                    extra: request.extra.as_ref(),
                    signed_at,
                },
            )
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &NewAuditEntry {
                    tenant_id: session.tenant_id,
                    actor_user_id: session.user_id,
                    action: "TERM_SIGNED",
                    entity_type: "term_signature",
                    entity_id: signature.id,
                    user_agent: session.user_agent.as_deref(),
                    ip_address: session.ip_address.as_deref(),
                    details: serde_json::json!({
                        "termId": template.id,
                        "termVersion": template.version,
                        "referenceType": request.reference_type,
                        "referenceId": request.reference_id,
                    }),
                },
            )
            .await?;

        tx.commit().await?;
        tracing::info!(signature_id = %signature.id, employee_id = %employee.id, "Termo digital assinado");

        Ok(signature.into())
    }

    pub async fn find_signature(&self, session: &Session, signature_id: Uuid) -> Result<TermSignature, AppError> {
        self.term_repo
            .find_signature(&self.pool, session.tenant_id, signature_id)
            .await?
            .ok_or(AppError::SignatureNotFound)
    }
}
