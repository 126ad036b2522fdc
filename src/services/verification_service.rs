// src/services/verification_service.rs

use std::sync::Arc;

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    db::{AuditRepository, EmployeeRepository},
    flow::QrCodec,
    models::{
        audit::NewAuditEntry,
        employee::{BiometricModality, Employee, VerifiedHolder},
        flow::EntityKind,
        session::Session,
    },
};

/// Transforma uma captura biométrica na referência guardada no cadastro.
///
/// Um provedor externo (com limiar de similaridade) entra aqui; o padrão só
/// reconhece capturas idênticas à de referência.
pub trait BiometricMatcher: Send + Sync {
    fn reference_for(&self, modality: BiometricModality, payload: &str) -> Option<String>;
}

/// SHA-256 da captura, prefixado pela modalidade.
#[derive(Debug, Clone, Default)]
pub struct DigestMatcher;

impl BiometricMatcher for DigestMatcher {
    fn reference_for(&self, modality: BiometricModality, payload: &str) -> Option<String> {
        let payload = payload.trim();
        if payload.is_empty() {
            return None;
        }
        let prefix = match modality {
            BiometricModality::Facial => "facial",
            BiometricModality::Fingerprint => "fingerprint",
        };
        Some(format!("{}:{:x}", prefix, Sha256::digest(payload.as_bytes())))
    }
}

/// O que procurar no cadastro a partir do texto escaneado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeLookup {
    pub badge_code: String,
    pub employee_id: Option<Uuid>,
}

/// Interpreta o texto lido: payload QR de colaborador ou matrícula digitada.
///
/// QR de outro tipo de entidade não identifica ninguém (`None`).
pub fn badge_lookup(codec: &QrCodec, scanned: &str) -> Option<BadgeLookup> {
    let scanned = scanned.trim();
    if scanned.is_empty() {
        return None;
    }
    let badge_code = match codec.decode(scanned) {
        Some(decoded) if decoded.kind == EntityKind::Employee => decoded.entity_id,
        Some(_) => return None,
        None => scanned.to_string(),
    };
    let employee_id = Uuid::parse_str(&badge_code).ok();
    Some(BadgeLookup { badge_code, employee_id })
}

/// Empresa em que o crachá precisa estar: a informada ou, na falta, a da sessão.
/// Pedir outra empresa que não a da sessão já é `TenantMismatch`.
pub fn badge_scope(session_tenant_id: Uuid, requested: Option<Uuid>) -> Result<Uuid, AppError> {
    match requested {
        Some(tenant_id) if tenant_id != session_tenant_id => Err(AppError::TenantMismatch),
        _ => Ok(session_tenant_id),
    }
}

/// Decide o resultado da verificação, nesta ordem:
/// inexistente -> `BadgeNotFound`; empresa diferente -> `TenantMismatch`;
/// inativo -> `HolderInactive`.
pub fn resolve_badge_holder(holder: Option<Employee>, tenant_id: Option<Uuid>) -> Result<Employee, AppError> {
    let employee = holder.ok_or(AppError::BadgeNotFound)?;
    if let Some(tenant_id) = tenant_id {
        if employee.tenant_id != tenant_id {
            return Err(AppError::TenantMismatch);
        }
    }
    if !employee.is_active {
        return Err(AppError::HolderInactive);
    }
    Ok(employee)
}

#[derive(Clone)]
pub struct VerificationService {
    employee_repo: EmployeeRepository,
    audit_repo: AuditRepository,
    codec: QrCodec,
    matcher: Arc<dyn BiometricMatcher>,
    pool: PgPool,
}

impl VerificationService {
    pub fn new(
        employee_repo: EmployeeRepository,
        audit_repo: AuditRepository,
        codec: QrCodec,
        matcher: Arc<dyn BiometricMatcher>,
        pool: PgPool,
    ) -> Self {
        Self { employee_repo, audit_repo, codec, matcher, pool }
    }

    /// Resolve o crachá escaneado para o colaborador.
    ///
    /// A busca NÃO filtra por empresa: um crachá de outra empresa precisa
    /// responder `TenantMismatch`, e não `BadgeNotFound`. Sem `tenant_id`, vale a
    /// empresa da sessão.
    pub async fn verify_badge(
        &self,
        session: &Session,
        code: &str,
        tenant_id: Option<Uuid>,
    ) -> Result<VerifiedHolder, AppError> {
        let Some(lookup) = badge_lookup(&self.codec, code) else {
            return Err(AppError::BadgeNotFound);
        };
        let tenant_id = Some(badge_scope(session.tenant_id, tenant_id)?);

        let mut tx = begin_scoped(&self.pool, session).await?;

        let holder = self.employee_repo
            .find_badge_holder(&mut *tx, &lookup.badge_code, lookup.employee_id, tenant_id)
            .await?;
        let employee = resolve_badge_holder(holder, tenant_id).inspect_err(|e| {
            tracing::info!(badge = %lookup.badge_code, "Crachá recusado: {}", e);
        })?;

        let linked_account = match employee.linked_user_id {
            Some(user_id) => self.employee_repo.find_linked_account(&mut *tx, user_id).await?,
            None => None,
        };

        self.audit_repo
            .record(
                &mut *tx,
                &NewAuditEntry {
                    tenant_id: employee.tenant_id,
                    actor_user_id: session.user_id,
                    action: "BADGE_VERIFIED",
                    entity_type: "employee",
                    entity_id: employee.id,
                    user_agent: session.user_agent.as_deref(),
                    ip_address: session.ip_address.as_deref(),
                    details: serde_json::json!({ "badgeCode": employee.badge_code }),
                },
            )
            .await?;

        tx.commit().await?;
        tracing::info!(employee_id = %employee.id, "Crachá verificado");

        Ok(VerifiedHolder { employee, linked_account })
    }

    /// Identifica o colaborador pela biometria dentro da empresa da sessão.
    pub async fn verify_biometric(
        &self,
        session: &Session,
        modality: BiometricModality,
        payload: &str,
    ) -> Result<VerifiedHolder, AppError> {
        let reference = self.matcher
            .reference_for(modality, payload)
            .ok_or(AppError::BiometricNotRecognized)?;

        let mut tx = begin_scoped(&self.pool, session).await?;

        let employee = self.employee_repo
            .find_by_biometric_reference(&mut *tx, session.tenant_id, modality, &reference)
            .await?
            .filter(|e| e.is_active)
            .ok_or(AppError::BiometricNotRecognized)?;

        // Sobrescrita idempotente da referência da modalidade
        self.employee_repo
            .upsert_biometric_reference(&mut *tx, employee.id, modality, &reference)
            .await?;

        let linked_account = match employee.linked_user_id {
            Some(user_id) => self.employee_repo.find_linked_account(&mut *tx, user_id).await?,
            None => None,
        };

        self.audit_repo
            .record(
                &mut *tx,
                &NewAuditEntry {
                    tenant_id: session.tenant_id,
                    actor_user_id: session.user_id,
                    action: "BIOMETRIC_VERIFIED",
                    entity_type: "employee",
                    entity_id: employee.id,
                    user_agent: session.user_agent.as_deref(),
                    ip_address: session.ip_address.as_deref(),
                    details: serde_json::json!({ "modality": modality }),
                },
            )
            .await?;

        tx.commit().await?;
        tracing::info!(employee_id = %employee.id, ?modality, "Biometria verificada");

        Ok(VerifiedHolder { employee, linked_account })
    }

    /// Cadastra (ou substitui) a referência biométrica de um colaborador.
    pub async fn enroll_biometric(
        &self,
        session: &Session,
        employee_id: Uuid,
        modality: BiometricModality,
        payload: &str,
    ) -> Result<(), AppError> {
        let reference = self.matcher
            .reference_for(modality, payload)
            .ok_or(AppError::BiometricNotRecognized)?;

        let mut tx = begin_scoped(&self.pool, session).await?;

        let employee = self.employee_repo
            .find_by_id(&mut *tx, session.tenant_id, employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;

        self.employee_repo
            .upsert_biometric_reference(&mut *tx, employee.id, modality, &reference)
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &NewAuditEntry {
                    tenant_id: session.tenant_id,
                    actor_user_id: session.user_id,
                    action: "BIOMETRIC_ENROLLED",
                    entity_type: "employee",
                    entity_id: employee.id,
                    user_agent: session.user_agent.as_deref(),
                    ip_address: session.ip_address.as_deref(),
                    details: serde_json::json!({ "modality": modality }),
                },
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
