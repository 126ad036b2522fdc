// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::flow::collectors;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::auth::get_me,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::list_my_tenants,

        // --- Cadastros ---
        handlers::employees::create_employee,
        handlers::employees::list_employees,
        handlers::employees::enroll_biometric,
        handlers::employees::list_employee_records,
        handlers::items::create_item,
        handlers::items::list_items,

        // --- Termos ---
        handlers::terms::create_term_template,
        handlers::terms::list_term_templates,
        handlers::terms::sign_term,

        // --- Verificação ---
        handlers::verification::verify_badge,
        handlers::verification::verify_biometric,

        // --- Fluxo QR ---
        handlers::flows::persist_record,
        handlers::flows::run_flow,

        // --- Notificações ---
        handlers::notifications::notify,
        handlers::notifications::scan_vencimentos,

        // --- Documentos ---
        handlers::documents::qr_code_png,
        handlers::documents::signed_term_pdf,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Tenancy ---
            models::tenancy::Tenant,
            models::tenancy::CreateTenantPayload,

            // --- Colaboradores ---
            models::employee::Employee,
            models::employee::LinkedAccount,
            models::employee::VerifiedHolder,
            models::employee::BiometricModality,
            models::employee::BiometricMatch,
            models::employee::CreateEmployeePayload,
            models::employee::EmployeeBadge,
            models::employee::VerifyBadgePayload,
            models::employee::VerifyBiometricPayload,

            // --- Fluxo ---
            models::flow::EntityKind,
            models::flow::FlowType,
            models::flow::FlowStep,
            models::flow::FlowItem,
            models::flow::StoredFlowItem,
            models::flow::OperationRecord,
            models::flow::PersistedOperation,
            models::flow::CreateFlowItemPayload,
            collectors::CollectorInput,
            collectors::DeliveryCollector,
            collectors::ReturnCollector,
            collectors::ExchangeCollector,
            collectors::ApplicationCollector,
            handlers::flows::FlowAuth,
            handlers::flows::FlowRunPayload,
            handlers::flows::FlowRunResult,
            handlers::flows::RecordCreated,

            // --- Termos ---
            models::term::TermTemplate,
            models::term::TermSignature,
            models::term::SignedTerm,
            models::term::SignatureRequest,
            models::term::CreateTermTemplatePayload,

            // --- Notificações ---
            models::notification::NotificationChannel,
            models::notification::NotifyRequest,
            models::notification::NotifyOutcome,
            models::notification::VencimentoCategory,
            models::notification::VencimentoScanPayload,
            models::notification::VencimentoScanResult,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Dados do Operador"),
        (name = "Tenancy", description = "Gestão de Empresas e Acesso"),
        (name = "Employees", description = "Colaboradores e Crachás"),
        (name = "Items", description = "Equipamentos, EPIs, Ferramentas e Materiais"),
        (name = "Terms", description = "Termos Digitais e Assinaturas"),
        (name = "Verification", description = "Verificação de Crachá e Biometria"),
        (name = "Flows", description = "Fluxo QR: Entrega, Devolução, Troca e Aplicação"),
        (name = "Notifications", description = "Notificações e Vencimentos"),
        (name = "Documents", description = "QR Codes e PDFs")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_flow_routes() {
        let doc = ApiDoc::openapi();
        for path in ["/api/flows/run", "/api/verify/badge", "/api/terms/sign", "/api/notifications/vencimentos/scan"] {
            assert!(doc.paths.paths.contains_key(path), "faltando {}", path);
        }
    }
}
