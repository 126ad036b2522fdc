// src/middleware/session.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::{
        auth::AuthenticatedUser, client_info::ClientInfo, i18n::Locale, tenancy::TenantContext,
    },
    models::session::Session,
};

// Junta operador, empresa, idioma e dispositivo no `Session` que os serviços recebem.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let TenantContext(tenant_id) = TenantContext::from_request_parts(parts, state).await?;
        let Ok(Locale(locale)) = Locale::from_request_parts(parts, state).await;
        let Ok(client) = ClientInfo::from_request_parts(parts, state).await;

        Ok(Session {
            user_id: user.id,
            user_name: user.full_name,
            tenant_id,
            locale,
            user_agent: client.user_agent,
            ip_address: client.ip_address,
        })
    }
}
