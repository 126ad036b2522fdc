use sqlx::{PgPool, Postgres, Transaction};

use crate::common::error::AppError;
use crate::models::session::Session;

// ---
// Helper de sessão: identifica empresa e usuário na transação
// ---
/// Abre uma transação e define `app.tenant_id` / `app.user_id` só para ela.
///
/// São só metadados da sessão: o schema não tem políticas RLS, então o
/// isolamento por empresa vem do `tenant_id` em cada consulta.
pub(crate) async fn begin_scoped(
    pool: &PgPool,
    session: &Session,
) -> Result<Transaction<'static, Postgres>, AppError> {
    let mut tx = pool.begin().await?;

    // `true` = vale apenas até o fim da transação
    sqlx::query("SELECT set_config('app.tenant_id', $1, true)")
        .bind(session.tenant_id.to_string())
        .execute(&mut *tx)
        .await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(session.user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
