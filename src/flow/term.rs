// src/flow/term.rs

//! Termo digital: substituição dos placeholders e hash de validação.
//!
//! A prévia no cliente e a versão assinada no servidor usam o mesmo `render`;
//! só a linha de assinatura muda.

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::employee::Employee;
use crate::models::flow::FlowItem;

pub const PLACEHOLDER_NAME: &str = "{NOME_COLABORADOR}";
pub const PLACEHOLDER_BADGE: &str = "{NUMERO_CRACHA}";
pub const PLACEHOLDER_ITEMS: &str = "{LISTA_ITEMS}";
pub const PLACEHOLDER_DATE: &str = "{DATA}";
pub const PLACEHOLDER_SIGNATURE: &str = "{ASSINATURA_DIGITAL}";

pub const PENDING_SIGNATURE: &str = "[Assinatura digital pendente de confirmação]";

pub fn format_items(items: &[FlowItem]) -> String {
    items
        .iter()
        .map(|item| format!("- {} ({}) - Qtd: {}", item.name, item.code, item.quantity.normalize()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Placeholders desconhecidos ficam como estão.
pub fn render(template: &str, employee: &Employee, items: &[FlowItem], date: NaiveDate, signature: &str) -> String {
    template
        .replace(PLACEHOLDER_NAME, &employee.name)
        .replace(PLACEHOLDER_BADGE, &employee.badge_code)
        .replace(PLACEHOLDER_ITEMS, &format_items(items))
        .replace(PLACEHOLDER_DATE, &date.format("%d/%m/%Y").to_string())
        .replace(PLACEHOLDER_SIGNATURE, signature)
}

/// Prévia mostrada ao colaborador antes de confirmar.
pub fn render_preview(template: &str, employee: &Employee, items: &[FlowItem], date: NaiveDate) -> String {
    render(template, employee, items, date, PENDING_SIGNATURE)
}

pub fn signature_line(employee: &Employee, signed_at: &DateTime<Utc>, validation_hash: &str) -> String {
    format!(
        "Assinado digitalmente por {} (crachá {}) em {} UTC - Código de validação: {}",
        employee.name,
        employee.badge_code,
        signed_at.format("%d/%m/%Y %H:%M:%S"),
        validation_hash
    )
}

/// SHA-256 (hex) do conteúdo assinado. O corpo entra ainda com o placeholder
/// de assinatura, já que a linha de assinatura contém o próprio hash.
pub fn validation_hash(
    tenant_id: Uuid,
    employee_id: Uuid,
    term_id: Uuid,
    term_version: i32,
    unsigned_body: &str,
    signed_at: &DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(employee_id.as_bytes());
    hasher.update(term_id.as_bytes());
    hasher.update(term_version.to_be_bytes());
    hasher.update(unsigned_body.as_bytes());
    hasher.update(signed_at.to_rfc3339().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::run::fixtures::{holder, item};

    const TEMPLATE: &str = "Eu, {NOME_COLABORADOR}, crachá {NUMERO_CRACHA}, recebi:\n{LISTA_ITEMS}\nData: {DATA}\n{ASSINATURA_DIGITAL}";

    #[test]
    fn all_five_placeholders_are_substituted() {
        let employee = holder("João Silva", "COLAB-001").employee;
        let items = vec![item("Capacete de Segurança", "EPI-001", 1), item("Luva de Raspa", "EPI-014", 2)];
        let date = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let text = render(TEMPLATE, &employee, &items, date, "ASSINADO");

        for placeholder in [
            PLACEHOLDER_NAME,
            PLACEHOLDER_BADGE,
            PLACEHOLDER_ITEMS,
            PLACEHOLDER_DATE,
            PLACEHOLDER_SIGNATURE,
        ] {
            assert!(!text.contains(placeholder), "{placeholder} ficou no texto");
        }
        assert_eq!(
            text,
            "Eu, João Silva, crachá COLAB-001, recebi:\n\
             - Capacete de Segurança (EPI-001) - Qtd: 1\n\
             - Luva de Raspa (EPI-014) - Qtd: 2\n\
             Data: 16/10/2026\n\
             ASSINADO"
        );
    }

    #[test]
    fn unknown_placeholders_are_left_verbatim() {
        let employee = holder("Ana", "C-2").employee;
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let text = render("{NOME_COLABORADOR} {CARGO}", &employee, &[], date, "");
        assert_eq!(text, "Ana {CARGO}");
    }

    #[test]
    fn preview_and_signed_render_differ_only_in_signature_line() {
        let employee = holder("Ana", "C-2").employee;
        let items = vec![item("Bota", "EPI-3", 1)];
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let preview = render_preview(TEMPLATE, &employee, &items, date);
        let signed = render(TEMPLATE, &employee, &items, date, "X");
        assert_eq!(
            preview.replace(PENDING_SIGNATURE, ""),
            signed.strip_suffix('X').unwrap()
        );
    }

    #[test]
    fn validation_hash_depends_on_the_body() {
        let now = Utc::now();
        let (t, e, term) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let a = validation_hash(t, e, term, 1, "corpo", &now);
        let b = validation_hash(t, e, term, 1, "corpo", &now);
        let c = validation_hash(t, e, term, 1, "corpo alterado", &now);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
