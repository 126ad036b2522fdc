// src/flow/collectors.rs

//! Coletores da etapa "detalhes": um por tipo de fluxo.
//!
//! Cada coletor recebe os campos digitados e devolve o `OperationDetail`
//! normalizado. Se faltar campo obrigatório, nada é construído.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::flow::error::FlowError;
use crate::models::flow::{FlowType, OperationDetail, OperationRecord};

pub const NO_OBSERVATIONS: &str = "Nenhuma observação";

pub const RETURN_STATES: [&str; 7] = [
    "Perfeito estado",
    "Desgaste normal pelo uso",
    "Danificado em operação",
    "Perdido em campo",
    "CA vencido",
    "Defeito de fabricação",
    "Contaminado / sem condições de higienização",
];

pub const EXCHANGE_REASONS: [&str; 7] = [
    "Desgaste natural",
    "Danificado durante o uso",
    "Tamanho incorreto (pequeno/grande)",
    "CA vencido",
    "Perda ou extravio",
    "Defeito de fabricação",
    "Higienização / contaminação",
];

/// Dados que todo coletor injeta no registro.
#[derive(Debug, Clone)]
pub struct CollectorContext {
    pub employee_name: String,
    pub actor_name: String,
    pub locale: String,
    pub now: DateTime<Utc>,
}

impl CollectorContext {
    pub fn formatted_timestamp(&self) -> String {
        format_timestamp(&self.now, &self.locale)
    }
}

/// Formata data/hora conforme o idioma ativo ("pt", "es", "en").
pub fn format_timestamp(at: &DateTime<Utc>, locale: &str) -> String {
    match locale {
        "en" => at.format("%m/%d/%Y %I:%M:%S %p").to_string(),
        _ => at.format("%d/%m/%Y %H:%M:%S").to_string(),
    }
}

pub trait DetailCollector: Send + Sync {
    fn flow_type(&self) -> FlowType;

    /// Campos obrigatórios ainda vazios, na ordem do formulário.
    fn missing_fields(&self) -> Vec<&'static str>;

    /// Campos próprios da operação, na ordem de exibição.
    fn fields(&self) -> Vec<(&'static str, String)>;

    fn check_choices(&self) -> Result<(), FlowError> {
        Ok(())
    }

    /// Controla o botão "Prosseguir".
    fn can_submit(&self) -> bool {
        self.missing_fields().is_empty() && self.check_choices().is_ok()
    }

    fn submit(&self, ctx: &CollectorContext) -> Result<OperationDetail, FlowError> {
        if let Some(field) = self.missing_fields().first().copied() {
            return Err(FlowError::MissingRequiredField(field));
        }
        self.check_choices()?;

        let mut detail = OperationDetail::new();
        detail.insert("Modo de Registro".to_string(), "Automático".to_string());
        detail.insert("Data/Hora".to_string(), ctx.formatted_timestamp());
        detail.insert("Colaborador".to_string(), ctx.employee_name.clone());
        detail.insert("Registrado por".to_string(), ctx.actor_name.clone());
        for (name, value) in self.fields() {
            detail.insert(name.to_string(), value);
        }
        Ok(detail)
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn observations(value: &Option<String>) -> String {
    filled(value).unwrap_or(NO_OBSERVATIONS).to_string()
}

fn check_choice(field: &'static str, value: &Option<String>, allowed: &[&str]) -> Result<(), FlowError> {
    match filled(value) {
        Some(v) if !allowed.contains(&v) => Err(FlowError::InvalidChoice {
            field,
            value: v.to_string(),
        }),
        _ => Ok(()),
    }
}

// --- Entrega ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryCollector {
    pub observations: Option<String>,
    #[serde(default)]
    pub generate_term: bool,
    /// Modelo de termo a assinar; obrigatório quando `generate_term`.
    pub term_id: Option<Uuid>,
}

impl DetailCollector for DeliveryCollector {
    fn flow_type(&self) -> FlowType {
        FlowType::Delivery
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        if self.generate_term && self.term_id.is_none() {
            vec!["Termo"]
        } else {
            vec![]
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        let term = if self.generate_term { "Habilitado" } else { "Desabilitado" };
        vec![
            ("Observações", observations(&self.observations)),
            ("Termo Digital", term.to_string()),
        ]
    }
}

// --- Devolução ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnCollector {
    /// Um de `RETURN_STATES`.
    pub state: Option<String>,
    pub observations: Option<String>,
}

impl DetailCollector for ReturnCollector {
    fn flow_type(&self) -> FlowType {
        FlowType::Return
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        if filled(&self.state).is_none() { vec!["Estado"] } else { vec![] }
    }

    fn check_choices(&self) -> Result<(), FlowError> {
        check_choice("Estado", &self.state, &RETURN_STATES)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Estado", filled(&self.state).unwrap_or_default().to_string()),
            ("Observações", observations(&self.observations)),
        ]
    }
}

// --- Troca ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCollector {
    /// Um de `EXCHANGE_REASONS`.
    pub reason: Option<String>,
    /// Um de `RETURN_STATES`: estado do item devolvido na troca.
    pub state: Option<String>,
    pub observations: Option<String>,
}

impl DetailCollector for ExchangeCollector {
    fn flow_type(&self) -> FlowType {
        FlowType::Exchange
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if filled(&self.reason).is_none() {
            missing.push("Motivo");
        }
        if filled(&self.state).is_none() {
            missing.push("Estado");
        }
        missing
    }

    fn check_choices(&self) -> Result<(), FlowError> {
        check_choice("Motivo", &self.reason, &EXCHANGE_REASONS)?;
        check_choice("Estado", &self.state, &RETURN_STATES)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Motivo", filled(&self.reason).unwrap_or_default().to_string()),
            ("Estado", filled(&self.state).unwrap_or_default().to_string()),
            ("Observações", observations(&self.observations)),
        ]
    }
}

// --- Aplicação ---

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCollector {
    pub location: Option<String>,
    pub reason: Option<String>,
    pub observations: Option<String>,
}

impl DetailCollector for ApplicationCollector {
    fn flow_type(&self) -> FlowType {
        FlowType::Application
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = vec![];
        if filled(&self.location).is_none() {
            missing.push("Local");
        }
        if filled(&self.reason).is_none() {
            missing.push("Motivo");
        }
        missing
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Local", filled(&self.location).unwrap_or_default().to_string()),
            ("Motivo", filled(&self.reason).unwrap_or_default().to_string()),
            ("Observações", observations(&self.observations)),
        ]
    }
}

/// Campos que o formulário de cada tipo exige, na ordem do formulário.
pub fn required_fields(flow_type: FlowType) -> &'static [&'static str] {
    match flow_type {
        FlowType::Delivery => &[],
        FlowType::Return => &["Estado"],
        FlowType::Exchange => &["Motivo", "Estado"],
        FlowType::Application => &["Local", "Motivo"],
    }
}

/// Campos de lista fechada de cada tipo.
pub fn choice_fields(flow_type: FlowType) -> &'static [(&'static str, &'static [&'static str])] {
    match flow_type {
        FlowType::Delivery | FlowType::Application => &[],
        FlowType::Return => &[("Estado", &RETURN_STATES)],
        FlowType::Exchange => &[("Motivo", &EXCHANGE_REASONS), ("Estado", &RETURN_STATES)],
    }
}

fn detail_value<'a>(details: &'a OperationDetail, field: &str) -> Option<&'a str> {
    details.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Confere um registro montado fora do orquestrador com as mesmas regras dos
/// coletores. Só a entrega leva termo, e termo habilitado exige a assinatura.
pub fn validate_record(record: &OperationRecord) -> Result<(), FlowError> {
    let value = |field: &str| detail_value(&record.details, field);

    for &field in required_fields(record.flow_type) {
        if value(field).is_none() {
            return Err(FlowError::MissingRequiredField(field));
        }
    }
    for &(field, allowed) in choice_fields(record.flow_type) {
        if let Some(v) = value(field) {
            if !allowed.contains(&v) {
                return Err(FlowError::InvalidChoice { field, value: v.to_string() });
            }
        }
    }

    match record.flow_type {
        FlowType::Delivery => {
            if value("Termo Digital") == Some("Habilitado") && record.signature_id.is_none() {
                return Err(FlowError::MissingRequiredField("Termo"));
            }
        }
        other => {
            if record.signature_id.is_some() {
                return Err(FlowError::TermNotAllowed(other));
            }
        }
    }
    Ok(())
}

/// O formulário de detalhes como chega pela API; `flowType` escolhe o coletor.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "flowType", rename_all = "lowercase")]
pub enum CollectorInput {
    Delivery(DeliveryCollector),
    Return(ReturnCollector),
    Exchange(ExchangeCollector),
    Application(ApplicationCollector),
}

impl CollectorInput {
    pub fn collector(&self) -> &dyn DetailCollector {
        match self {
            CollectorInput::Delivery(c) => c,
            CollectorInput::Return(c) => c,
            CollectorInput::Exchange(c) => c,
            CollectorInput::Application(c) => c,
        }
    }

    /// Termo pedido na entrega, se houver.
    pub fn requested_term(&self) -> Option<Uuid> {
        match self {
            CollectorInput::Delivery(c) if c.generate_term => c.term_id,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> CollectorContext {
        CollectorContext {
            employee_name: "João Silva".into(),
            actor_name: "Maria Operadora".into(),
            locale: "pt".into(),
            now: Utc.with_ymd_and_hms(2026, 3, 14, 9, 5, 0).unwrap(),
        }
    }

    #[test]
    fn exchange_with_reason_and_state_but_no_observations_submits() {
        let collector = ExchangeCollector {
            reason: Some("Tamanho incorreto (pequeno/grande)".into()),
            state: Some("Desgaste normal pelo uso".into()),
            observations: None,
        };
        assert!(collector.can_submit());
        let detail = collector.submit(&ctx()).unwrap();
        assert_eq!(detail["Motivo"], "Tamanho incorreto (pequeno/grande)");
        assert_eq!(detail["Estado"], "Desgaste normal pelo uso");
        assert_eq!(detail["Observações"], "Nenhuma observação");
        assert_eq!(detail["Modo de Registro"], "Automático");
        assert_eq!(detail["Data/Hora"], "14/03/2026 09:05:00");
        assert_eq!(detail["Colaborador"], "João Silva");
        assert_eq!(detail["Registrado por"], "Maria Operadora");
    }

    #[test]
    fn exchange_with_reason_but_no_state_does_not_submit() {
        let collector = ExchangeCollector {
            reason: Some("Tamanho incorreto (pequeno/grande)".into()),
            state: None,
            observations: Some("urgente".into()),
        };
        assert!(!collector.can_submit());
        assert_eq!(collector.submit(&ctx()), Err(FlowError::MissingRequiredField("Estado")));
    }

    #[test]
    fn each_flow_type_refuses_empty_required_fields() {
        let blank = Some("   ".to_string());
        let cases: Vec<(Box<dyn DetailCollector>, &str)> = vec![
            (Box::new(ReturnCollector { state: blank.clone(), observations: None }), "Estado"),
            (Box::new(ExchangeCollector::default()), "Motivo"),
            (
                Box::new(ApplicationCollector { location: None, reason: Some("Reparo".into()), observations: None }),
                "Local",
            ),
            (
                Box::new(ApplicationCollector { location: Some("Bloco B".into()), reason: blank, observations: None }),
                "Motivo",
            ),
            (
                Box::new(DeliveryCollector { observations: None, generate_term: true, term_id: None }),
                "Termo",
            ),
        ];
        for (collector, field) in cases {
            assert!(!collector.can_submit());
            assert_eq!(collector.submit(&ctx()), Err(FlowError::MissingRequiredField(field)));
        }
    }

    #[test]
    fn choices_outside_the_fixed_lists_are_rejected() {
        let collector = ReturnCollector { state: Some("Quase novo".into()), observations: None };
        assert!(!collector.can_submit());
        assert!(matches!(
            collector.submit(&ctx()),
            Err(FlowError::InvalidChoice { field: "Estado", .. })
        ));
    }

    fn record(flow_type: FlowType, details: &[(&str, &str)], signature_id: Option<Uuid>) -> OperationRecord {
        OperationRecord {
            run_id: Uuid::new_v4(),
            flow_type,
            employee_id: Uuid::new_v4(),
            employee_name: "João Silva".to_string(),
            items: vec![crate::flow::run::fixtures::item("Capacete de Segurança", "EPI-001", 1)],
            details: details.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            signature_id,
        }
    }

    #[test]
    fn empty_collectors_miss_exactly_the_required_fields() {
        assert_eq!(ReturnCollector::default().missing_fields(), required_fields(FlowType::Return));
        assert_eq!(ExchangeCollector::default().missing_fields(), required_fields(FlowType::Exchange));
        assert_eq!(ApplicationCollector::default().missing_fields(), required_fields(FlowType::Application));
        assert!(DeliveryCollector::default().missing_fields().is_empty());
    }

    #[test]
    fn submitted_details_pass_record_validation() {
        let detail = ExchangeCollector {
            reason: Some("CA vencido".into()),
            state: Some("CA vencido".into()),
            observations: None,
        }
        .submit(&ctx())
        .unwrap();
        let mut rec = record(FlowType::Exchange, &[], None);
        rec.details = detail;
        assert_eq!(validate_record(&rec), Ok(()));
    }

    #[test]
    fn record_without_required_fields_is_rejected() {
        let exchange = record(FlowType::Exchange, &[], None);
        assert_eq!(validate_record(&exchange), Err(FlowError::MissingRequiredField("Motivo")));

        let exchange = record(FlowType::Exchange, &[("Motivo", "Desgaste natural"), ("Estado", " ")], None);
        assert_eq!(validate_record(&exchange), Err(FlowError::MissingRequiredField("Estado")));

        let application = record(FlowType::Application, &[("Motivo", "Reparo")], None);
        assert_eq!(validate_record(&application), Err(FlowError::MissingRequiredField("Local")));

        let ret = record(FlowType::Return, &[("Observações", "ok")], None);
        assert_eq!(validate_record(&ret), Err(FlowError::MissingRequiredField("Estado")));
    }

    #[test]
    fn record_with_state_outside_the_list_is_rejected() {
        let ret = record(FlowType::Return, &[("Estado", "Quase novo")], None);
        assert!(matches!(
            validate_record(&ret),
            Err(FlowError::InvalidChoice { field: "Estado", .. })
        ));

        let exchange = record(FlowType::Exchange, &[("Motivo", "Cansei"), ("Estado", "Perfeito estado")], None);
        assert!(matches!(
            validate_record(&exchange),
            Err(FlowError::InvalidChoice { field: "Motivo", .. })
        ));
    }

    #[test]
    fn only_delivery_may_carry_a_signature() {
        let exchange = record(
            FlowType::Exchange,
            &[("Motivo", "Desgaste natural"), ("Estado", "Perfeito estado")],
            Some(Uuid::new_v4()),
        );
        assert_eq!(validate_record(&exchange), Err(FlowError::TermNotAllowed(FlowType::Exchange)));

        let ret = record(FlowType::Return, &[("Estado", "Perfeito estado")], Some(Uuid::new_v4()));
        assert_eq!(validate_record(&ret), Err(FlowError::TermNotAllowed(FlowType::Return)));

        let delivery = record(FlowType::Delivery, &[("Termo Digital", "Habilitado")], Some(Uuid::new_v4()));
        assert_eq!(validate_record(&delivery), Ok(()));
    }

    #[test]
    fn delivery_with_term_enabled_needs_the_signature() {
        let delivery = record(FlowType::Delivery, &[("Termo Digital", "Habilitado")], None);
        assert_eq!(validate_record(&delivery), Err(FlowError::MissingRequiredField("Termo")));

        let delivery = record(FlowType::Delivery, &[("Termo Digital", "Desabilitado")], None);
        assert_eq!(validate_record(&delivery), Ok(()));
    }

    #[test]
    fn delivery_marks_the_digital_term_flag() {
        let on = DeliveryCollector { observations: Some(" ok ".into()), generate_term: true, term_id: Some(Uuid::new_v4()) };
        let detail = on.submit(&ctx()).unwrap();
        assert_eq!(detail["Termo Digital"], "Habilitado");
        assert_eq!(detail["Observações"], "ok");

        let off = DeliveryCollector::default();
        assert_eq!(off.submit(&ctx()).unwrap()["Termo Digital"], "Desabilitado");
    }

    #[test]
    fn application_keeps_field_order() {
        let detail = ApplicationCollector {
            location: Some("Bloco B".into()),
            reason: Some("Impermeabilização".into()),
            observations: None,
        }
        .submit(&ctx())
        .unwrap();
        let keys: Vec<&str> = detail.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["Modo de Registro", "Data/Hora", "Colaborador", "Registrado por", "Local", "Motivo", "Observações"]
        );
    }

    #[test]
    fn input_is_selected_by_flow_type_tag() {
        let input: CollectorInput = serde_json::from_str(
            r#"{"flowType":"exchange","reason":"CA vencido","state":"CA vencido"}"#,
        )
        .unwrap();
        assert_eq!(input.collector().flow_type(), FlowType::Exchange);
        assert_eq!(input.requested_term(), None);
    }

    #[test]
    fn english_locale_uses_month_first() {
        let mut c = ctx();
        c.locale = "en".into();
        assert_eq!(c.formatted_timestamp(), "03/14/2026 09:05:00 AM");
    }
}
