// src/flow/codec.rs

//! Payloads dos QR codes de crachás e ativos.
//!
//! Formato em texto: `{"type": "EMP"|"EQP"|"EPI"|"TOOL"|"MAT", "id": "...", "timestamp": 123, ...extra}`.
//! Payloads de colaborador podem ser ofuscados (XOR com uma chave + base64url) para o
//! número do crachá não aparecer em texto puro no código impresso. Isso NÃO é
//! criptografia: quem tem o binário tem a chave. Não use para controle de acesso.

use std::collections::HashSet;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::{Map, Value};

use crate::models::flow::EntityKind;

pub const DEFAULT_OBFUSCATION_KEY: &str = "RAENG-ONEHUB";

/// Resultado de um `decode` bem-sucedido.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedQr {
    pub kind: EntityKind,
    pub entity_id: String,
    /// Demais campos do payload (timestamp e extras).
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct QrCodec {
    key: Vec<u8>,
    obfuscated: HashSet<EntityKind>,
}

impl Default for QrCodec {
    fn default() -> Self {
        Self::new(DEFAULT_OBFUSCATION_KEY, true)
    }
}

impl QrCodec {
    pub fn new(key: &str, obfuscate_employees: bool) -> Self {
        let mut obfuscated = HashSet::new();
        if obfuscate_employees {
            obfuscated.insert(EntityKind::Employee);
        }
        Self {
            key: key.as_bytes().to_vec(),
            obfuscated,
        }
    }

    pub fn encode(&self, kind: EntityKind, entity_id: &str, extra: Option<&Map<String, Value>>) -> String {
        self.encode_at(kind, entity_id, extra, Utc::now().timestamp_millis())
    }

    pub fn encode_at(
        &self,
        kind: EntityKind,
        entity_id: &str,
        extra: Option<&Map<String, Value>>,
        timestamp_ms: i64,
    ) -> String {
        let mut record = Map::new();
        if let Some(extra) = extra {
            for (k, v) in extra {
                record.insert(k.clone(), v.clone());
            }
        }
        // `type` e `id` nunca são sobrescritos por extras
        record.insert("type".to_string(), Value::from(kind.prefix()));
        record.insert("id".to_string(), Value::from(entity_id));
        record.insert("timestamp".to_string(), Value::from(timestamp_ms));

        let text = Value::Object(record).to_string();

        if self.obfuscated.contains(&kind) {
            self.obfuscate(&text)
        } else {
            text
        }
    }

    /// Nunca entra em pânico: qualquer entrada malformada vira `None`.
    pub fn decode(&self, payload: &str) -> Option<DecodedQr> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return None;
        }

        let value = if looks_obfuscated(trimmed) {
            self.reveal(trimmed)
                .and_then(|text| serde_json::from_str::<Value>(&text).ok())
                .or_else(|| serde_json::from_str::<Value>(trimmed).ok())?
        } else {
            serde_json::from_str::<Value>(trimmed).ok()?
        };

        let Value::Object(mut record) = value else {
            return None;
        };

        let kind = match record.remove("type")? {
            Value::String(prefix) => EntityKind::from_prefix(&prefix),
            _ => return None,
        };

        let entity_id = match record.remove("id")? {
            Value::String(id) if !id.is_empty() => id,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        Some(DecodedQr { kind, entity_id, data: record })
    }

    fn obfuscate(&self, text: &str) -> String {
        URL_SAFE_NO_PAD.encode(self.xor(text.as_bytes()))
    }

    fn reveal(&self, payload: &str) -> Option<String> {
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        String::from_utf8(self.xor(&bytes)).ok()
    }

    fn xor(&self, bytes: &[u8]) -> Vec<u8> {
        if self.key.is_empty() {
            return bytes.to_vec();
        }
        bytes
            .iter()
            .zip(self.key.iter().cycle())
            .map(|(b, k)| b ^ k)
            .collect()
    }
}

fn looks_obfuscated(payload: &str) -> bool {
    payload
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
