// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const SUPPORTED: [&str; 3] = ["pt", "en", "es"];
const DEFAULT_LANG: &str = "pt";

// Idioma curto da requisição ("pt", "en", "es")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

/// "pt-BR,pt;q=0.9,en;q=0.8" -> "pt". Idiomas não suportados caem no padrão.
pub fn negotiate(header_value: Option<&str>) -> String {
    header_value
        .map(accept_language::parse)
        .unwrap_or_default()
        .iter()
        .filter_map(|tag| tag.split('-').next())
        .map(str::to_ascii_lowercase)
        .find(|lang| SUPPORTED.contains(&lang.as_str()))
        .unwrap_or_else(|| DEFAULT_LANG.to_string())
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok());

        Ok(Locale(negotiate(header_value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(negotiate(Some("pt-BR,pt;q=0.9,en;q=0.8")), "pt");
        assert_eq!(negotiate(Some("en-US")), "en");
        assert_eq!(negotiate(Some("fr-FR,es;q=0.5")), "es");
    }

    #[test]
    fn falls_back_to_portuguese() {
        assert_eq!(negotiate(None), "pt");
        assert_eq!(negotiate(Some("de")), "pt");
    }
}
