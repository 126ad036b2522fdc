// src/services/document_service.rs

use genpdf::{elements, style, Element};
use image::{DynamicImage, ImageOutputFormat, Luma};
use qrcode::QrCode;

use crate::{common::error::AppError, models::term::TermSignature};

const FONT_DIR: &str = "./fonts";
const FONT_FAMILY: &str = "Roboto";

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

fn qr_image(payload: &str) -> Result<DynamicImage, AppError> {
    let code = QrCode::new(payload.as_bytes()).map_err(render_error)?;
    let image_buffer = code.render::<Luma<u8>>().min_dimensions(256, 256).build();
    Ok(DynamicImage::ImageLuma8(image_buffer))
}

/// Geração de arquivos: PNG do QR code e PDF do termo assinado.
#[derive(Clone, Default)]
pub struct DocumentService;

impl DocumentService {
    pub fn new() -> Self {
        Self
    }

    /// PNG do QR para o payload informado (crachá ou etiqueta).
    pub fn qr_png(&self, payload: &str) -> Result<Vec<u8>, AppError> {
        let mut buffer = Vec::new();
        qr_image(payload)?
            .write_to(&mut buffer, ImageOutputFormat::Png)
            .map_err(render_error)?;
        Ok(buffer)
    }

    /// PDF do termo assinado, com o hash de validação em QR no rodapé.
    pub fn signed_term_pdf(&self, signature: &TermSignature) -> Result<Vec<u8>, AppError> {
        let font_family = genpdf::fonts::from_files(FONT_DIR, FONT_FAMILY, None)
            .map_err(|_| AppError::FontNotFound("Fonte não encontrada na pasta ./fonts".to_string()))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(signature.term_title.clone());
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(elements::Paragraph::new(signature.term_title.clone())
            .styled(style::Style::new().bold().with_font_size(16)));
        doc.push(elements::Paragraph::new(format!("Versão {}", signature.term_version))
            .styled(style::Style::new().with_font_size(9)));
        doc.push(elements::Break::new(1.5));

        // O corpo já vem renderizado; uma linha por parágrafo
        for line in signature.rendered_body.lines() {
            if line.trim().is_empty() {
                doc.push(elements::Break::new(0.5));
            } else {
                doc.push(elements::Paragraph::new(line.to_string()));
            }
        }

        doc.push(elements::Break::new(2));
        doc.push(elements::Paragraph::new("VALIDAÇÃO")
            .styled(style::Style::new().bold().with_font_size(11)));
        doc.push(elements::Paragraph::new(format!(
            "Assinado em {}",
            signature.signed_at.format("%d/%m/%Y %H:%M:%S UTC")
        )).styled(style::Style::new().with_font_size(9)));
        if let Some(ip) = &signature.ip_address {
            doc.push(elements::Paragraph::new(format!("IP: {}", ip))
                .styled(style::Style::new().with_font_size(9)));
        }
        if let Some(device) = &signature.user_agent {
            doc.push(elements::Paragraph::new(format!("Dispositivo: {}", device))
                .styled(style::Style::new().with_font_size(9)));
        }
        doc.push(elements::Paragraph::new(format!("Hash: {}", signature.validation_hash))
            .styled(style::Style::new().italic().with_font_size(8)));
        doc.push(elements::Break::new(1));

        let pdf_image = elements::Image::from_dynamic_image(qr_image(&signature.validation_hash)?)
            .map_err(render_error)?
            .with_scale(genpdf::Scale::new(0.5, 0.5));
        doc.push(pdf_image);

        let mut buffer = Vec::new();
        doc.render(&mut buffer).map_err(render_error)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_png_has_png_signature() {
        let png = DocumentService::new().qr_png("{\"type\":\"EQP\",\"id\":\"EQP-001\"}").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
