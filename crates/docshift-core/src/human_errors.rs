// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the upload page.
//
// Every taxonomy variant is mapped to a plain Spanish message plus a
// suggestion. Technical detail stays in the logs, never in the message.

use std::fmt;

use crate::error::{ConversionError, ValidationError};

/// A user-facing error with a message and an actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// Plain summary (shown as a heading).
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
}

impl fmt::Display for HumanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

fn human(message: impl Into<String>, suggestion: impl Into<String>) -> HumanError {
    HumanError {
        message: message.into(),
        suggestion: suggestion.into(),
    }
}

/// Convert a validation rejection into a user message.
pub fn humanize_validation(err: &ValidationError) -> HumanError {
    match err {
        ValidationError::TooLarge { limit, .. } => human(
            format!(
                "El archivo es demasiado grande. El tamaño máximo permitido es {}.",
                format_size(*limit)
            ),
            "Reduce el tamaño del archivo e inténtalo de nuevo.",
        ),
        ValidationError::UnsupportedExtension { allowed, .. } => human(
            "Tipo de archivo no permitido.",
            format!("Formatos aceptados: {}.", allowed.join(", ")),
        ),
        ValidationError::InvalidContentType { .. } => human(
            "El contenido del archivo no coincide con su extensión.",
            "Verifica que el archivo no esté renombrado ni dañado.",
        ),
        ValidationError::CorruptImage { .. } => human(
            "La imagen está dañada o no es válida.",
            "Guarda la imagen de nuevo como JPG o PNG e inténtalo otra vez.",
        ),
        ValidationError::ImageTooSmall { min, .. } => human(
            format!("La imagen es demasiado pequeña (mínimo {min}x{min} píxeles)."),
            "Usa una imagen con mayor resolución.",
        ),
        ValidationError::ImageTooLarge { max, .. } => human(
            format!("La imagen es demasiado grande (máximo {max}x{max} píxeles)."),
            "Reduce la resolución de la imagen e inténtalo de nuevo.",
        ),
    }
}

/// Convert a strategy failure into a user message.
pub fn humanize_conversion(err: &ConversionError) -> HumanError {
    match err {
        ConversionError::ConversionTimeout { seconds } => human(
            format!("La conversión tardó más de {seconds} segundos y fue cancelada."),
            "Intenta con un documento más pequeño o más sencillo.",
        ),
        ConversionError::ExternalToolFailure { .. } => human(
            "Error en la conversión del documento.",
            "Comprueba que el documento se abra correctamente e inténtalo de nuevo.",
        ),
        ConversionError::ConversionLibraryFailure { .. } => human(
            "No se pudo procesar el archivo.",
            "El archivo puede estar dañado o protegido. Prueba con otro archivo.",
        ),
        ConversionError::EmptyExtraction => human(
            "No se pudo extraer texto de la imagen.",
            "Asegúrate de que la imagen contenga texto legible, bien iluminado y enfocado.",
        ),
        ConversionError::UnsupportedFormat { extension } => human(
            format!("El formato .{extension} no se puede convertir."),
            "Sube un documento de Word, un PDF o una imagen JPG/PNG.",
        ),
        ConversionError::Cancelled => human(
            "La conversión fue cancelada.",
            "Vuelve a subir el archivo si aún lo necesitas.",
        ),
        ConversionError::Internal { .. } => human(
            "Ocurrió un error inesperado durante la conversión.",
            "Inténtalo de nuevo en unos minutos.",
        ),
    }
}

/// Format a byte count as whole megabytes when possible.
fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
