//! Admin downloads: the realization PDF report and the appointment CSV.

use std::io::{self, Cursor};

use csv::WriterBuilder;
use printpdf::{IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, Pt};
use thiserror::Error;

use crate::db::{Appointment, Realization};

pub const PDF_FILENAME: &str = "database_report.pdf";
pub const CSV_FILENAME: &str = "appointments.csv";

const LETTER_WIDTH: Pt = Pt(612.0);
const LETTER_HEIGHT: Pt = Pt(792.0);
const FONT_SIZE: f32 = 12.0;
const LAYER: &str = "Warstwa 1";

/// DejaVu Sans, used when no other font is configured. It covers the Polish
/// letters that the PDF standard fonts cannot encode.
const FALLBACK_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("pdf error: {0}")]
    Pdf(#[from] printpdf::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Renders one US-letter page per realization with its title, description
/// and date. An empty selection still yields a single blank page.
///
/// `font` is a TrueType font used for the text; without one the bundled
/// DejaVu Sans is embedded.
pub fn realizations_pdf(realizations: &[Realization], font: Option<&[u8]>) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new("Raport realizacji", LETTER_WIDTH.into(), LETTER_HEIGHT.into(), LAYER);
    let font = load_font(&doc, font)?;

    for (index, realization) in realizations.iter().enumerate() {
        let (page, layer) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(LETTER_WIDTH.into(), LETTER_HEIGHT.into(), LAYER)
        };
        let layer = doc.get_page(page).get_layer(layer);

        let lines = [
            (750.0, format!("Tytuł: {}", realization.title)),
            (730.0, format!("Opis: {}", realization.content)),
            (710.0, format!("Data: {}", realization.date.format("%Y-%m-%d %H:%M:%S"))),
        ];
        for (y, text) in lines {
            layer.use_text(text, FONT_SIZE, Mm::from(Pt(100.0)), Mm::from(Pt(y)), &font);
        }
    }

    Ok(doc.save_to_bytes()?)
}

fn load_font(doc: &PdfDocumentReference, font: Option<&[u8]>) -> Result<IndirectFontRef, ExportError> {
    let bytes = font.unwrap_or(FALLBACK_FONT);
    Ok(doc.add_external_font(Cursor::new(bytes))?)
}

/// Appointments as CSV with an `id,date,description` header. Dates are RFC 3339.
pub fn appointments_csv(appointments: &[Appointment]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    wtr.write_record(["id", "date", "description"])?;

    for appointment in appointments {
        wtr.write_record([
            appointment.id.to_string(),
            appointment.date.to_rfc3339(),
            appointment.description.clone(),
        ])?;
    }

    wtr.into_inner().map_err(|err| ExportError::Io(err.into_error()))
}
