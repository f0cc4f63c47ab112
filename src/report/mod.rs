//! PDF report rendering.
//!
//! Lays out one snapshot as a letter-size document: bold title, creation
//! date, the four aggregate figures, then the equipment type distribution
//! as a stacked list. Long distributions continue onto additional pages
//! instead of running off the bottom margin.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};

use crate::error::{ApiError, ApiResult};
use crate::store::Snapshot;

const PAGE_WIDTH_PT: f32 = 612.0;
const PAGE_HEIGHT_PT: f32 = 792.0;
const MARGIN_PT: f32 = 50.0;
const LINE_STEP_PT: f32 = 20.0;
const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 12.0;

const PT_TO_MM: f32 = 25.4 / 72.0;

/// Renders the report for one snapshot as PDF bytes.
pub fn render(snapshot: &Snapshot) -> ApiResult<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Chemical Equipment Parameter Report",
        Mm(PAGE_WIDTH_PT * PT_TO_MM),
        Mm(PAGE_HEIGHT_PT * PT_TO_MM),
        "Layer 1",
    );

    let body_font = builtin_font(&doc, BuiltinFont::Helvetica)?;
    let title_font = builtin_font(&doc, BuiltinFont::HelveticaBold)?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);

    // Positions are measured from the top of the page in points, matching
    // the fixed layout of the report.
    layer.use_text(
        "Chemical Equipment Parameter Report",
        TITLE_SIZE,
        x(MARGIN_PT),
        y_from_top(50.0),
        &title_font,
    );
    layer.use_text(
        format!("Date: {}", snapshot.created_at.format("%Y-%m-%d %H:%M:%S")),
        BODY_SIZE,
        x(MARGIN_PT),
        y_from_top(80.0),
        &body_font,
    );

    layer.use_text(
        format!("Total Equipment Count: {}", snapshot.total_count),
        BODY_SIZE,
        x(MARGIN_PT),
        y_from_top(120.0),
        &body_font,
    );
    layer.use_text(
        format!("Average Flowrate: {:.2}", snapshot.avg_flowrate),
        BODY_SIZE,
        x(MARGIN_PT),
        y_from_top(140.0),
        &body_font,
    );
    layer.use_text(
        format!("Average Pressure: {:.2}", snapshot.avg_pressure),
        BODY_SIZE,
        x(MARGIN_PT),
        y_from_top(160.0),
        &body_font,
    );
    layer.use_text(
        format!("Average Temperature: {:.2}", snapshot.avg_temperature),
        BODY_SIZE,
        x(MARGIN_PT),
        y_from_top(180.0),
        &body_font,
    );

    layer.use_text(
        "Equipment Type Distribution:",
        BODY_SIZE,
        x(MARGIN_PT),
        y_from_top(220.0),
        &body_font,
    );

    let mut cursor = 240.0;
    for entry in &snapshot.type_distribution {
        if cursor > PAGE_HEIGHT_PT - MARGIN_PT {
            let (page, page_layer) = doc.add_page(
                Mm(PAGE_WIDTH_PT * PT_TO_MM),
                Mm(PAGE_HEIGHT_PT * PT_TO_MM),
                "Layer 1",
            );
            layer = doc.get_page(page).get_layer(page_layer);
            cursor = MARGIN_PT;
        }
        layer.use_text(
            format!("- {}: {}", entry.equipment_type, entry.count),
            BODY_SIZE,
            x(70.0),
            y_from_top(cursor),
            &body_font,
        );
        cursor += LINE_STEP_PT;
    }

    doc.save_to_bytes()
        .map_err(|e| ApiError::Internal(format!("pdf rendering failed: {e}")))
}

fn builtin_font(
    doc: &PdfDocumentReference,
    font: BuiltinFont,
) -> ApiResult<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|e| ApiError::Internal(format!("pdf font setup failed: {e}")))
}

fn x(pts: f32) -> Mm {
    Mm(pts * PT_TO_MM)
}

fn y_from_top(pts: f32) -> Mm {
    Mm((PAGE_HEIGHT_PT - pts) * PT_TO_MM)
}
