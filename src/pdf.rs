use crate::error::{LocalFault, TicketError};
use crate::qr::ScannableCode;
use crate::result::TicketResult;
use printpdf::image_crate::{DynamicImage, GrayImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use snafu::OptionExt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

const PAGE_WIDTH_MM: f64 = 210.0;
const PAGE_HEIGHT_MM: f64 = 297.0;
const MARGIN_MM: f64 = 18.0;
const PT_TO_MM: f64 = 0.352_778;
const LINE_SPACING: f64 = 1.6;
const IMAGE_GAP_MM: f64 = 5.0;
// Floor for the image resolution; below this the raster would be drawn
// larger than its source pixels.
const MIN_DPI: f64 = 72.0;

/// Append-only layout stream the renderer writes into. `finish` is the
/// durable-completion signal; returning from the layout calls is not.
pub trait DocumentSink {
    fn text_block(&mut self, text: &str, size_pt: f64) -> TicketResult<()>;
    fn image_block(&mut self, code: &ScannableCode, fit_mm: (f64, f64)) -> TicketResult<()>;
    fn finish(&mut self) -> TicketResult<()>;
}

/// PDF file sink. Layout happens in memory; `finish` writes the document to
/// a sibling temporary path, syncs it, and renames it into place, so the
/// final path never holds a partial artifact.
pub struct PdfFileSink {
    path: PathBuf,
    tmp_path: PathBuf,
    doc: Option<PdfDocumentReference>,
    font: IndirectFontRef,
    layer: PdfLayerReference,
    cursor_mm: f64,
}

impl PdfFileSink {
    pub fn create(path: &Path) -> TicketResult<PdfFileSink> {
        let (doc, page, layer) = PdfDocument::new(
            "Ticket",
            Mm(PAGE_WIDTH_MM as f32),
            Mm(PAGE_HEIGHT_MM as f32),
            "Layer 1",
        );
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|source| sink_failure(path, source))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(PdfFileSink {
            path: path.to_path_buf(),
            tmp_path: path.with_extension("pdf.tmp"),
            doc: Some(doc),
            font,
            layer,
            cursor_mm: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_doc(&self) -> TicketResult<&PdfDocumentReference> {
        self.doc.as_ref().context(LocalFault {
            message: "Document sink already finalized".to_string(),
        })
    }

    fn ensure_room(&mut self, needed_mm: f64) -> TicketResult<()> {
        if self.cursor_mm - needed_mm >= MARGIN_MM {
            return Ok(());
        }
        let doc = self.doc.as_ref().context(LocalFault {
            message: "Document sink already finalized".to_string(),
        })?;
        let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM as f32), Mm(PAGE_HEIGHT_MM as f32), "Layer 1");
        self.layer = doc.get_page(page).get_layer(layer);
        self.cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
        Ok(())
    }

    fn write_out(&self, doc: PdfDocumentReference) -> TicketResult<()> {
        let file =
            File::create(&self.tmp_path).map_err(|source| sink_failure(&self.path, source))?;
        let mut writer = BufWriter::new(file);
        doc.save(&mut writer)
            .map_err(|source| sink_failure(&self.path, source))?;
        let file = writer
            .into_inner()
            .map_err(|source| sink_failure(&self.path, source))?;
        file.sync_all()
            .map_err(|source| sink_failure(&self.path, source))?;
        fs::rename(&self.tmp_path, &self.path)
            .map_err(|source| sink_failure(&self.path, source))?;
        Ok(())
    }
}

impl DocumentSink for PdfFileSink {
    fn text_block(&mut self, text: &str, size_pt: f64) -> TicketResult<()> {
        let line_mm = size_pt * PT_TO_MM * LINE_SPACING;
        self.ensure_room(line_mm)?;
        self.open_doc()?;
        self.cursor_mm -= line_mm;
        self.layer
            .use_text(
                text,
                size_pt as f32,
                Mm(MARGIN_MM as f32),
                Mm(self.cursor_mm as f32),
                &self.font,
            );
        Ok(())
    }

    fn image_block(&mut self, code: &ScannableCode, fit_mm: (f64, f64)) -> TicketResult<()> {
        let fit = fit_mm.0.min(fit_mm.1);
        let px = code.width();
        let mut dpi = px as f64 * 25.4 / fit;
        if dpi < MIN_DPI {
            dpi = MIN_DPI;
        }
        let drawn_mm = px as f64 * 25.4 / dpi;

        self.ensure_room(drawn_mm + IMAGE_GAP_MM)?;
        self.open_doc()?;
        self.cursor_mm -= drawn_mm + IMAGE_GAP_MM;

        let raster = GrayImage::from_raw(px as u32, px as u32, code.pixels().to_vec()).context(
            LocalFault {
                message: format!("Scannable code raster does not match its {}px side", px),
            },
        )?;
        let image = Image::from_dynamic_image(&DynamicImage::ImageLuma8(raster));
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM as f32)),
                translate_y: Some(Mm(self.cursor_mm as f32)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn finish(&mut self) -> TicketResult<()> {
        let doc = self.doc.take().context(LocalFault {
            message: "Document sink already finalized".to_string(),
        })?;
        let result = self.write_out(doc);
        if result.is_err() {
            // All-or-nothing at the final path.
            let _ = fs::remove_file(&self.tmp_path);
        }
        result
    }
}

fn sink_failure<E: std::fmt::Display>(path: &Path, source: E) -> TicketError {
    TicketError::SinkFailure {
        path: path.to_path_buf(),
        message: source.to_string(),
    }
}
