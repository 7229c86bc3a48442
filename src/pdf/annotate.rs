//! Highlight and bookmark annotation of matched pages.
//!
//! Extraction yields no glyph coordinates, so matches are marked at page
//! granularity: a yellow margin band per matched keyword carrying the snippet
//! in its popup note, plus a bookmark per (page, keyword) so readers can jump
//! straight to matches from the outline.

use anyhow::{Context, Result};
use lopdf::{Bookmark, Document, Object, dictionary};
use std::path::Path;
use tracing::debug;

/// One annotation to apply: a matched keyword on a page.
#[derive(Debug, Clone)]
pub struct PageAnnotation {
    pub page_number: u32,
    pub keyword: String,
    pub snippet: String,
}

/// Width of the highlight band along the page's left edge.
const BAND_WIDTH: f32 = 14.0;
/// Vertical step between bands when a page has several matched keywords.
const BAND_STEP: f32 = 26.0;

/// Writes an annotated copy of `source` to `dest` with one highlight band and
/// one bookmark per (page, keyword) match. The source file is not modified.
pub fn annotate_pdf(source: &Path, dest: &Path, annotations: &[PageAnnotation]) -> Result<()> {
    let mut doc = Document::load(source)
        .with_context(|| format!("Failed to load PDF: {}", source.display()))?;

    let pages = doc.get_pages();

    for (index, annotation) in annotations.iter().enumerate() {
        let Some(&page_id) = pages.get(&annotation.page_number) else {
            debug!(
                "Annotation references missing page {} in {}",
                annotation.page_number,
                source.display()
            );
            continue;
        };

        let media_top = page_media_top(&doc, page_id).unwrap_or(792.0);

        #[allow(clippy::cast_precision_loss)]
        let slot = (index % 24) as f32;
        let top = media_top - 20.0 - slot * BAND_STEP;
        let bottom = top - BAND_STEP + 6.0;

        let note = format!("{}: {}", annotation.keyword, annotation.snippet);
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Square",
            "Rect" => vec![
                Object::Real(6.0),
                Object::Real(bottom),
                Object::Real(6.0 + BAND_WIDTH),
                Object::Real(top),
            ],
            "C" => vec![Object::Real(1.0), Object::Real(0.85), Object::Real(0.1)],
            "IC" => vec![Object::Real(1.0), Object::Real(0.92), Object::Real(0.35)],
            "T" => Object::string_literal(annotation.keyword.clone()),
            "Contents" => Object::string_literal(note),
            // Print flag so bands survive into printed copies.
            "F" => 4,
        });

        push_page_annotation(&mut doc, page_id, annot_id.into())?;

        doc.add_bookmark(
            Bookmark::new(
                format!("{} (p. {})", annotation.keyword, annotation.page_number),
                [0.85, 0.4, 0.0],
                0,
                page_id,
            ),
            None,
        );
    }

    attach_outline(&mut doc)?;

    doc.save(dest)
        .with_context(|| format!("Failed to save annotated PDF: {}", dest.display()))?;

    Ok(())
}

fn page_media_top(doc: &Document, page_id: lopdf::ObjectId) -> Option<f32> {
    let page = doc.get_object(page_id).ok()?.as_dict().ok()?;
    let media_box = page.get(b"MediaBox").ok()?.as_array().ok()?;
    let top = media_box.get(3)?;
    match top {
        Object::Integer(v) => {
            #[allow(clippy::cast_precision_loss)]
            Some(*v as f32)
        }
        Object::Real(v) => Some(*v),
        _ => None,
    }
}

fn push_page_annotation(
    doc: &mut Document,
    page_id: lopdf::ObjectId,
    annot_ref: Object,
) -> Result<()> {
    let page = doc
        .get_object_mut(page_id)
        .context("Page object missing")?
        .as_dict_mut()
        .map_err(|e| anyhow::anyhow!("Page is not a dictionary: {e}"))?;

    match page.get_mut(b"Annots") {
        Ok(Object::Array(annots)) => annots.push(annot_ref),
        _ => page.set("Annots", vec![annot_ref]),
    }

    Ok(())
}

fn attach_outline(doc: &mut Document) -> Result<()> {
    doc.adjust_zero_pages();

    if let Some(outline_id) = doc.build_outline() {
        let root_id = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| anyhow::anyhow!("Missing document catalog: {e}"))?;

        let catalog = doc
            .get_object_mut(root_id)
            .context("Catalog object missing")?
            .as_dict_mut()
            .map_err(|e| anyhow::anyhow!("Catalog is not a dictionary: {e}"))?;

        catalog.set("Outlines", Object::Reference(outline_id));
    }

    Ok(())
}
