//! Watermark overlay for downloaded documents.
//!
//! # Layers
//!
//! Every page receives the same three layers, drawn on top of the existing
//! content in this order:
//! 1. a red diagonal headline `CONFIDENTIAL - {label} - Downloaded: {timestamp}`
//!    (Helvetica-Bold 24, 30% opacity, rotated -45° about its anchor)
//! 2. four gray `CONFIDENTIAL` corner stamps (Helvetica 10, unrotated)
//! 3. a faint light-gray `DOWNLOAD COPY` (Helvetica-Bold 72, 10% opacity,
//!    rotated -45°, anchored 100pt above the vertical center)
//!
//! # Coordinate System
//!
//! Positions use PDF user space with the origin at the lower-left corner of
//! the page's media box; X grows to the right and Y grows upward. Only the
//! media box width and height influence the layout.
//!
//! The transform works on an in-memory copy of the document. Any failure
//! drops that copy, so callers get either a fully watermarked document or an
//! error, never a partially stamped one.

use chrono::Local;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info};

use super::font::StandardFont;
use super::page;
use crate::error::{Error, Result};

// =============================================================================
// Layout Constants
// =============================================================================

/// Text of the four corner stamps.
pub const CORNER_TEXT: &str = "CONFIDENTIAL";

/// Text of the faint oversized central stamp.
pub const CENTER_TEXT: &str = "DOWNLOAD COPY";

/// `strftime` pattern of the download timestamp (`yyyy-MM-dd HH:mm:ss`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HEADLINE_FONT_SIZE: f32 = 24.0;
const CORNER_FONT_SIZE: f32 = 10.0;
const CENTER_FONT_SIZE: f32 = 72.0;

/// Rotation of the diagonal stamps, clockwise from horizontal.
const DIAGONAL_DEGREES: f32 = -45.0;

/// Horizontal distance of corner stamps from the left/right page edge.
const CORNER_MARGIN: f32 = 20.0;
/// Baseline offset of the top corner stamps below the top edge.
const CORNER_TOP_OFFSET: f32 = 30.0;
/// Baseline of the bottom corner stamps above the bottom edge.
const CORNER_BOTTOM_Y: f32 = 20.0;
/// How far the central stamp sits above the vertical center.
const CENTER_RAISE: f32 = 100.0;

// Resource names; suffixed automatically if a page already uses them
const BOLD_FONT_RESOURCE: &str = "WmF1";
const REGULAR_FONT_RESOURCE: &str = "WmF2";
const PRIMARY_ALPHA_RESOURCE: &str = "WmGs1";
const FAINT_ALPHA_RESOURCE: &str = "WmGs2";

// =============================================================================
// Public Types
// =============================================================================

/// Fill color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const RED: Self = Self::new(1.0, 0.0, 0.0);
    pub const GRAY: Self = Self::new(0.5, 0.5, 0.5);
    pub const LIGHT_GRAY: Self = Self::new(0.75, 0.75, 0.75);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Fill transparency level of a stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transparency {
    /// 30% opacity: headline and corner stamps
    Primary,
    /// 10% opacity: central stamp
    Faint,
}

impl Transparency {
    /// Fill alpha (`/ca`) of this level.
    pub const fn alpha(self) -> f32 {
        match self {
            Self::Primary => 0.3,
            Self::Faint => 0.1,
        }
    }
}

/// Text of one watermark pass. Computed once per call and shared by all pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    headline: String,
}

impl WatermarkSpec {
    /// Build the spec for a label and an already formatted timestamp.
    pub fn new(label: &str, timestamp: &str) -> Self {
        Self {
            headline: format!("CONFIDENTIAL - {label} - Downloaded: {timestamp}"),
        }
    }

    /// Build the spec stamped with the current local time.
    pub fn now(label: &str) -> Self {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::new(label, &timestamp)
    }

    /// The diagonal headline text.
    pub fn headline(&self) -> &str {
        &self.headline
    }
}

/// One positioned piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStamp {
    pub text: String,
    pub font: StandardFont,
    pub font_size: f32,
    /// Anchor (start of baseline) in user space
    pub x: f32,
    pub y: f32,
    /// Rotation about the anchor in degrees; `0.0` means unrotated
    pub rotation: f32,
    pub fill: Rgb,
    pub transparency: Transparency,
}

impl TextStamp {
    fn measured(
        text: &str,
        font: StandardFont,
        font_size: f32,
        fill: Rgb,
        transparency: Transparency,
    ) -> Result<(Self, f32)> {
        let width = font.string_width(text, font_size)?;
        let stamp = Self {
            text: text.to_string(),
            font,
            font_size,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            fill,
            transparency,
        };
        Ok((stamp, width))
    }

    const fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    const fn rotated(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self
    }
}

/// Geometry of all stamps for a page of a given size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub headline: TextStamp,
    /// Top-left, top-right, bottom-left, bottom-right
    pub corners: [TextStamp; 4],
    pub center: TextStamp,
}

impl PageLayout {
    /// Compute the stamp positions for a page of `width` × `height` points.
    pub fn compute(spec: &WatermarkSpec, width: f32, height: f32) -> Result<Self> {
        let (headline, headline_width) = TextStamp::measured(
            spec.headline(),
            StandardFont::HelveticaBold,
            HEADLINE_FONT_SIZE,
            Rgb::RED,
            Transparency::Primary,
        )?;
        let headline = headline
            .at((width - headline_width) / 2.0, height / 2.0)
            .rotated(DIAGONAL_DEGREES);

        let (corner, corner_width) = TextStamp::measured(
            CORNER_TEXT,
            StandardFont::Helvetica,
            CORNER_FONT_SIZE,
            Rgb::GRAY,
            Transparency::Primary,
        )?;
        let left = CORNER_MARGIN;
        let right = width - corner_width - CORNER_MARGIN;
        let top = height - CORNER_TOP_OFFSET;
        let bottom = CORNER_BOTTOM_Y;
        let corners = [
            corner.clone().at(left, top),
            corner.clone().at(right, top),
            corner.clone().at(left, bottom),
            corner.at(right, bottom),
        ];

        let (center, center_width) = TextStamp::measured(
            CENTER_TEXT,
            StandardFont::HelveticaBold,
            CENTER_FONT_SIZE,
            Rgb::LIGHT_GRAY,
            Transparency::Faint,
        )?;
        let center = center
            .at((width - center_width) / 2.0, height / 2.0 - CENTER_RAISE)
            .rotated(DIAGONAL_DEGREES);

        Ok(Self {
            headline,
            corners,
            center,
        })
    }

    /// Stamps in drawing order.
    pub fn stamps(&self) -> impl Iterator<Item = &TextStamp> {
        std::iter::once(&self.headline)
            .chain(self.corners.iter())
            .chain(std::iter::once(&self.center))
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Font and graphics-state objects added once per document.
struct SharedResources {
    bold_font: ObjectId,
    regular_font: ObjectId,
    primary_alpha: ObjectId,
    faint_alpha: ObjectId,
}

impl SharedResources {
    fn add_to(doc: &mut Document) -> Self {
        let alpha_state = |alpha: f32| {
            Dictionary::from_iter([
                ("Type", Object::Name(b"ExtGState".to_vec())),
                ("ca", Object::Real(alpha)),
            ])
        };

        Self {
            bold_font: doc.add_object(StandardFont::HelveticaBold.dictionary()),
            regular_font: doc.add_object(StandardFont::Helvetica.dictionary()),
            primary_alpha: doc.add_object(alpha_state(Transparency::Primary.alpha())),
            faint_alpha: doc.add_object(alpha_state(Transparency::Faint.alpha())),
        }
    }

    /// Register the shared objects on one page, returning the names to use there.
    fn register(&self, doc: &mut Document, page_id: ObjectId) -> Result<PageResourceNames> {
        let fonts = page::register_resources(
            doc,
            page_id,
            "Font",
            &[
                (BOLD_FONT_RESOURCE, self.bold_font),
                (REGULAR_FONT_RESOURCE, self.regular_font),
            ],
        )?;
        let states = page::register_resources(
            doc,
            page_id,
            "ExtGState",
            &[
                (PRIMARY_ALPHA_RESOURCE, self.primary_alpha),
                (FAINT_ALPHA_RESOURCE, self.faint_alpha),
            ],
        )?;

        match (fonts.as_slice(), states.as_slice()) {
            ([bold, regular], [primary, faint]) => Ok(PageResourceNames {
                bold_font: bold.clone(),
                regular_font: regular.clone(),
                primary_alpha: primary.clone(),
                faint_alpha: faint.clone(),
            }),
            _ => Err(Error::RenderFailure(
                "resource registration returned unexpected names".to_string(),
            )),
        }
    }
}

/// Resource names valid on one particular page.
struct PageResourceNames {
    bold_font: String,
    regular_font: String,
    primary_alpha: String,
    faint_alpha: String,
}

impl PageResourceNames {
    fn font(&self, font: StandardFont) -> &str {
        match font {
            StandardFont::HelveticaBold => &self.bold_font,
            StandardFont::Helvetica => &self.regular_font,
        }
    }

    fn alpha(&self, transparency: Transparency) -> &str {
        match transparency {
            Transparency::Primary => &self.primary_alpha,
            Transparency::Faint => &self.faint_alpha,
        }
    }
}

// =============================================================================
// Page Canvas
// =============================================================================

/// Append-only drawing surface for one page.
///
/// Opening the canvas closes the `q` that wraps the original content and
/// starts a fresh graphics state; `close` restores it and encodes the
/// operations into content-stream bytes.
pub struct PageCanvas {
    pub width: f32,
    pub height: f32,
    operations: Vec<Operation>,
    transparency: Option<Transparency>,
    fill: Option<Rgb>,
}

impl PageCanvas {
    /// Open a canvas for a page with the given media box.
    pub fn open(media_box: [f32; 4]) -> Self {
        let mut operations = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];

        // Move the origin to the media box corner so layouts are box-relative
        let (origin_x, origin_y) = (media_box[0], media_box[1]);
        if origin_x != 0.0 || origin_y != 0.0 {
            operations.push(Operation::new(
                "cm",
                reals(&[1.0, 0.0, 0.0, 1.0, origin_x, origin_y]),
            ));
        }

        Self {
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
            operations,
            transparency: None,
            fill: None,
        }
    }

    fn draw(&mut self, stamp: &TextStamp, names: &PageResourceNames) -> Result<()> {
        let encoded = stamp.font.encode(&stamp.text)?;

        if self.transparency != Some(stamp.transparency) {
            self.operations.push(Operation::new(
                "gs",
                vec![Object::Name(names.alpha(stamp.transparency).as_bytes().to_vec())],
            ));
            self.transparency = Some(stamp.transparency);
        }

        if self.fill != Some(stamp.fill) {
            self.operations.push(Operation::new(
                "rg",
                reals(&[stamp.fill.r, stamp.fill.g, stamp.fill.b]),
            ));
            self.fill = Some(stamp.fill);
        }

        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(names.font(stamp.font).as_bytes().to_vec()),
                Object::Real(stamp.font_size),
            ],
        ));

        if stamp.rotation == 0.0 {
            self.operations
                .push(Operation::new("Td", reals(&[stamp.x, stamp.y])));
        } else {
            let (sin, cos) = stamp.rotation.to_radians().sin_cos();
            self.operations.push(Operation::new(
                "Tm",
                reals(&[cos, sin, -sin, cos, stamp.x, stamp.y]),
            ));
        }

        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Literal)],
        ));
        self.operations.push(Operation::new("ET", vec![]));

        Ok(())
    }

    /// Finish drawing and encode the content stream.
    fn close(mut self) -> Result<Vec<u8>> {
        self.operations.push(Operation::new("Q", vec![]));
        Content {
            operations: self.operations,
        }
        .encode()
        .map_err(|e| Error::RenderFailure(format!("Failed to encode content stream: {e}")))
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().copied().map(Object::Real).collect()
}

// =============================================================================
// Engine
// =============================================================================

/// Watermark every page of `source`, stamped with the current local time.
///
/// Returns a new byte buffer; `source` is never modified.
pub fn apply_watermark(source: &[u8], label: &str) -> Result<Vec<u8>> {
    apply_watermark_with(source, &WatermarkSpec::now(label))
}

/// Watermark every page using a caller supplied timestamp string.
pub fn apply_watermark_at(source: &[u8], label: &str, timestamp: &str) -> Result<Vec<u8>> {
    apply_watermark_with(source, &WatermarkSpec::new(label, timestamp))
}

/// Watermark every page with a prepared spec.
pub fn apply_watermark_with(source: &[u8], spec: &WatermarkSpec) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(source)
        .map_err(|e| Error::InvalidDocument(format!("Failed to parse PDF: {e}")))?;

    // Saving would write the decrypted objects and drop the owner's permissions
    if super::document::is_protected(&doc) {
        return Err(Error::InvalidDocument(
            "encrypted documents are not supported".to_string(),
        ));
    }

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    if pages.is_empty() {
        return Err(Error::InvalidDocument("document has no pages".to_string()));
    }

    let shared = SharedResources::add_to(&mut doc);

    for (index, &page_id) in pages.iter().enumerate() {
        watermark_page(&mut doc, page_id, spec, &shared).map_err(|e| {
            debug!("Watermarking page {} failed: {}", index + 1, e);
            e
        })?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::RenderFailure(format!("Failed to save PDF: {e}")))?;

    info!(
        "Watermarked {} page(s), {} -> {} bytes",
        pages.len(),
        source.len(),
        output.len()
    );

    Ok(output)
}

fn watermark_page(
    doc: &mut Document,
    page_id: ObjectId,
    spec: &WatermarkSpec,
    shared: &SharedResources,
) -> Result<()> {
    let mut canvas = PageCanvas::open(page::media_box(doc, page_id));
    let layout = PageLayout::compute(spec, canvas.width, canvas.height)?;

    let names = shared.register(doc, page_id)?;
    for stamp in layout.stamps() {
        canvas.draw(stamp, &names)?;
    }

    debug!(
        "Page {:?}: {}x{} headline at ({:.2}, {:.2})",
        page_id, canvas.width, canvas.height, layout.headline.x, layout.headline.y
    );

    let content = canvas.close()?;
    page::append_isolated_content(doc, page_id, content)
}

// =============================================================================
// Tests
// =============================================================================
