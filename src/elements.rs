//! Element implementations built on top of `genpdf` primitives.
//!
//! Besides the drawing elements this module holds two invisible elements,
//! [`TemplateSwitch`] and [`SectionMarker`], that talk to the page decorator
//! through the shared [`PageLog`](crate::builder::PageLog).

use std::rc::Rc;

use image::DynamicImage;
use log::{debug, warn};

use genpdf::elements::{Image, Paragraph};
use genpdf::error::Error;
use genpdf::style::{Style, StyledString};
use genpdf::{render, Alignment, Element, Position, RenderResult, Scale, Size};

use crate::builder::SharedPageLog;
use crate::imaging::{flatten, mm_from_f64, mm_to_f64, native_size_mm};
use crate::layout::{PageTemplate, ProposalSection};
use crate::style::Rgb;

const FIT_TOLERANCE_MM: f64 = 0.01;
const RULE_INSET_MM: f64 = 1.5;

/// An image shown at a fixed size that never overflows the page.
///
/// When the image does not fit the space left on the page it moves to the next
/// page once. If it is taller than a whole content frame, or still does not
/// fit, it is shrunk uniformly to the available height.
pub struct ProportionalImage {
    image: Image,
    native_mm: (f64, f64),
    width_mm: f64,
    height_mm: f64,
    frame_height_mm: f64,
    deferred: bool,
}

impl ProportionalImage {
    /// Shows `image` at `width_mm` x `height_mm` on pages whose content frame is
    /// `frame_height_mm` tall.
    pub fn new(
        image: DynamicImage,
        width_mm: f64,
        height_mm: f64,
        frame_height_mm: f64,
    ) -> Result<Self, Error> {
        let native_mm = native_size_mm(&image);
        let mut image = Image::from_dynamic_image(flatten(image))?;
        image.set_alignment(Alignment::Center);
        Ok(Self {
            image,
            native_mm,
            width_mm,
            height_mm,
            frame_height_mm,
            deferred: false,
        })
    }

    /// Size of the image before any fitting, in millimetres.
    pub fn requested_size_mm(&self) -> (f64, f64) {
        (self.width_mm, self.height_mm)
    }
}

/// Uniformly shrinks `(width, height)` so it fits into `(max_width, max_height)`.
pub fn fit_within(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    let mut factor: f64 = 1.0;
    if height > max_height + FIT_TOLERANCE_MM && height > 0.0 {
        factor = factor.min(max_height / height);
    }
    if width > max_width + FIT_TOLERANCE_MM && width > 0.0 {
        factor = factor.min(max_width / width);
    }
    (width * factor, height * factor)
}

impl Element for ProportionalImage {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let available_height = mm_to_f64(area.size().height);
        let available_width = mm_to_f64(area.size().width);

        let overflows = self.height_mm > available_height + FIT_TOLERANCE_MM;
        if overflows && !self.deferred && self.height_mm <= self.frame_height_mm + FIT_TOLERANCE_MM
        {
            debug!(
                "deferring {:.1}mm image to the next page ({:.1}mm left)",
                self.height_mm, available_height
            );
            self.deferred = true;
            return Ok(RenderResult {
                size: Size::new(0, 0),
                has_more: true,
            });
        }

        let (width, height) =
            fit_within(self.width_mm, self.height_mm, available_width, available_height);
        if (width, height) != (self.width_mm, self.height_mm) {
            warn!(
                "image of {:.1}x{:.1}mm shrunk to {:.1}x{:.1}mm to fit the page",
                self.width_mm, self.height_mm, width, height
            );
        }

        let (native_width, native_height) = self.native_mm;
        if native_width > 0.0 && native_height > 0.0 {
            self.image
                .set_scale(Scale::new(width / native_width, height / native_height));
        }
        let mut result = self.image.render(context, area, style)?;
        result.size = Size::new(mm_from_f64(width), mm_from_f64(height));
        result.has_more = false;
        Ok(result)
    }
}

/// A horizontal line across the full width of the area.
pub struct HorizontalRule {
    color: Rgb,
    strokes: usize,
    space_before_mm: f64,
    space_after_mm: f64,
}

impl HorizontalRule {
    const STROKE_GAP_MM: f64 = 0.2;

    pub fn new(color: Rgb) -> Self {
        Self {
            color,
            strokes: 1,
            space_before_mm: 0.0,
            space_after_mm: 0.0,
        }
    }

    /// Thickens the rule by stacking `strokes` hairlines.
    pub fn with_strokes(mut self, strokes: usize) -> Self {
        self.strokes = strokes.max(1);
        self
    }

    pub fn with_spacing(mut self, before_mm: f64, after_mm: f64) -> Self {
        self.space_before_mm = before_mm;
        self.space_after_mm = after_mm;
        self
    }

    fn height_mm(&self) -> f64 {
        self.space_before_mm
            + (self.strokes - 1) as f64 * Self::STROKE_GAP_MM
            + self.space_after_mm
    }
}

impl Element for HorizontalRule {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let height = self.height_mm();
        if height > mm_to_f64(area.size().height) {
            return Ok(RenderResult {
                size: Size::new(0, 0),
                has_more: true,
            });
        }

        let width = area.size().width;
        let line_style = Style::new().with_color(self.color.into());
        for stroke in 0..self.strokes {
            let y = mm_from_f64(self.space_before_mm + stroke as f64 * Self::STROKE_GAP_MM);
            area.draw_line(
                vec![Position::new(0, y), Position::new(width, y)],
                line_style,
            );
        }

        Ok(RenderResult {
            size: Size::new(width, mm_from_f64(height)),
            has_more: false,
        })
    }
}

/// Switches the template of the pages started after this point.
pub struct TemplateSwitch {
    log: SharedPageLog,
    template: PageTemplate,
}

impl TemplateSwitch {
    pub fn new(log: SharedPageLog, template: PageTemplate) -> Self {
        Self { log, template }
    }
}

impl Element for TemplateSwitch {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        _area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        self.log.borrow_mut().request(self.template);
        Ok(RenderResult::default())
    }
}

/// Records the page a proposal section starts on.
pub struct SectionMarker {
    log: SharedPageLog,
    section: ProposalSection,
}

impl SectionMarker {
    pub fn new(log: SharedPageLog, section: ProposalSection) -> Self {
        Self { log, section }
    }
}

impl Element for SectionMarker {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        _area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        self.log.borrow_mut().mark_section(self.section);
        Ok(RenderResult::default())
    }
}

/// A line of text placed at a fixed distance from the top of the cover.
#[derive(Clone)]
pub struct CoverLine {
    pub offset_mm: f64,
    pub text: StyledString,
}

/// Full-bleed cover background with centered brand lines on top.
pub struct CoverArt {
    background: Rc<DynamicImage>,
    width_mm: f64,
    height_mm: f64,
    lines: Vec<CoverLine>,
}

impl CoverArt {
    /// Stretches `background` over a `width_mm` x `height_mm` page.
    pub fn new(
        background: Rc<DynamicImage>,
        width_mm: f64,
        height_mm: f64,
        lines: Vec<CoverLine>,
    ) -> Self {
        Self {
            background,
            width_mm,
            height_mm,
            lines,
        }
    }
}

impl Element for CoverArt {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let (native_width, native_height) = native_size_mm(&self.background);
        let mut image = Image::from_dynamic_image(flatten(self.background.as_ref().clone()))?;
        image.set_alignment(Alignment::Left);
        if native_width > 0.0 && native_height > 0.0 {
            image.set_scale(Scale::new(
                self.width_mm / native_width,
                self.height_mm / native_height,
            ));
        }
        image.render(context, area.clone(), style)?;

        for line in &self.lines {
            let mut line_area = area.clone();
            line_area.add_offset(Position::new(0, mm_from_f64(line.offset_mm)));
            let mut paragraph = Paragraph::default();
            paragraph.push(line.text.clone());
            paragraph.set_alignment(Alignment::Center);
            paragraph.render(context, line_area, style)?;
        }

        Ok(RenderResult {
            size: area.size(),
            has_more: false,
        })
    }
}

/// Top band of content pages: brand mark on the left, document title on the
/// right and an accent rule along the bottom edge.
pub struct BrandHeader {
    logo: Option<Rc<DynamicImage>>,
    logo_height_mm: f64,
    brand: StyledString,
    title: StyledString,
    rule_color: Rgb,
}

impl BrandHeader {
    pub fn new(
        logo: Option<Rc<DynamicImage>>,
        logo_height_mm: f64,
        brand: StyledString,
        title: StyledString,
        rule_color: Rgb,
    ) -> Self {
        Self {
            logo,
            logo_height_mm,
            brand,
            title,
            rule_color,
        }
    }
}

impl Element for BrandHeader {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        match &self.logo {
            Some(logo) => {
                let (native_width, native_height) = native_size_mm(logo);
                let mut image = Image::from_dynamic_image(flatten(logo.as_ref().clone()))?;
                image.set_alignment(Alignment::Left);
                if native_height > 0.0 && native_width > 0.0 {
                    let scale = self.logo_height_mm / native_height;
                    image.set_scale(Scale::new(scale, scale));
                }
                image.render(context, area.clone(), style)?;
            }
            None => {
                let mut brand = Paragraph::default();
                brand.push(self.brand.clone());
                brand.render(context, area.clone(), style)?;
            }
        }

        let mut title = Paragraph::default();
        title.push(self.title.clone());
        title.set_alignment(Alignment::Right);
        title.render(context, area.clone(), style)?;

        let height = area.size().height;
        let rule_y = height - mm_from_f64(RULE_INSET_MM);
        area.draw_line(
            vec![
                Position::new(0, rule_y),
                Position::new(area.size().width, rule_y),
            ],
            Style::new().with_color(self.rule_color.into()),
        );

        Ok(RenderResult {
            size: area.size(),
            has_more: false,
        })
    }
}

/// Bottom band of content pages: a rule with the brand line and page number
/// underneath.
pub struct BrandFooter {
    page_label: StyledString,
    brand_line: StyledString,
    rule_color: Rgb,
}

impl BrandFooter {
    pub fn new(page_label: StyledString, brand_line: StyledString, rule_color: Rgb) -> Self {
        Self {
            page_label,
            brand_line,
            rule_color,
        }
    }
}

impl Element for BrandFooter {
    fn render(
        &mut self,
        context: &genpdf::Context,
        area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let rule_y = mm_from_f64(RULE_INSET_MM);
        area.draw_line(
            vec![
                Position::new(0, rule_y),
                Position::new(area.size().width, rule_y),
            ],
            Style::new().with_color(self.rule_color.into()),
        );

        let mut text_area = area.clone();
        text_area.add_offset(Position::new(0, mm_from_f64(2.0 * RULE_INSET_MM)));

        let mut brand = Paragraph::default();
        brand.push(self.brand_line.clone());
        let brand_result = brand.render(context, text_area.clone(), style)?;

        let mut page = Paragraph::default();
        page.push(self.page_label.clone());
        page.set_alignment(Alignment::Right);
        let page_result = page.render(context, text_area, style)?;

        Ok(RenderResult {
            size: area.size(),
            has_more: brand_result.has_more || page_result.has_more,
        })
    }
}

/// Fixed vertical space. At the bottom of a page it only takes what is left.
pub struct VerticalSpace {
    height_mm: f64,
}

impl VerticalSpace {
    pub fn new(height_mm: f64) -> Self {
        Self { height_mm }
    }
}

impl Element for VerticalSpace {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let height = self.height_mm.min(mm_to_f64(area.size().height)).max(0.0);
        Ok(RenderResult {
            size: Size::new(0, mm_from_f64(height)),
            has_more: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitting_keeps_images_that_fit() {
        assert_eq!(fit_within(160.0, 80.0, 170.0, 200.0), (160.0, 80.0));
    }

    #[test]
    fn fitting_shrinks_uniformly() {
        let (w, h) = fit_within(160.0, 320.0, 170.0, 160.0);
        assert!((h - 160.0).abs() < 1e-9);
        assert!((w - 80.0).abs() < 1e-9);
        assert!((w / h - 0.5).abs() < 1e-9);

        let (w, h) = fit_within(200.0, 100.0, 170.0, 245.0);
        assert!((w - 170.0).abs() < 1e-9);
        assert!((h - 85.0).abs() < 1e-9);
    }

    #[test]
    fn rule_height_includes_strokes_and_spacing() {
        let rule = HorizontalRule::new(Rgb::WHITE)
            .with_strokes(3)
            .with_spacing(1.0, 2.0);
        assert!((rule.height_mm() - 3.4).abs() < 1e-9);
    }

    #[test]
    fn proportional_image_reports_requested_size() {
        let image = DynamicImage::new_rgba8(1800, 900);
        let element = ProportionalImage::new(image, 160.0, 80.0, 245.0).unwrap();
        assert_eq!(element.requested_size_mm(), (160.0, 80.0));
        let (w, h) = element.native_mm;
        assert!((w - 152.4).abs() < 1e-9 && (h - 76.2).abs() < 1e-9);
    }
}
