//! Document construction with per-page templates.
//!
//! Pages are decorated according to the [`PageTemplate`] that is active when
//! the page starts. Elements request a different template for the following
//! pages through the shared [`PageLog`], which also records what every
//! physical page ended up as.

use std::cell::RefCell;
use std::rc::Rc;

use genpdf::error::{Error, ErrorKind};
use genpdf::style;
use genpdf::{self, Element, Margins, Mm, PageDecorator, Position, Size};
use log::debug;

use crate::error::CompositionError;
use crate::fonts;
use crate::layout::{PageTemplate, ProposalSection};

/// Record of the templates applied while a document renders.
#[derive(Debug)]
pub struct PageLog {
    current: PageTemplate,
    pending: Option<PageTemplate>,
    pages: Vec<PageTemplate>,
    sections: Vec<(ProposalSection, usize)>,
}

pub type SharedPageLog = Rc<RefCell<PageLog>>;

impl PageLog {
    pub fn new(initial: PageTemplate) -> Self {
        Self {
            current: initial,
            pending: None,
            pages: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn shared(initial: PageTemplate) -> SharedPageLog {
        Rc::new(RefCell::new(Self::new(initial)))
    }

    /// Applies the pending template, if any, and opens a new page.
    ///
    /// A cover lasts a single page: without a new request the page after it
    /// falls back to the content template, even when the cover overflows.
    ///
    /// Returns the 1-based number of the page and its template.
    pub fn begin_page(&mut self) -> (usize, PageTemplate) {
        if let Some(template) = self.pending.take() {
            self.current = template;
        } else if self.current == PageTemplate::Cover && !self.pages.is_empty() {
            self.current = PageTemplate::Content;
        }
        self.pages.push(self.current);
        (self.pages.len(), self.current)
    }

    /// Uses `template` from the next page on.
    pub fn request(&mut self, template: PageTemplate) {
        self.pending = Some(template);
    }

    /// Records that `section` starts on the current page. Repeated marks keep
    /// the first page.
    pub fn mark_section(&mut self, section: ProposalSection) {
        if self.sections.iter().any(|(known, _)| *known == section) {
            return;
        }
        self.sections.push((section, self.pages.len()));
    }

    pub fn current_page(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageTemplate] {
        &self.pages
    }

    pub fn sections(&self) -> &[(ProposalSection, usize)] {
        &self.sections
    }
}

type PageElementFactory = dyn Fn(usize) -> Box<dyn Element>;

/// An element drawn on every page of a template inside a band of fixed height.
pub struct PageBand {
    height: Mm,
    factory: Box<PageElementFactory>,
}

impl PageBand {
    pub fn new<F, E>(height: impl Into<Mm>, factory: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        Self {
            height: height.into(),
            factory: Box::new(move |page| Box::new(factory(page)) as Box<dyn Element>),
        }
    }
}

/// Decoration of cover pages: artwork over the whole page and the position of
/// the flowing cover content.
pub struct CoverSpec {
    artwork: Box<PageElementFactory>,
    content_offset: Mm,
    margins: Margins,
}

impl CoverSpec {
    pub fn new<F, E>(content_offset: impl Into<Mm>, margins: impl Into<Margins>, artwork: F) -> Self
    where
        F: Fn(usize) -> E + 'static,
        E: Element + 'static,
    {
        Self {
            artwork: Box::new(move |page| Box::new(artwork(page)) as Box<dyn Element>),
            content_offset: content_offset.into(),
            margins: margins.into(),
        }
    }
}

/// Builder for `genpdf::Document` instances decorated per page template.
pub struct DocumentBuilder {
    log: SharedPageLog,
    title: Option<String>,
    paper_size: Option<Size>,
    font_size: Option<u8>,
    line_spacing: Option<f64>,
    margins: Option<Margins>,
    cover: Option<CoverSpec>,
    header: Option<PageBand>,
    footer: Option<PageBand>,
}

impl DocumentBuilder {
    pub fn new(log: SharedPageLog) -> Self {
        Self {
            log,
            title: None,
            paper_size: None,
            font_size: None,
            line_spacing: None,
            margins: None,
            cover: None,
            header: None,
            footer: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_paper_size(mut self, paper_size: impl Into<Size>) -> Self {
        self.paper_size = Some(paper_size.into());
        self
    }

    pub fn with_font_size(mut self, font_size: u8) -> Self {
        self.font_size = Some(font_size);
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f64) -> Self {
        self.line_spacing = Some(line_spacing);
        self
    }

    /// Margins of content pages.
    pub fn with_margins(mut self, margins: impl Into<Margins>) -> Self {
        self.margins = Some(margins.into());
        self
    }

    pub fn with_cover(mut self, cover: CoverSpec) -> Self {
        self.cover = Some(cover);
        self
    }

    /// Header band of content pages.
    pub fn with_header(mut self, header: PageBand) -> Self {
        self.header = Some(header);
        self
    }

    /// Footer band of content pages.
    pub fn with_footer(mut self, footer: PageBand) -> Self {
        self.footer = Some(footer);
        self
    }

    /// Builds a `genpdf::Document` using the shared font family.
    pub fn build(self) -> Result<genpdf::Document, CompositionError> {
        let assets = fonts::font_assets()?;
        let font_family = fonts::document_font_family(assets)?;
        debug!("composing with the '{}' font family", assets.family_name);
        let mut document = genpdf::Document::new(font_family);

        if let Some(title) = self.title {
            document.set_title(title);
        }
        if let Some(paper_size) = self.paper_size {
            document.set_paper_size(paper_size);
        }
        if let Some(font_size) = self.font_size {
            document.set_font_size(font_size);
        }
        if let Some(line_spacing) = self.line_spacing {
            document.set_line_spacing(line_spacing);
        }

        document.set_page_decorator(TemplatePageDecorator {
            log: self.log,
            margins: self.margins,
            cover: self.cover,
            header: self.header,
            footer: self.footer,
        });
        Ok(document)
    }
}

struct TemplatePageDecorator {
    log: SharedPageLog,
    margins: Option<Margins>,
    cover: Option<CoverSpec>,
    header: Option<PageBand>,
    footer: Option<PageBand>,
}

impl TemplatePageDecorator {
    fn decorate_cover<'a>(
        &self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
        page: usize,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        let Some(cover) = &self.cover else {
            return Ok(area);
        };

        let mut artwork = (cover.artwork)(page);
        let result = artwork.render(context, area.clone(), style)?;
        if result.has_more {
            return Err(Error::new(
                "Cover artwork does not fit on the page",
                ErrorKind::PageSizeExceeded,
            ));
        }

        area.add_margins(cover.margins);
        area.add_offset(Position::new(0, cover.content_offset));
        Ok(area)
    }

    fn decorate_content<'a>(
        &self,
        context: &genpdf::Context,
        mut area: genpdf::render::Area<'a>,
        style: style::Style,
        page: usize,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        if let Some(margins) = self.margins {
            area.add_margins(margins);
        }

        if let Some(header) = &self.header {
            if header.height > area.size().height {
                return Err(Error::new(
                    "Header height exceeds available space",
                    ErrorKind::InvalidData,
                ));
            }
            let mut header_area = area.clone();
            header_area.set_height(header.height);
            let mut element = (header.factory)(page);
            let result = element.render(context, header_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "Header element does not fit into the reserved space",
                    ErrorKind::PageSizeExceeded,
                ));
            }
            area.add_offset(Position::new(0, header.height));
        }

        if let Some(footer) = &self.footer {
            let available = area.size().height;
            if footer.height > available {
                return Err(Error::new(
                    "Footer height exceeds available space",
                    ErrorKind::InvalidData,
                ));
            }

            let mut footer_area = area.clone();
            footer_area.add_offset(Position::new(0, available - footer.height));
            let mut element = (footer.factory)(page);
            let result = element.render(context, footer_area, style)?;
            if result.has_more {
                return Err(Error::new(
                    "Footer element does not fit into the reserved space",
                    ErrorKind::PageSizeExceeded,
                ));
            }

            area.set_height(available - footer.height);
        }

        Ok(area)
    }
}

impl PageDecorator for TemplatePageDecorator {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        area: genpdf::render::Area<'a>,
        style: style::Style,
    ) -> Result<genpdf::render::Area<'a>, Error> {
        let (page, template) = self.log.borrow_mut().begin_page();
        debug!("decorating page {page} as {template:?}");
        match template {
            PageTemplate::Cover => self.decorate_cover(context, area, style, page),
            PageTemplate::Content => self.decorate_content(context, area, style, page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_template_applies_from_next_page() {
        let mut log = PageLog::new(PageTemplate::Cover);
        assert_eq!(log.begin_page(), (1, PageTemplate::Cover));
        log.request(PageTemplate::Content);
        assert_eq!(log.current_page(), 1);
        assert_eq!(log.begin_page(), (2, PageTemplate::Content));
        assert_eq!(log.begin_page(), (3, PageTemplate::Content));
        assert_eq!(
            log.pages(),
            &[PageTemplate::Cover, PageTemplate::Content, PageTemplate::Content]
        );
    }

    #[test]
    fn cover_overflow_continues_on_a_content_page() {
        let mut log = PageLog::new(PageTemplate::Cover);
        assert_eq!(log.begin_page(), (1, PageTemplate::Cover));
        assert_eq!(log.begin_page(), (2, PageTemplate::Content));
        log.request(PageTemplate::Content);
        assert_eq!(log.begin_page(), (3, PageTemplate::Content));
        assert_eq!(
            log.pages(),
            &[PageTemplate::Cover, PageTemplate::Content, PageTemplate::Content]
        );
    }

    #[test]
    fn sections_keep_their_first_page() {
        let mut log = PageLog::new(PageTemplate::Cover);
        log.begin_page();
        log.mark_section(ProposalSection::Cover);
        log.begin_page();
        log.mark_section(ProposalSection::Company);
        log.begin_page();
        log.mark_section(ProposalSection::Company);
        assert_eq!(
            log.sections(),
            &[(ProposalSection::Cover, 1), (ProposalSection::Company, 2)]
        );
    }
}
