//! Assembles the proposal PDF.
//!
//! Composition happens in two steps. [`DocumentComposer::plan`] turns the input
//! into a list of [`LayoutOp`]s without touching fonts or files, then
//! [`DocumentComposer::render`] lowers those instructions onto a `genpdf`
//! document and writes it out.

use std::path::Path;
use std::rc::Rc;

use genpdf::elements::{FrameCellDecorator, PageBreak, Paragraph, TableLayout, UnorderedList};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Element, Margins, Size};
use image::DynamicImage;
use log::{debug, warn};

use crate::builder::{CoverSpec, DocumentBuilder, PageBand, PageLog, SharedPageLog};
use crate::config::{AssetSource, BrandAssets, CompanyProfile, ProposalConfig};
use crate::elements::{
    BrandFooter, BrandHeader, CoverArt, CoverLine, HorizontalRule, ProportionalImage,
    SectionMarker, TemplateSwitch, VerticalSpace,
};
use crate::error::CompositionError;
use crate::format::{format_currency_br, format_power_kwp, ordinal};
use crate::imaging::{
    cover_gradient, decode_image_from_path, embedded_height, load_asset, mm_from_f64,
    DimensionProbe, ImageHeaderProbe,
};
use crate::layout::{
    ImageBlock, InvestmentLine, InvestmentTable, LayoutOp, PageTemplate, ProposalSection,
    RichParagraph,
};
use crate::metrics::{module_watts, system_power_kwp};
use crate::model::{DerivedMetrics, ProposalInput, RenderedArtifact};
use crate::richtext::{escape, parse_markup};
use crate::style::{BrandPalette, PageLayout};

const CLIENT_LABEL: &str = "CLIENTE:";
const HEADING_ABOUT: &str = "QUEM SOMOS?";
const HEADING_SYSTEM: &str = "FUNCIONAMENTO DO SISTEMA FOTOVOLTAICO";
const HEADING_ITEMS: &str = "DESCRIÇÃO DOS ITENS:";
const HEADING_WARRANTY: &str = "GARANTIA";
const HEADING_INVESTMENT: &str = "INVESTIMENTO";
const HEADING_PAYMENT: &str = "FORMAS DE PAGAMENTO";
const HEADING_COST_BENEFIT: &str = "CUSTO X BENEFÍCIO";
const HEADING_PAYBACK: &str = "RETORNO DO INVESTIMENTO";

const GRADIENT_SIZE_PX: (u32, u32) = (420, 594);

/// What the composer produced besides the PDF file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositionReport {
    /// Template of every physical page, in page order.
    pub pages: Vec<PageTemplate>,
    /// First page (1-based) of every section that was laid out.
    pub section_pages: Vec<(ProposalSection, usize)>,
}

impl CompositionReport {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn section_page(&self, section: ProposalSection) -> Option<usize> {
        self.section_pages
            .iter()
            .find(|(known, _)| *known == section)
            .map(|(_, page)| *page)
    }
}

/// The two rasters embedded in the results section.
#[derive(Clone, Copy, Debug)]
pub struct Artifacts<'a> {
    pub chart: &'a RenderedArtifact,
    pub table: &'a RenderedArtifact,
}

/// Lays out proposals with one brand configuration.
pub struct DocumentComposer<'a, P = ImageHeaderProbe> {
    palette: &'a BrandPalette,
    layout: &'a PageLayout,
    company: &'a CompanyProfile,
    assets: &'a BrandAssets,
    probe: P,
}

impl<'a> DocumentComposer<'a> {
    pub fn new(config: &'a ProposalConfig) -> Self {
        Self {
            palette: &config.palette,
            layout: &config.page,
            company: &config.company,
            assets: &config.assets,
            probe: ImageHeaderProbe,
        }
    }
}

impl<'a, P: DimensionProbe> DocumentComposer<'a, P> {
    /// Replaces the way image proportions are read.
    pub fn with_probe<Q: DimensionProbe>(self, probe: Q) -> DocumentComposer<'a, Q> {
        DocumentComposer {
            palette: self.palette,
            layout: self.layout,
            company: self.company,
            assets: self.assets,
            probe,
        }
    }

    /// Plans and renders the proposal to `output`.
    pub fn compose(
        &self,
        input: &ProposalInput,
        metrics: &DerivedMetrics,
        artifacts: Artifacts<'_>,
        output: &Path,
    ) -> Result<CompositionReport, CompositionError> {
        let ops = self.plan(input, metrics, artifacts);
        debug!("planned {} layout instructions", ops.len());
        self.render(&ops, &document_title(self.company, input), output)
    }

    /// Describes the whole proposal as layout instructions.
    pub fn plan(
        &self,
        input: &ProposalInput,
        metrics: &DerivedMetrics,
        artifacts: Artifacts<'_>,
    ) -> Vec<LayoutOp> {
        let company = self.company;
        let mut ops = vec![
            LayoutOp::UseTemplate(PageTemplate::Cover),
            LayoutOp::Section(ProposalSection::Cover),
            LayoutOp::CoverClient {
                label: CLIENT_LABEL.to_owned(),
                name: input.client_name.to_uppercase(),
            },
        ];

        new_content_page(&mut ops, ProposalSection::Company);
        ops.extend([
            LayoutOp::Heading(HEADING_ABOUT.to_owned()),
            LayoutOp::Paragraph(RichParagraph::new(&company.about)),
            LayoutOp::Spacer(5.0),
            LayoutOp::Heading(HEADING_SYSTEM.to_owned()),
            LayoutOp::Paragraph(RichParagraph::new(&company.system_overview)),
            LayoutOp::Spacer(5.0),
            LayoutOp::Heading(HEADING_ITEMS.to_owned()),
            LayoutOp::Bullets(equipment_lines(input)),
            LayoutOp::Spacer(5.0),
            LayoutOp::Heading(HEADING_WARRANTY.to_owned()),
            LayoutOp::Paragraph(RichParagraph::new(&company.warranty_intro)),
            LayoutOp::Bullets(bullets(&company.warranty_terms)),
        ]);

        new_content_page(&mut ops, ProposalSection::Financial);
        ops.extend([
            LayoutOp::Heading(HEADING_INVESTMENT.to_owned()),
            LayoutOp::Investment(investment_table(input, metrics)),
            LayoutOp::Spacer(10.0),
            LayoutOp::Heading(HEADING_PAYMENT.to_owned()),
            LayoutOp::Paragraph(RichParagraph::new(&company.payment_intro)),
            LayoutOp::Bullets(bullets(&company.payment_options)),
        ]);

        new_content_page(&mut ops, ProposalSection::Results);
        ops.extend([
            LayoutOp::Heading(HEADING_COST_BENEFIT.to_owned()),
            LayoutOp::Paragraph(RichParagraph::new(&company.cost_benefit)),
            LayoutOp::Image(ImageBlock {
                name: "production chart",
                path: artifacts.chart.path.clone(),
                target_width_mm: self.layout.chart_width_mm,
                fallback_height_mm: self.layout.chart_width_mm / 2.0,
            }),
            LayoutOp::Spacer(5.0),
            LayoutOp::Heading(HEADING_PAYBACK.to_owned()),
        ]);
        let accent = self.palette.accent.to_hex();
        if let (Some(year), Some(value)) = (metrics.payback_year, metrics.payback_value) {
            ops.push(LayoutOp::Highlight(RichParagraph::new(format!(
                "**Lucro a partir do {} ano:** Retorno acumulado de [color={accent}]{{**{}**}}",
                ordinal(year),
                format_currency_br(value)
            ))));
        }
        ops.push(LayoutOp::Highlight(RichParagraph::new(format!(
            "**Retorno em 25 anos:** Economia acumulada de [color={accent}]{{**{}**}}",
            format_currency_br(metrics.cumulative_savings_25y)
        ))));
        ops.extend([
            LayoutOp::Spacer(3.0),
            LayoutOp::Image(ImageBlock {
                name: "payback table",
                path: artifacts.table.path.clone(),
                target_width_mm: self.layout.table_width_mm,
                fallback_height_mm: self.layout.table_fallback_height_mm,
            }),
        ]);

        ops
    }

    /// Lowers `ops` onto a `genpdf` document written to `output`.
    ///
    /// The stream must open with [`LayoutOp::UseTemplate`], which decides the
    /// template of the first page.
    pub fn render(
        &self,
        ops: &[LayoutOp],
        title: &str,
        output: &Path,
    ) -> Result<CompositionReport, CompositionError> {
        let initial = match ops.first() {
            Some(LayoutOp::UseTemplate(template)) => *template,
            _ => {
                return Err(CompositionError::Layout(
                    "layout must open with a page template".to_owned(),
                ))
            }
        };

        let log = PageLog::shared(initial);
        let mut document = self.document_builder(Rc::clone(&log), title)?.build()?;
        for op in &ops[1..] {
            self.push_op(&mut document, op, &log)?;
        }
        document.render_to_file(output)?;

        let log = log.borrow();
        let report = CompositionReport {
            pages: log.pages().to_vec(),
            section_pages: log.sections().to_vec(),
        };
        debug!(
            "composed {} pages into {}",
            report.page_count(),
            output.display()
        );
        Ok(report)
    }

    fn document_builder(
        &self,
        log: SharedPageLog,
        title: &str,
    ) -> Result<DocumentBuilder, CompositionError> {
        let layout = self.layout;
        let palette = *self.palette;
        let margin = mm_from_f64(layout.margin_mm);

        let background = Rc::new(self.cover_background()?);
        let cover_lines = self.cover_lines();
        let (page_width, page_height) = (layout.page_width_mm, layout.page_height_mm);
        let cover = CoverSpec::new(
            mm_from_f64(layout.cover_client_offset_mm),
            Margins::trbl(0, margin, 0, margin),
            move |_| {
                CoverArt::new(
                    Rc::clone(&background),
                    page_width,
                    page_height,
                    cover_lines.clone(),
                )
            },
        );

        let logo = self.logo()?.map(Rc::new);
        let logo_height = layout.logo_height_mm;
        let brand = StyledString::new(
            self.company.brand_name.clone(),
            Style::new()
                .bold()
                .with_font_size(14)
                .with_color(palette.primary.into()),
        );
        let header_title = StyledString::new(
            self.company.document_title.clone(),
            Style::new()
                .bold()
                .with_font_size(9)
                .with_color(palette.neutral.into()),
        );
        let header = PageBand::new(mm_from_f64(layout.header_height_mm), move |_| {
            BrandHeader::new(
                logo.clone(),
                logo_height,
                brand.clone(),
                header_title.clone(),
                palette.accent,
            )
        });

        let footer_style = Style::new()
            .with_font_size(8)
            .with_color(palette.neutral.into());
        let footer_line = self.company.footer_line.clone();
        let footer = PageBand::new(mm_from_f64(layout.footer_height_mm), move |page| {
            BrandFooter::new(
                StyledString::new(format!("Página {page}"), footer_style),
                StyledString::new(footer_line.clone(), footer_style),
                palette.neutral,
            )
        });

        Ok(DocumentBuilder::new(log)
            .with_title(title)
            .with_paper_size(Size::new(
                mm_from_f64(layout.page_width_mm),
                mm_from_f64(layout.page_height_mm),
            ))
            .with_font_size(layout.body_font_size)
            .with_line_spacing(layout.line_spacing)
            .with_margins(Margins::trbl(margin, margin, margin, margin))
            .with_cover(cover)
            .with_header(header)
            .with_footer(footer))
    }

    fn cover_background(&self) -> Result<DynamicImage, CompositionError> {
        match &self.assets.cover_background {
            Some(source) => load_brand_asset("cover background", source),
            None => {
                let (width, height) = GRADIENT_SIZE_PX;
                Ok(cover_gradient(
                    width,
                    height,
                    self.palette.primary,
                    self.palette.light,
                ))
            }
        }
    }

    fn logo(&self) -> Result<Option<DynamicImage>, CompositionError> {
        self.assets
            .logo
            .as_ref()
            .map(|source| load_brand_asset("logo", source))
            .transpose()
    }

    fn cover_lines(&self) -> Vec<CoverLine> {
        let palette = self.palette;
        let white = palette.background.into();
        vec![
            CoverLine {
                offset_mm: 40.0,
                text: StyledString::new(
                    self.company.brand_name.clone(),
                    Style::new().bold().with_font_size(32).with_color(white),
                ),
            },
            CoverLine {
                offset_mm: 56.0,
                text: StyledString::new(
                    self.company.brand_tagline.clone(),
                    Style::new()
                        .with_font_size(12)
                        .with_color(palette.highlight.into()),
                ),
            },
            CoverLine {
                offset_mm: 95.0,
                text: StyledString::new(
                    self.company.document_title.clone(),
                    Style::new().bold().with_font_size(26).with_color(white),
                ),
            },
        ]
    }

    fn body_style(&self) -> Style {
        Style::new().with_color(self.palette.primary.into())
    }

    fn rich_paragraph(&self, markup: &str, base: Style) -> Result<Paragraph, CompositionError> {
        let mut paragraph = Paragraph::default();
        for span in parse_markup(markup)? {
            paragraph.push(span.to_styled_string(base));
        }
        Ok(paragraph)
    }

    fn push_op(
        &self,
        document: &mut genpdf::Document,
        op: &LayoutOp,
        log: &SharedPageLog,
    ) -> Result<(), CompositionError> {
        let palette = self.palette;
        let below = |space: f64| Margins::trbl(0, 0, mm_from_f64(space), 0);

        match op {
            LayoutOp::UseTemplate(template) => {
                document.push(TemplateSwitch::new(Rc::clone(log), *template));
            }
            LayoutOp::PageBreak => document.push(PageBreak::new()),
            LayoutOp::Section(section) => {
                document.push(SectionMarker::new(Rc::clone(log), *section));
            }
            LayoutOp::CoverClient { label, name } => {
                document.push(Paragraph::new(StyledString::new(
                    label.clone(),
                    Style::new()
                        .bold()
                        .with_font_size(14)
                        .with_color(palette.primary.into()),
                )));
                document.push(
                    Paragraph::new(StyledString::new(
                        name.clone(),
                        Style::new()
                            .bold()
                            .with_font_size(16)
                            .with_color(palette.accent.into()),
                    ))
                    .padded(Margins::trbl(mm_from_f64(1.5), 0, 0, 0)),
                );
            }
            LayoutOp::Heading(text) => {
                let style = Style::new()
                    .bold()
                    .with_font_size(13)
                    .with_color(palette.accent.into());
                document.push(
                    Paragraph::new(StyledString::new(text.clone(), style))
                        .padded(Margins::trbl(mm_from_f64(4.0), 0, 0, 0)),
                );
                document.push(
                    HorizontalRule::new(palette.light)
                        .with_strokes(2)
                        .with_spacing(0.8, 2.5),
                );
            }
            LayoutOp::Paragraph(paragraph) => {
                let element = self.rich_paragraph(&paragraph.markup, self.body_style())?;
                document.push(element.padded(below(1.5)));
            }
            LayoutOp::Highlight(paragraph) => {
                let style = self.body_style().with_font_size(11);
                let element = self.rich_paragraph(&paragraph.markup, style)?;
                let inset = Margins::trbl(
                    mm_from_f64(1.0),
                    0,
                    mm_from_f64(1.0),
                    mm_from_f64(3.0),
                );
                document.push(element.padded(inset));
            }
            LayoutOp::Bullets(items) => {
                let mut list = UnorderedList::with_bullet("•");
                for item in items {
                    list.push(self.rich_paragraph(&item.markup, self.body_style())?);
                }
                document.push(list.padded(below(1.5)));
            }
            LayoutOp::Investment(table) => {
                document.push(self.investment_layout(table)?);
                document.push(
                    HorizontalRule::new(palette.accent)
                        .with_strokes(6)
                        .with_spacing(0.2, 2.0),
                );
            }
            LayoutOp::Image(block) => document.push(self.image_element(block)?),
            LayoutOp::Spacer(height) => document.push(VerticalSpace::new(*height)),
        }
        Ok(())
    }

    fn investment_layout(&self, table: &InvestmentTable) -> Result<TableLayout, CompositionError> {
        let cell_padding = Margins::trbl(
            mm_from_f64(3.0),
            mm_from_f64(3.0),
            mm_from_f64(3.0),
            mm_from_f64(3.0),
        );
        let regular = self.body_style().with_font_size(11);
        let bold = regular.bold();

        let mut layout = TableLayout::new(vec![2, 1]);
        layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        let rows = table
            .lines
            .iter()
            .map(|line| (line, regular))
            .chain(std::iter::once((&table.total, bold)));
        for (line, style) in rows {
            let mut amount = Paragraph::new(StyledString::new(line.amount.clone(), style));
            amount.set_alignment(Alignment::Right);
            layout
                .row()
                .element(
                    Paragraph::new(StyledString::new(line.label.clone(), style))
                        .padded(cell_padding),
                )
                .element(amount.padded(cell_padding))
                .push()?;
        }
        Ok(layout)
    }

    fn image_element(&self, block: &ImageBlock) -> Result<ProportionalImage, CompositionError> {
        if !block.path.is_file() {
            return Err(CompositionError::MissingArtifact {
                path: block.path.clone(),
            });
        }

        let height = match self.probe.dimensions(&block.path) {
            Ok((width, height)) => embedded_height(width, height, block.target_width_mm),
            Err(err) => {
                warn!(
                    "{err}; embedding {} at {:.0}mm",
                    block.name, block.fallback_height_mm
                );
                block.fallback_height_mm
            }
        };

        let image = decode_image_from_path(&block.path).map_err(|source| {
            CompositionError::Asset {
                name: block.name,
                source,
            }
        })?;
        ProportionalImage::new(
            image,
            block.target_width_mm,
            height,
            self.layout.content_frame_height_mm(),
        )
        .map_err(|source| CompositionError::Asset {
            name: block.name,
            source,
        })
    }
}

fn document_title(company: &CompanyProfile, input: &ProposalInput) -> String {
    format!("{} - {}", company.document_title, input.client_name)
}

fn new_content_page(ops: &mut Vec<LayoutOp>, section: ProposalSection) {
    ops.extend([
        LayoutOp::UseTemplate(PageTemplate::Content),
        LayoutOp::PageBreak,
        LayoutOp::Section(section),
    ]);
}

fn bullets(lines: &[String]) -> Vec<RichParagraph> {
    lines.iter().map(RichParagraph::new).collect()
}

fn load_brand_asset(
    name: &'static str,
    source: &AssetSource,
) -> Result<DynamicImage, CompositionError> {
    load_asset(source).map_err(|source| CompositionError::Asset { name, source })
}

/// Equipment list of the company section.
pub fn equipment_lines(input: &ProposalInput) -> Vec<RichParagraph> {
    let inverters = input.inverter_quantity;
    let mut lines = vec![
        RichParagraph::new(format!(
            "{} {}",
            input.modules_quantity,
            escape(&input.module_spec)
        )),
        RichParagraph::new(format!(
            "{:02} inversor{} {}",
            inverters,
            if inverters > 1 { "es" } else { "" },
            escape(&input.inverter_spec)
        )),
    ];
    if let Some(watts) = module_watts(&input.module_spec) {
        lines.push(RichParagraph::new(format!(
            "**Potência total do sistema:** {}",
            format_power_kwp(system_power_kwp(input.modules_quantity, watts))
        )));
    }
    lines
}

/// Kit, labor and total rows of the investment table.
pub fn investment_table(input: &ProposalInput, metrics: &DerivedMetrics) -> InvestmentTable {
    InvestmentTable {
        lines: vec![
            InvestmentLine {
                label: "KIT FOTOVOLTAICO".to_owned(),
                amount: format_currency_br(input.kit_investment),
            },
            InvestmentLine {
                label: "MÃO DE OBRA, PROJETO E PERIFÉRICOS".to_owned(),
                amount: format_currency_br(input.labor_investment),
            },
        ],
        total: InvestmentLine {
            label: "INVESTIMENTO TOTAL".to_owned(),
            amount: format_currency_br(metrics.total_investment),
        },
    }
}
