//! The instruction stream the composer plans before any rendering happens.
//!
//! A proposal is described as a flat list of [`LayoutOp`]s. Template changes
//! and page breaks are explicit instructions, so the page structure can be
//! inspected and tested without producing a PDF.

use std::path::PathBuf;

/// Decoration style of a physical page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageTemplate {
    /// Full-page artwork, no header or footer.
    Cover,
    /// Brand header band and footer with page number.
    Content,
}

/// The fixed parts of a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProposalSection {
    Cover,
    Company,
    Financial,
    Results,
}

impl ProposalSection {
    /// Human readable title, used for document outlines.
    pub fn title(self) -> &'static str {
        match self {
            ProposalSection::Cover => "Capa",
            ProposalSection::Company => "Quem somos",
            ProposalSection::Financial => "Investimento",
            ProposalSection::Results => "Custo x benefício",
        }
    }
}

/// Markup text (see [`crate::richtext`]) laid out as one paragraph.
#[derive(Clone, Debug, PartialEq)]
pub struct RichParagraph {
    pub markup: String,
}

impl RichParagraph {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }
}

/// An image placed at a fixed width with a height following its proportions.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    /// Names the image in error messages.
    pub name: &'static str,
    pub path: PathBuf,
    pub target_width_mm: f64,
    /// Height used when the image proportions cannot be read.
    pub fallback_height_mm: f64,
}

/// One labelled amount of the investment table.
#[derive(Clone, Debug, PartialEq)]
pub struct InvestmentLine {
    pub label: String,
    pub amount: String,
}

/// Itemized investment with its total.
#[derive(Clone, Debug, PartialEq)]
pub struct InvestmentTable {
    pub lines: Vec<InvestmentLine>,
    /// Rendered bold and underlined with the accent color.
    pub total: InvestmentLine,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayoutOp {
    /// Applies `PageTemplate` to the next page started (or to the first page
    /// when it opens the stream).
    UseTemplate(PageTemplate),
    PageBreak,
    /// Marks the start of a proposal section on the current page.
    Section(ProposalSection),
    /// Client block of the cover.
    CoverClient { label: String, name: String },
    Heading(String),
    Paragraph(RichParagraph),
    /// Slightly larger paragraph, indented from the body text.
    Highlight(RichParagraph),
    Bullets(Vec<RichParagraph>),
    Investment(InvestmentTable),
    Image(ImageBlock),
    /// Vertical space in millimetres.
    Spacer(f64),
}

/// Templates the stream assigns to the pages it starts, assuming no text
/// overflows onto extra pages.
pub fn planned_templates(ops: &[LayoutOp]) -> Vec<PageTemplate> {
    let mut templates = Vec::new();
    let mut current = None;
    let mut pending = None;
    for op in ops {
        match op {
            LayoutOp::UseTemplate(template) if current.is_none() => {
                current = Some(*template);
                templates.push(*template);
            }
            LayoutOp::UseTemplate(template) => pending = Some(*template),
            LayoutOp::PageBreak => {
                if let Some(template) = pending.take() {
                    current = Some(template);
                }
                if let Some(template) = current {
                    templates.push(template);
                }
            }
            _ => {}
        }
    }
    templates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_switch_on_the_following_break() {
        let ops = vec![
            LayoutOp::UseTemplate(PageTemplate::Cover),
            LayoutOp::Heading("A".into()),
            LayoutOp::UseTemplate(PageTemplate::Content),
            LayoutOp::PageBreak,
            LayoutOp::Heading("B".into()),
            LayoutOp::PageBreak,
        ];
        assert_eq!(
            planned_templates(&ops),
            vec![PageTemplate::Cover, PageTemplate::Content, PageTemplate::Content]
        );
    }

    #[test]
    fn section_titles_are_distinct() {
        let titles = [
            ProposalSection::Cover,
            ProposalSection::Company,
            ProposalSection::Financial,
            ProposalSection::Results,
        ]
        .map(ProposalSection::title);
        for (i, a) in titles.iter().enumerate() {
            assert!(titles[i + 1..].iter().all(|b| a != b));
        }
    }
}
