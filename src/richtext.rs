//! Inline markup for the proposal's body text.
//!
//! Paragraph templates carry a small markup so that bold prefixes and colored
//! figures can be written inline:
//!
//! - `**bold**` for bold text
//! - `[color=#RRGGBB]{text}` for colored text
//! - `\` escapes the next character, see [`escape`]
//!
//! Parsed [`Span`]s are converted into `genpdf` [`StyledString`]s by the composer.

use genpdf::style::{Style, StyledString};
use thiserror::Error;

use crate::style::Rgb;

/// A slice of text together with inline style attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    text: String,
    bold: bool,
    color: Option<Rgb>,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn color(&self) -> Option<Rgb> {
        self.color
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn colored(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    /// Converts the span to a [`StyledString`] layered over `base`.
    pub fn to_styled_string(&self, base: Style) -> StyledString {
        let mut style = base;
        if let Some(color) = self.color {
            style.set_color(color.into());
        }
        if self.bold {
            style.set_bold();
        }
        StyledString::new(self.text.clone(), style)
    }
}

/// Parse errors produced by [`parse_markup`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} (at byte {index})")]
pub struct ParseError {
    index: usize,
    message: String,
}

impl ParseError {
    fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }

    /// Byte index in the original input string where the error was detected.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Escapes every markup character in `text` so it parses back verbatim.
///
/// Client supplied values (equipment descriptions, names) go through this
/// before they are interpolated into a template.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '[' | ']' | '{' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Clone, Copy, Debug, Default)]
struct StyleState {
    bold: bool,
    color: Option<Rgb>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Marker {
    Bold,
    Color,
}

impl Marker {
    fn closing_token(self) -> &'static str {
        match self {
            Marker::Bold => "**",
            Marker::Color => "}",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Marker::Bold => "bold span",
            Marker::Color => "color span",
        }
    }
}

/// Parses the inline markup into a list of [`Span`]s.
///
/// Adjacent text with the same style is merged into a single span.
pub fn parse_markup(input: &str) -> Result<Vec<Span>, ParseError> {
    let (spans, _) = parse_inner(input, 0, StyleState::default(), None)?;
    Ok(spans)
}

fn parse_inner(
    input: &str,
    mut index: usize,
    state: StyleState,
    closing_marker: Option<Marker>,
) -> Result<(Vec<Span>, usize), ParseError> {
    let mut spans = Vec::new();
    let mut buffer = String::new();

    while let Some(ch) = input[index..].chars().next() {
        let rest = &input[index..];

        if let Some(marker) = closing_marker {
            if rest.starts_with(marker.closing_token()) {
                flush_buffer(&mut buffer, &mut spans, state);
                return Ok((spans, index + marker.closing_token().len()));
            }
        }

        if ch == '\\' {
            let escaped = rest[1..]
                .chars()
                .next()
                .ok_or_else(|| ParseError::new(index, "dangling escape at end of input"))?;
            buffer.push(escaped);
            index += 1 + escaped.len_utf8();
            continue;
        }

        if rest.starts_with("**") {
            flush_buffer(&mut buffer, &mut spans, state);
            let nested_state = StyleState {
                bold: true,
                ..state
            };
            let (nested, new_index) =
                parse_inner(input, index + 2, nested_state, Some(Marker::Bold))?;
            extend_merged(&mut spans, nested);
            index = new_index;
            continue;
        }

        if rest.starts_with("[color=") {
            let (color, after_directive) = parse_color_directive(input, index)?;
            flush_buffer(&mut buffer, &mut spans, state);
            let nested_state = StyleState {
                color: Some(color),
                ..state
            };
            let (nested, new_index) =
                parse_inner(input, after_directive, nested_state, Some(Marker::Color))?;
            extend_merged(&mut spans, nested);
            index = new_index;
            continue;
        }

        match ch {
            '*' => {
                return Err(ParseError::new(
                    index,
                    "single `*` is not supported; use `**` for bold or escape it",
                ))
            }
            '}' => {
                return Err(ParseError::new(
                    index,
                    "unexpected closing token `}` without matching opening `[color=...]`",
                ))
            }
            '[' | ']' | '{' => {
                return Err(ParseError::new(
                    index,
                    format!("unexpected `{ch}`; expected `[color=#RRGGBB]{{...}}` or an escape"),
                ))
            }
            _ => {}
        }

        buffer.push(ch);
        index += ch.len_utf8();
    }

    if let Some(marker) = closing_marker {
        Err(ParseError::new(
            index,
            format!("unterminated {}", marker.description()),
        ))
    } else {
        flush_buffer(&mut buffer, &mut spans, state);
        Ok((spans, index))
    }
}

fn flush_buffer(buffer: &mut String, spans: &mut Vec<Span>, state: StyleState) {
    if buffer.is_empty() {
        return;
    }
    let span = Span {
        text: std::mem::take(buffer),
        bold: state.bold,
        color: state.color,
    };
    extend_merged(spans, vec![span]);
}

fn extend_merged(spans: &mut Vec<Span>, nested: Vec<Span>) {
    for span in nested {
        match spans.last_mut() {
            Some(last) if last.bold == span.bold && last.color == span.color => {
                last.text.push_str(&span.text);
            }
            _ => spans.push(span),
        }
    }
}

fn parse_color_directive(input: &str, index: usize) -> Result<(Rgb, usize), ParseError> {
    const PREFIX: &str = "[color=";
    let start_hex = index + PREFIX.len();
    if !input[start_hex..].starts_with('#') {
        return Err(ParseError::new(
            start_hex,
            "expected `#` followed by a hexadecimal RGB value",
        ));
    }

    let hex_start = start_hex + 1;
    let hex = input
        .get(hex_start..hex_start + 6)
        .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| {
            ParseError::new(
                hex_start,
                "invalid RGB specification; expected 6 hexadecimal digits",
            )
        })?;
    let channel = |offset: usize| {
        u8::from_str_radix(&hex[offset..offset + 2], 16)
            .map_err(|_| ParseError::new(hex_start + offset, "invalid RGB channel"))
    };
    let color = Rgb(channel(0)?, channel(2)?, channel(4)?);

    let bracket_index = hex_start + 6;
    if !input[bracket_index..].starts_with("]{") {
        return Err(ParseError::new(
            bracket_index,
            "expected `]{` to open the colored text",
        ));
    }

    Ok((color, bracket_index + 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_text() {
        let spans = parse_markup("Potência total do sistema: 37,20 kWp").unwrap();
        assert_eq!(spans, vec![Span::new("Potência total do sistema: 37,20 kWp")]);
    }

    #[test]
    fn parse_bold_prefix() {
        let spans = parse_markup("**Módulos:** 25 anos de garantia").unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text(), "Módulos:");
        assert!(spans[0].is_bold());
        assert_eq!(spans[1].text(), " 25 anos de garantia");
        assert!(!spans[1].is_bold());
    }

    #[test]
    fn parse_colored_bold_figure() {
        let spans = parse_markup("Retorno de [color=#16A085]{**R$ 1.000,00**}.").unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text(), "R$ 1.000,00");
        assert!(spans[1].is_bold());
        assert_eq!(spans[1].color(), Some(Rgb(0x16, 0xA0, 0x85)));
        assert_eq!(spans[2].text(), ".");
    }

    #[test]
    fn escaped_text_round_trips() {
        let raw = "Inversor *híbrido* [20kW] {AFCI} \\ 220V";
        let spans = parse_markup(&escape(raw)).unwrap();
        assert_eq!(spans, vec![Span::new(raw)]);
    }

    #[test]
    fn styled_string_layers_over_base_style() {
        let base = Style::new().with_font_size(12);
        let styled = Span::new("x").bold().colored(Rgb(1, 2, 3)).to_styled_string(base);
        assert!(styled.style.is_bold());
        assert_eq!(styled.style.font_size(), 12);
        assert_eq!(styled.style.color(), Some(genpdf::style::Color::Rgb(1, 2, 3)));
    }

    #[test]
    fn error_on_unterminated_bold() {
        let err = parse_markup("**oops").unwrap_err();
        assert!(err.message().contains("unterminated bold"));
        assert_eq!(err.index(), 6);
        assert_eq!(err.to_string(), format!("{} (at byte 6)", err.message()));
        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }

    #[test]
    fn error_on_stray_tokens() {
        assert!(parse_markup("a * b").is_err());
        assert!(parse_markup("a } b").is_err());
        assert!(parse_markup("trailing \\").is_err());
    }

    #[test]
    fn error_on_invalid_color() {
        let err = parse_markup("[color=#12FG34]{x}").unwrap_err();
        assert!(err.message().contains("invalid RGB"));
    }
}
