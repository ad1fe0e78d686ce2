//! Reads back the pieces of a `.ski` document that validation relies on.

use crate::domain::{PrepError, PrepResult};
use std::collections::BTreeMap;
use std::path::Path;

const INSTRUMENT_TAG: &str = "<FrameInstrument";
/// Name of the comment that records the simulator's input and output directories.
pub(crate) const DIRECTORIES_DECLARATION: &str = "directories";
const SKI_PLACEHOLDER: &str = "INPUT.SKI_DOCUMENT";

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSummary {
    pub name: String,
    pub distance: f64,
    pub distance_unit: String,
}

/// A configuration document together with the instruments it declares.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDocument {
    pub text: String,
    pub instruments: Vec<InstrumentSummary>,
    /// `None` when the document carries no directories declaration.
    pub input_dir: Option<String>,
    pub output_dir: Option<String>,
}

impl ConfigurationDocument {
    pub fn parse(text: String) -> PrepResult<Self> {
        let instruments = parse_instruments(&text)?;
        let mut directories = parse_directories(&text)?;
        Ok(Self {
            input_dir: directories.remove("input"),
            output_dir: directories.remove("output"),
            text,
            instruments,
        })
    }

    pub fn read(path: &Path) -> PrepResult<Self> {
        let text = crate::modules::serialization::read_text_artifact(path, SKI_PLACEHOLDER)?;
        Self::parse(text).map_err(|error| {
            PrepError::new(
                error.category(),
                error.placeholder(),
                format!("'{}': {}", path.display(), error.message()),
            )
        })
    }

    pub fn instrument_names(&self) -> Vec<&str> {
        self.instruments
            .iter()
            .map(|instrument| instrument.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeParseError {
    #[error("unterminated <{tag}> element")]
    Unterminated { tag: String },
    #[error("attribute '{name}' in <{tag}> has no quoted value")]
    Unquoted { tag: String, name: String },
}

/// Collects every `FrameInstrument` with its name and `distance="<value> <unit>"` attribute.
pub fn parse_instruments(text: &str) -> PrepResult<Vec<InstrumentSummary>> {
    let mut instruments = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(INSTRUMENT_TAG) {
        let element = &rest[start + INSTRUMENT_TAG.len()..];
        if !element.starts_with(|c: char| c.is_whitespace() || c == '/' || c == '>') {
            rest = element;
            continue;
        }
        let (attributes, consumed) = parse_attributes("FrameInstrument", element)
            .map_err(|error| PrepError::schema(SKI_PLACEHOLDER, error.to_string()))?;
        instruments.push(instrument_from_attributes(&attributes, instruments.len())?);
        rest = &element[consumed..];
    }
    Ok(instruments)
}

/// Reads `<!-- directories input="..." output="..." -->`; empty when absent.
fn parse_directories(text: &str) -> PrepResult<BTreeMap<String, String>> {
    let marker = format!("<!-- {DIRECTORIES_DECLARATION}");
    let Some(start) = text.find(&marker) else {
        return Ok(BTreeMap::new());
    };
    let body = &text[start + marker.len()..];
    let Some(end) = body.find("-->") else {
        return Err(PrepError::schema(
            SKI_PLACEHOLDER,
            "unterminated directories declaration",
        ));
    };
    let (attributes, _) = parse_attributes(DIRECTORIES_DECLARATION, &format!("{}>", &body[..end]))
        .map_err(|error| PrepError::schema(SKI_PLACEHOLDER, error.to_string()))?;
    Ok(attributes)
}

fn instrument_from_attributes(
    attributes: &BTreeMap<String, String>,
    position: usize,
) -> PrepResult<InstrumentSummary> {
    let name = attributes.get("instrumentName").ok_or_else(|| {
        PrepError::schema(
            SKI_PLACEHOLDER,
            format!("FrameInstrument #{} has no instrumentName", position),
        )
    })?;
    let raw_distance = attributes.get("distance").ok_or_else(|| {
        PrepError::schema(
            SKI_PLACEHOLDER,
            format!("instrument '{}' has no distance", name),
        )
    })?;
    let mut tokens = raw_distance.split_whitespace();
    let distance = tokens
        .next()
        .and_then(|token| token.parse::<f64>().ok())
        .ok_or_else(|| {
            PrepError::schema(
                SKI_PLACEHOLDER,
                format!("instrument '{}' has unreadable distance '{}'", name, raw_distance),
            )
        })?;
    Ok(InstrumentSummary {
        name: name.clone(),
        distance,
        distance_unit: tokens.next().unwrap_or_default().to_string(),
    })
}

/// Parses `name="value"` pairs up to the end of the element, returning them and the bytes consumed.
fn parse_attributes(
    tag: &str,
    element: &str,
) -> Result<(BTreeMap<String, String>, usize), AttributeParseError> {
    let mut attributes = BTreeMap::new();
    let bytes = element.as_bytes();
    let mut cursor = 0;
    loop {
        cursor = skip_whitespace(bytes, cursor);
        if cursor >= bytes.len() {
            return Err(AttributeParseError::Unterminated {
                tag: tag.to_string(),
            });
        }
        if element[cursor..].starts_with("/>") {
            return Ok((attributes, cursor + 2));
        }
        if bytes[cursor] == b'>' {
            return Ok((attributes, cursor + 1));
        }

        let name_start = cursor;
        while cursor < bytes.len() && bytes[cursor] != b'=' && !bytes[cursor].is_ascii_whitespace()
        {
            cursor += 1;
        }
        let name = element[name_start..cursor].to_string();
        cursor = skip_whitespace(bytes, cursor);
        let quote = if bytes.get(cursor) == Some(&b'=') {
            cursor = skip_whitespace(bytes, cursor + 1);
            bytes.get(cursor).copied().filter(|c| *c == b'"' || *c == b'\'')
        } else {
            None
        };
        let Some(quote) = quote else {
            return Err(AttributeParseError::Unquoted {
                tag: tag.to_string(),
                name,
            });
        };
        let value_start = cursor + 1;
        let Some(length) = element[value_start..].find(quote as char) else {
            return Err(AttributeParseError::Unterminated {
                tag: tag.to_string(),
            });
        };
        attributes.insert(
            name,
            unescape_attribute(&element[value_start..value_start + length]),
        );
        cursor = value_start + length + 1;
    }
}

fn skip_whitespace(bytes: &[u8], mut cursor: usize) -> usize {
    while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
        cursor += 1;
    }
    cursor
}

pub(crate) fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn unescape_attribute(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
