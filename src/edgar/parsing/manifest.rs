use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use super::error::ParseError;
use super::types::ChartRecord;

/// One rendered statement page listed in a filing's `FilingSummary.xml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub identifier: String,
    pub title: String,
    pub long_name: Option<String>,
    pub html_file_name: Option<String>,
    pub menu_category: Option<String>,
}

impl ManifestEntry {
    /// Chart record without content; page bodies are fetched separately.
    pub fn to_chart_record(&self) -> ChartRecord {
        ChartRecord::new(self.identifier.clone(), self.title.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    ShortName,
    LongName,
    HtmlFileName,
    MenuCategory,
    Position,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Field> {
        match tag {
            b"ShortName" => Some(Field::ShortName),
            b"LongName" => Some(Field::LongName),
            b"HtmlFileName" => Some(Field::HtmlFileName),
            b"MenuCategory" => Some(Field::MenuCategory),
            b"Position" => Some(Field::Position),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct PendingReport {
    id: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    html_file_name: Option<String>,
    menu_category: Option<String>,
    position: Option<String>,
}

impl PendingReport {
    fn from_attributes(start: &BytesStart) -> Result<Self, ParseError> {
        let mut report = PendingReport::default();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::Manifest(e.to_string()))?;
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::Manifest(e.to_string()))?
                .trim()
                .to_string();
            match attr.key.as_ref() {
                b"id" => report.id = Some(value),
                b"shortName" => report.short_name = Some(value),
                b"longName" => report.long_name = Some(value),
                b"htmlFileName" => report.html_file_name = Some(value),
                b"menuCategory" => report.menu_category = Some(value),
                b"position" => report.position = Some(value),
                _ => {}
            }
        }
        Ok(report)
    }

    fn push_text(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::ShortName => &mut self.short_name,
            Field::LongName => &mut self.long_name,
            Field::HtmlFileName => &mut self.html_file_name,
            Field::MenuCategory => &mut self.menu_category,
            Field::Position => &mut self.position,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn finish(self, index: usize) -> ManifestEntry {
        let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let html_file_name = non_empty(self.html_file_name);
        let long_name = non_empty(self.long_name);

        let identifier = html_file_name
            .as_deref()
            .map(file_stem)
            .or_else(|| non_empty(self.id))
            .or_else(|| non_empty(self.position).map(|p| format!("R{}", p)))
            .unwrap_or_else(|| format!("R{}", index + 1));

        let title = non_empty(self.short_name)
            .or_else(|| long_name.clone())
            .unwrap_or_else(|| identifier.clone());

        ManifestEntry {
            identifier,
            title,
            long_name,
            html_file_name,
            menu_category: non_empty(self.menu_category),
        }
    }
}

/// `R2.htm` -> `R2`
fn file_stem(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

/// Reads every `Report` entry of a filing manifest, in document order.
pub fn parse_manifest(xml: &str) -> Result<Vec<ManifestEntry>, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut pending: Option<PendingReport> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Report" => {
                pending = Some(PendingReport::from_attributes(e)?);
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Report" => {
                let report = PendingReport::from_attributes(e)?;
                entries.push(report.finish(entries.len()));
            }
            Ok(Event::Start(ref e)) if pending.is_some() => {
                field = Field::from_tag(e.name().as_ref());
            }
            Ok(Event::Text(e)) => {
                if let (Some(report), Some(f)) = (pending.as_mut(), field) {
                    let text = e.unescape().map_err(|e| ParseError::Manifest(e.to_string()))?;
                    report.push_text(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(report), Some(f)) = (pending.as_mut(), field) {
                    report.push_text(f, &String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Report" => {
                if let Some(report) = pending.take() {
                    entries.push(report.finish(entries.len()));
                }
                field = None;
            }
            Ok(Event::End(_)) => field = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::Manifest(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => (),
        }
    }

    debug!("Read {} manifest entries", entries.len());
    Ok(entries)
}
