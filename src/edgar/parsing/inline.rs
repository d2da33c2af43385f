use itertools::Itertools;
use log::{debug, info};
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::facts::classify_data_type;
use super::lexicon::Lexicon;
use super::text::{element_text, parse_filing};
use super::types::{Context, Fact, Period, Unit};
use super::xbrl::parse_decimals;

/// Facts tagged inside an HTML filing, with the context and unit
/// definitions carried by its hidden header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineDocument {
    pub facts: Vec<Fact>,
    pub contexts: HashMap<String, Context>,
    pub units: HashMap<String, Unit>,
}

/// Why a single tagged element was left out. Never escapes the extractor.
#[derive(Debug, Error)]
enum ElementFault {
    #[error("element <{0}> has no concept name")]
    EmptyConcept(String),

    #[error("scale '{0}' is not an integer")]
    InvalidScale(String),

    #[error("decimals '{0}' is not an integer")]
    InvalidDecimals(String),
}

/// Extractor for facts embedded in filing HTML.
///
/// HTML parsing lower-cases tag and attribute names, so `ix:nonFraction`
/// arrives as `ix:nonfraction` and `contextRef` as `contextref`.
pub struct InlineFactExtractor<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> InlineFactExtractor<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        InlineFactExtractor { lexicon }
    }

    pub fn extract(&self, html: &str) -> InlineDocument {
        let document = parse_filing(html);
        self.extract_from(&document)
    }

    pub fn extract_from(&self, document: &Html) -> InlineDocument {
        let elements: Vec<ElementRef> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();

        let contexts = collect_contexts(&elements);
        let units = collect_units(&elements);

        let mut facts = Vec::new();
        let mut skipped = 0;

        for element in elements.iter().filter(|e| self.is_candidate(**e)) {
            match self.read_fact(*element, &contexts, &units) {
                Ok(fact) => facts.push(fact),
                Err(fault) => {
                    skipped += 1;
                    debug!("Skipping tagged element: {}", fault);
                }
            }
        }

        info!(
            "Extracted {} inline facts ({} skipped), {} contexts, {} units",
            facts.len(),
            skipped,
            contexts.len(),
            units.len()
        );

        InlineDocument {
            facts,
            contexts,
            units,
        }
    }

    fn is_candidate(&self, element: ElementRef) -> bool {
        let name = element.value().name();
        if self.is_envelope(name) {
            return false;
        }

        element.value().attr("contextref").is_some()
            || name.contains(':')
            || self.lexicon.taxonomy_markers.iter().any(|m| name.contains(m))
    }

    fn is_envelope(&self, name: &str) -> bool {
        match name.split_once(':') {
            Some(("ix", local)) => self.lexicon.inline_envelope_elements.contains(&local),
            Some((prefix, _)) => self.lexicon.inline_envelope_prefixes.contains(&prefix),
            None => false,
        }
    }

    fn read_fact(
        &self,
        element: ElementRef,
        contexts: &HashMap<String, Context>,
        units: &HashMap<String, Unit>,
    ) -> Result<Fact, ElementFault> {
        let el = element.value();
        let name = el.name();

        let concept = match name.split_once(':') {
            Some(("ix", _)) => el.attr("name").map(local_name).unwrap_or_default(),
            _ => local_name(name),
        };
        if concept.trim().is_empty() {
            return Err(ElementFault::EmptyConcept(name.to_string()));
        }

        let scale = el
            .attr("scale")
            .map(|s| {
                s.trim()
                    .parse::<i32>()
                    .map_err(|_| ElementFault::InvalidScale(s.to_string()))
            })
            .transpose()?;

        let decimals = match el.attr("decimals") {
            Some(d) if d.trim().eq_ignore_ascii_case("INF") => None,
            Some(d) => Some(parse_decimals(d).ok_or_else(|| ElementFault::InvalidDecimals(d.to_string()))?),
            None => None,
        };

        let raw_value = element_text(element);
        let context_ref = el.attr("contextref").map(str::to_string);
        let unit_ref = el.attr("unitref").map(str::to_string);
        let format_hint = el.attr("format").map(str::to_string);

        let mut unit_texts: Vec<&str> = Vec::new();
        if let Some(unit_ref) = unit_ref.as_deref() {
            unit_texts.push(unit_ref);
            if let Some(unit) = units.get(unit_ref) {
                unit_texts.push(&unit.measure);
            }
        }
        let data_type =
            classify_data_type(self.lexicon, &raw_value, &unit_texts, format_hint.as_deref());

        let mut fact = Fact::new(concept.to_string(), raw_value, data_type);
        fact.period = context_ref
            .as_deref()
            .and_then(|id| contexts.get(id))
            .map(|c| c.period.clone());
        fact.context_ref = context_ref;
        fact.unit_ref = unit_ref;
        fact.scale = scale;
        fact.decimals = decimals;
        fact.format_hint = format_hint;
        fact.is_negative = el.attr("sign").map_or(false, |s| s.trim() == "-");
        Ok(fact)
    }
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

fn descendants_named<'e>(element: ElementRef<'e>, local: &'e str) -> impl Iterator<Item = ElementRef<'e>> + 'e {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |e| local_name(e.value().name()) == local)
}

fn first_text(element: ElementRef, local: &str) -> Option<String> {
    descendants_named(element, local).next().map(element_text)
}

fn collect_contexts(elements: &[ElementRef]) -> HashMap<String, Context> {
    let mut contexts = HashMap::new();

    for element in elements
        .iter()
        .filter(|e| local_name(e.value().name()) == "context")
    {
        let Some(id) = element.value().attr("id") else {
            continue;
        };

        let instant = first_text(*element, "instant");
        let start = first_text(*element, "startdate");
        let end = first_text(*element, "enddate");
        let period = Period::from_parts(instant.as_deref(), start.as_deref(), end.as_deref())
            .unwrap_or_else(|| Period::duration(None, None));

        contexts.insert(
            id.to_string(),
            Context {
                id: id.to_string(),
                period,
            },
        );
    }

    contexts
}

fn collect_units(elements: &[ElementRef]) -> HashMap<String, Unit> {
    let mut units = HashMap::new();

    for element in elements
        .iter()
        .filter(|e| local_name(e.value().name()) == "unit")
    {
        let Some(id) = element.value().attr("id") else {
            continue;
        };

        let measure = descendants_named(*element, "measure")
            .map(element_text)
            .join("/");

        units.insert(
            id.to_string(),
            Unit {
                id: id.to_string(),
                measure,
            },
        );
    }

    units
}
