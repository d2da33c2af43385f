use itertools::Itertools;
use log::{debug, info};
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::ParseError;
use super::facts::classify_data_type;
use super::lexicon::Lexicon;
use super::text::{clean_text, html_to_text};
use super::types::{Context, Fact, Period, Unit};

/// Facts of a standalone instance document together with the context and
/// unit tables they reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XbrlInstance {
    pub facts: Vec<Fact>,
    pub contexts: HashMap<String, Context>,
    pub units: HashMap<String, Unit>,
}

/// Parser for standalone XBRL instance documents.
pub struct StructuredFactParser<'a> {
    lexicon: &'a Lexicon,
}

impl<'a> StructuredFactParser<'a> {
    pub fn new(lexicon: &'a Lexicon) -> Self {
        StructuredFactParser { lexicon }
    }

    /// Parses the whole document or fails; malformed XML yields no partial result.
    pub fn parse(&self, content: &str) -> Result<XbrlInstance, ParseError> {
        let document = Document::parse(content)?;
        let root = document.root_element();

        let contexts = collect_contexts(root);
        let units = collect_units(root);

        let facts: Vec<Fact> = root
            .children()
            .filter(|n| n.is_element() && !self.is_structural(*n))
            .map(|n| self.read_fact(n, &contexts, &units))
            .collect();

        info!(
            "Parsed instance document: {} facts, {} contexts, {} units",
            facts.len(),
            contexts.len(),
            units.len()
        );

        Ok(XbrlInstance {
            facts,
            contexts,
            units,
        })
    }

    fn is_structural(&self, node: Node) -> bool {
        let name = node.tag_name().name().to_lowercase();
        self.lexicon.structural_elements.contains(&name.as_str())
    }

    fn read_fact(
        &self,
        node: Node,
        contexts: &HashMap<String, Context>,
        units: &HashMap<String, Unit>,
    ) -> Fact {
        let concept = node.tag_name().name().to_string();
        let raw_value = node_value(node);
        let context_ref = node.attribute("contextRef").map(str::to_string);
        let unit_ref = node.attribute("unitRef").map(str::to_string);

        // The measure decides; an undeclared unit falls back to its id.
        let unit_text = unit_ref
            .as_deref()
            .map(|id| units.get(id).map(|u| u.measure.as_str()).unwrap_or(id));
        let unit_texts: Vec<&str> = unit_text.into_iter().collect();
        let data_type = classify_data_type(self.lexicon, &raw_value, &unit_texts, None);

        let mut fact = Fact::new(concept, raw_value, data_type);
        fact.decimals = node.attribute("decimals").and_then(parse_decimals);
        fact.period = context_ref
            .as_deref()
            .and_then(|id| contexts.get(id))
            .map(|c| c.period.clone());
        if context_ref.is_some() && fact.period.is_none() {
            debug!(
                "Fact {} references unknown context {:?}",
                fact.concept, context_ref
            );
        }
        fact.context_ref = context_ref;
        fact.unit_ref = unit_ref;
        fact
    }
}

fn collect_contexts(root: Node) -> HashMap<String, Context> {
    let mut contexts = HashMap::new();

    for node in root.descendants().filter(|n| n.has_tag_name("context")) {
        let Some(id) = node.attribute("id") else {
            debug!("Skipping context without id");
            continue;
        };

        let child_text = |name: &str| {
            node.descendants()
                .find(|n| n.has_tag_name(name))
                .and_then(|n| n.text())
        };

        // `forever` contexts carry no dates.
        let period = Period::from_parts(
            child_text("instant"),
            child_text("startDate"),
            child_text("endDate"),
        )
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

fn collect_units(root: Node) -> HashMap<String, Unit> {
    let mut units = HashMap::new();

    for node in root.descendants().filter(|n| n.has_tag_name("unit")) {
        let Some(id) = node.attribute("id") else {
            debug!("Skipping unit without id");
            continue;
        };

        // Divide units list numerator then denominator, e.g. `iso4217:USD/xbrli:shares`.
        let measure = node
            .descendants()
            .filter(|n| n.has_tag_name("measure"))
            .filter_map(|n| n.text())
            .map(str::trim)
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

/// Text of an element; escaped markup in text-block facts is reduced to text.
fn node_value(node: Node) -> String {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();

    if text.contains('<') {
        html_to_text(&text)
    } else {
        clean_text(&text)
    }
}

/// `INF` and anything non-integer mean "no stated precision".
pub(crate) fn parse_decimals(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("INF") {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::types::{DataType, PeriodType};
    use chrono::NaiveDate;

    const INSTANCE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
            xmlns:link="http://www.xbrl.org/2003/linkbase"
            xmlns:xlink="http://www.w3.org/1999/xlink"
            xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
            xmlns:us-gaap="http://fasb.org/us-gaap/2023">
  <link:schemaRef xlink:type="simple" xlink:href="acme-20231231.xsd"/>
  <xbrli:context id="FY2023">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">0000001</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:startDate>2023-01-01</xbrli:startDate><xbrli:endDate>2023-12-31</xbrli:endDate></xbrli:period>
  </xbrli:context>
  <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
  <us-gaap:Revenues contextRef="FY2023" unitRef="usd" decimals="-3">1234000</us-gaap:Revenues>
  <us-gaap:ProfitLoss contextRef="Nowhere" unitRef="USD" decimals="INF">5</us-gaap:ProfitLoss>
</xbrli:xbrl>"#;

    #[test]
    fn test_parse_instance() {
        let instance = StructuredFactParser::new(Lexicon::global())
            .parse(INSTANCE)
            .unwrap();

        assert_eq!(instance.facts.len(), 2);
        assert_eq!(instance.units["usd"].measure, "iso4217:USD");

        let revenue = &instance.facts[0];
        assert_eq!(revenue.concept, "Revenues");
        assert_eq!(revenue.raw_value, "1234000");
        assert_eq!(revenue.decimals, Some(-3));
        assert_eq!(revenue.data_type, DataType::Monetary);
        assert!(revenue.is_monetary);

        let period = revenue.period.as_ref().unwrap();
        assert_eq!(period.period_type, PeriodType::Duration);
        assert_eq!(period.end_date, NaiveDate::from_ymd_opt(2023, 12, 31));
    }

    #[test]
    fn test_unresolved_references_are_not_errors() {
        let instance = StructuredFactParser::new(Lexicon::global())
            .parse(INSTANCE)
            .unwrap();

        let profit = &instance.facts[1];
        assert!(profit.period.is_none());
        assert_eq!(profit.decimals, None);
        // Undeclared unit: the id itself is checked for a currency token.
        assert!(profit.is_monetary);
    }

    #[test]
    fn test_malformed_document_fails() {
        let result = StructuredFactParser::new(Lexicon::global()).parse("<xbrl><unclosed></xbrl>");
        assert!(matches!(result, Err(ParseError::Xml(_))));
    }

    #[test]
    fn test_text_block_markup_reduced() {
        let doc = r#"<xbrl xmlns:us-gaap="http://fasb.org/us-gaap/2023">
  <us-gaap:PolicyTextBlock contextRef="c">&lt;p&gt;Revenue is recognized&lt;/p&gt;&lt;p&gt;on delivery.&lt;/p&gt;</us-gaap:PolicyTextBlock>
</xbrl>"#;
        let instance = StructuredFactParser::new(Lexicon::global()).parse(doc).unwrap();
        assert_eq!(instance.facts[0].raw_value, "Revenue is recognized on delivery.");
        assert_eq!(instance.facts[0].data_type, DataType::Text);
    }
}
