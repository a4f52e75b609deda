use roxmltree::{Document, Node};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::app::ports::AddressNormalizer;
use crate::common::error::{Result, ScraperError};
use crate::common::types::Schedule;
use crate::observability::metrics;

const ATTRIBUTES_KEY: &str = "@attributes";
const TEXT_KEY: &str = "#text";
const EMPLOYMENT_PLACE: &str = "PrimaryCityAndStateOfEmploymentOrBusiness";

/// Converts a filing document into the canonical JSON tree.
///
/// Element children become object keys, repeated children become arrays,
/// attributes are grouped under `@attributes` and leaf text is trimmed. The
/// root element itself is not kept as a key. After conversion both schedules
/// are forced into list form and every address line is standardized.
pub struct ReportDetailNormalizer<'a> {
    addresses: &'a dyn AddressNormalizer,
}

impl<'a> ReportDetailNormalizer<'a> {
    pub fn new(addresses: &'a dyn AddressNormalizer) -> Self {
        Self { addresses }
    }

    #[instrument(skip(self, xml), fields(bytes = xml.len()))]
    pub fn normalize(&self, xml: &[u8]) -> Result<Value> {
        let text = std::str::from_utf8(xml)
            .map_err(|e| ScraperError::Parse(format!("filing is not UTF-8: {}", e)))?;
        let doc = Document::parse(text.trim_start_matches('\u{feff}'))?;

        let mut tree = match element_to_value(doc.root_element()) {
            Value::Object(map) => map,
            _ => return Err(ScraperError::Parse("filing has no elements".to_string())),
        };

        for schedule in [Schedule::Contributions, Schedule::Expenses] {
            let count = force_item_list(&mut tree, schedule);
            debug!(schedule = schedule.as_str(), items = count, "Schedule normalized");
        }
        self.normalize_addresses(&mut tree);

        Ok(Value::Object(tree))
    }

    fn normalize_addresses(&self, tree: &mut Map<String, Value>) {
        if let Some(address) = tree
            .get_mut("ReportHeader")
            .and_then(|h| h.get_mut("Address"))
            .and_then(Value::as_object_mut)
        {
            self.normalize_line1(address);
            // The filer's own second line is kept even when blank.
            if let Some(line2) = address.get_mut("Line2") {
                if is_non_empty(line2) {
                    *line2 = self.normalize_text(line2);
                }
            }
        }

        for schedule in [Schedule::Contributions, Schedule::Expenses] {
            let (container, item) = schedule.xml_path();
            let Some(items) = tree
                .get_mut(container)
                .and_then(|c| c.get_mut(item))
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for entry in items.iter_mut() {
                let Some(party) = entry
                    .get_mut(schedule.party_element())
                    .and_then(Value::as_object_mut)
                else {
                    continue;
                };
                if let Some(address) = party.get_mut("Address").and_then(Value::as_object_mut) {
                    self.normalize_line1(address);
                    match address.get("Line2") {
                        Some(line2) if is_non_empty(line2) => {
                            let normalized = self.normalize_text(line2);
                            address.insert("Line2".to_string(), normalized);
                        }
                        _ => {
                            address.remove("Line2");
                        }
                    }
                }
                if let Some(place) = party.get_mut(EMPLOYMENT_PLACE) {
                    if is_non_empty(place) {
                        *place = self.normalize_text(place);
                    }
                }
            }
        }
    }

    /// Line 1 is always left as text: structured or degenerate values become "".
    fn normalize_line1(&self, address: &mut Map<String, Value>) {
        if let Some(line1) = address.get_mut("Line1") {
            let replacement = match line1.as_str() {
                Some("") => return,
                Some(_) => self.normalize_text(line1),
                None => {
                    metrics::normalize::degenerate_address();
                    Value::String(String::new())
                }
            };
            *line1 = replacement;
        }
    }

    fn normalize_text(&self, value: &Value) -> Value {
        let text = value.as_str().unwrap_or_default();
        match self.addresses.normalize_line(text) {
            Some(line) => Value::String(line),
            None => {
                metrics::normalize::degenerate_address();
                Value::String(String::new())
            }
        }
    }
}

/// Make `<container>.<item>` a list whatever the upstream cardinality was.
/// Returns the number of items after the fix-up.
pub fn force_item_list(tree: &mut Map<String, Value>, schedule: Schedule) -> usize {
    let (container, item) = schedule.xml_path();
    let slot = tree
        .entry(container.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        // An empty schedule element converts to "".
        *slot = Value::Object(Map::new());
    }
    let Some(container_map) = slot.as_object_mut() else {
        return 0;
    };

    let items = container_map
        .entry(item.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !items.is_array() {
        let single = items.take();
        *items = Value::Array(vec![single]);
        metrics::normalize::schedule_rewrapped(schedule.as_str());
    }
    items.as_array().map_or(0, Vec::len)
}

/// Convert one element into JSON. Leaf elements without attributes become
/// their trimmed text; everything else becomes an object.
pub fn element_to_value(node: Node<'_, '_>) -> Value {
    let children: Vec<Node<'_, '_>> = node.children().filter(Node::is_element).collect();
    let attributes: Map<String, Value> = node
        .attributes()
        .map(|a| (a.name().to_string(), Value::String(a.value().to_string())))
        .collect();

    if children.is_empty() {
        let text = leaf_text(node);
        if attributes.is_empty() {
            return Value::String(text);
        }
        let mut map = Map::new();
        map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        if !text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(text));
        }
        return Value::Object(map);
    }

    let mut map = Map::new();
    if !attributes.is_empty() {
        map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
    }
    for child in children {
        let key = child.tag_name().name().to_string();
        let value = element_to_value(child);
        match map.get_mut(&key) {
            // Element values are never arrays themselves, so an array here
            // means the element has already repeated.
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key, value);
            }
        }
    }
    Value::Object(map)
}

fn leaf_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_non_empty(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}
