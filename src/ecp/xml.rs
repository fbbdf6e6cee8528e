use std::collections::BTreeMap;

use quick_xml::events::BytesStart;

use crate::error::Result;

/// Tag name of an element, lossily decoded.
pub fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

/// All attributes of an element in declaration-independent (sorted) order.
pub fn attributes(e: &BytesStart<'_>) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        map.insert(key, value);
    }
    Ok(map)
}

/// Parse the boolean spellings the device uses in attributes and leaf text.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// "1234 ms" -> 1234
pub fn parse_millis(value: &str) -> Option<u64> {
    value
        .trim()
        .trim_end_matches("ms")
        .trim()
        .parse::<u64>()
        .ok()
}
