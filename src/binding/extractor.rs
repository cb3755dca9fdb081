//! Value extraction: reads the current state of every collected element into
//! a [`ValueSnapshot`] of the same shape.
//!
//! - checkbox → `Bool(checked)`
//! - `type="number"` → `Number`, NaN when the text is not numeric
//! - everything else → `String(value)`

use super::collector::{InputNode, InputTree};
use crate::dom::{Document, NodeId};
use crate::value::{FieldValue, SnapshotEntry, ValueSnapshot};
use tracing::warn;

/// Populates `values` in place from `inputs` and returns it.
///
/// Nested groups missing from `values` are created. Running it twice without
/// a DOM change in between yields equal snapshots (NaN aside).
pub fn gather_values<'a>(
    document: &Document,
    values: &'a mut ValueSnapshot,
    inputs: &InputTree,
) -> &'a mut ValueSnapshot {
    for (name, node) in inputs.iter() {
        match node {
            InputNode::Field(element) => {
                values.insert(name, read_field(document, *element));
            }
            InputNode::Group(tree) => {
                let mut nested = match values.get_mut(name) {
                    Some(SnapshotEntry::Group(existing)) => std::mem::take(existing),
                    _ => ValueSnapshot::new(),
                };
                gather_values(document, &mut nested, tree);
                values.insert(name, nested);
            }
        }
    }
    values
}

/// Typed value of a single control.
pub fn read_field(document: &Document, node: NodeId) -> FieldValue {
    let value = document.with_element(node, |el| {
        if el.is_checkbox() {
            FieldValue::Bool(el.checked())
        } else if el.is_numeric() {
            FieldValue::Number(parse_number(el.value()))
        } else {
            FieldValue::String(el.value().to_string())
        }
    });
    value.unwrap_or_else(|| {
        warn!("Collected element {} is no longer in the document", node);
        FieldValue::String(String::new())
    })
}

/// Numeric conversion for `type="number"` fields.
///
/// Surrounding whitespace is ignored. Blank text, and anything that is not a
/// decimal number, `Infinity` or a `0x`/`0o`/`0b` integer, is NaN.
pub fn parse_number(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return f64::NAN;
    }

    let (sign, unsigned) = match text.as_bytes()[0] {
        b'-' => (-1.0, &text[1..]),
        b'+' => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }

    let radix = match unsigned.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &unsigned[2..];
        // prefixed integers take no sign
        if sign < 0.0 || text.starts_with('+') || digits.starts_with('+') {
            return f64::NAN;
        }
        return u64::from_str_radix(digits, radix)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }

    // Rust also accepts "inf"/"nan" spellings, which are not numbers here
    let is_decimal = unsigned
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
    if !is_decimal || !unsigned.bytes().any(|b| b.is_ascii_digit()) {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::collector::{gather_inputs, FallbackIds};
    use crate::dom::Element;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("42", 42.0)]
    #[case("  -3.5 ", -3.5)]
    #[case("+7", 7.0)]
    #[case("1e3", 1000.0)]
    #[case(".5", 0.5)]
    #[case("5.", 5.0)]
    #[case("0x1F", 31.0)]
    #[case("0b101", 5.0)]
    #[case("0o17", 15.0)]
    #[case("Infinity", f64::INFINITY)]
    #[case("-Infinity", f64::NEG_INFINITY)]
    fn parses_numbers(#[case] text: &str, #[case] expected: f64) {
        assert_eq!(parse_number(text), expected);
    }

    #[rstest]
    #[case(1e21)]
    #[case(-3.25e25)]
    #[case(4e-9)]
    #[case(1234.5)]
    fn display_text_parses_back(#[case] n: f64) {
        assert_eq!(parse_number(&FieldValue::Number(n).to_string()), n);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc")]
    #[case("12abc")]
    #[case("inf")]
    #[case("NaN")]
    #[case("-0x10")]
    #[case("0x+1")]
    #[case("1.2.3")]
    #[case("-")]
    fn non_numbers_are_nan(#[case] text: &str) {
        assert!(parse_number(text).is_nan());
    }

    fn login_form() -> (Document, InputTree) {
        let doc = Document::new();
        let form = doc.append(doc.root(), Element::form().with_id("login")).unwrap();
        doc.append(form, Element::input("text").with_name("user").with_value("bob"))
            .unwrap();
        doc.append(form, Element::input("checkbox").with_name("remember").with_checked(true))
            .unwrap();
        doc.append(form, Element::input("number").with_name("age").with_value("31"))
            .unwrap();
        let address = doc.append(form, Element::fieldset().with_name("address")).unwrap();
        doc.append(address, Element::select().with_name("country").with_value("AT"))
            .unwrap();
        let tree = gather_inputs(&doc, form, &FallbackIds::default());
        (doc, tree)
    }

    #[test]
    fn snapshot_mirrors_input_tree() {
        let (doc, tree) = login_form();
        let mut values = ValueSnapshot::new();
        gather_values(&doc, &mut values, &tree);

        assert_eq!(values.value("user"), Some(&FieldValue::from("bob")));
        assert_eq!(values.value("remember"), Some(&FieldValue::Bool(true)));
        assert_eq!(values.value("age"), Some(&FieldValue::Number(31.0)));
        assert_eq!(
            values.group("address").and_then(|g| g.value("country")),
            Some(&FieldValue::from("AT"))
        );
        assert_eq!(values.keys().collect::<Vec<_>>(), tree.keys().collect::<Vec<_>>());
        assert_eq!(values.field_count(), tree.field_count());
    }

    #[test]
    fn extraction_is_idempotent() {
        let (doc, tree) = login_form();
        let mut first = ValueSnapshot::new();
        gather_values(&doc, &mut first, &tree);
        let mut second = first.clone();
        gather_values(&doc, &mut second, &tree);
        assert_eq!(first, second);
    }

    #[test]
    fn blank_number_field_is_nan() {
        let doc = Document::new();
        let form = doc.append(doc.root(), Element::form()).unwrap();
        doc.append(form, Element::input("number").with_name("qty"))
            .unwrap();
        let tree = gather_inputs(&doc, form, &FallbackIds::default());

        let mut values = ValueSnapshot::new();
        gather_values(&doc, &mut values, &tree);
        let qty = values.value("qty").and_then(FieldValue::as_number).unwrap();
        assert!(qty.is_nan());
        assert_ne!(values.value("qty"), values.value("qty"));
    }

    #[test]
    fn replaces_a_stale_leaf_where_a_group_belongs() {
        let (doc, tree) = login_form();
        let mut values = ValueSnapshot::new();
        values.insert("address", FieldValue::from("stale"));
        gather_values(&doc, &mut values, &tree);
        assert!(values.group("address").is_some());
    }
}
