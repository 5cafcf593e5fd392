//! Attribute value assertion matching

use ldapd_core::traits::SchemaResolver;
use ldapd_core::types::{AttributeAssertion, Entry, Verdict};
use tracing::trace;

/// Match `assertion` against the attributes of `entry`
///
/// Every attribute covered by the assertion descriptor (same type or a
/// subtype, with at least the asserted options) takes part. Stored values
/// are normalized under the assertion's equality rule against the same
/// `schema` snapshot the assertion came from; values that do not normalize
/// never match.
pub fn compare_entry(
    entry: &Entry,
    assertion: &AttributeAssertion,
    schema: &dyn SchemaResolver,
) -> Verdict {
    let rule = match assertion.desc.equality() {
        Some(rule) => rule,
        None => return Verdict::NoSuchAttribute,
    };

    let mut verdict = Verdict::NoSuchAttribute;
    for attribute in entry.attributes_for(&assertion.desc) {
        verdict = Verdict::False;
        for value in &attribute.values {
            match schema.normalize_under(rule, value) {
                Ok(normalized) if normalized == assertion.value => return Verdict::True,
                Ok(_) => {}
                Err(_) => trace!("Skipping unnormalizable value of {}", attribute.desc),
            }
        }
    }
    verdict
}
