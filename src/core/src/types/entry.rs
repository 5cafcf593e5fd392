//! Directory entries

use crate::types::dn::Dn;
use crate::types::schema::AttributeDescriptor;

/// One attribute of an entry: a description and its set of values
#[derive(Debug, Clone)]
pub struct Attribute {
    pub desc: AttributeDescriptor,
    pub values: Vec<Vec<u8>>,
}

impl Attribute {
    pub fn new(desc: AttributeDescriptor, values: Vec<Vec<u8>>) -> Self {
        Self { desc, values }
    }
}

/// Entry: a DN and an ordered list of attributes
#[derive(Debug, Clone)]
pub struct Entry {
    dn: Dn,
    attributes: Vec<Attribute>,
}

impl Entry {
    /// Create an entry with no attributes
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Vec::new(),
        }
    }

    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Add values, merging into an existing attribute with the same description
    ///
    /// Values already present (byte-identical) are not duplicated.
    pub fn add_values<I, V>(&mut self, desc: AttributeDescriptor, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let values = values.into_iter().map(Into::into);
        match self.attributes.iter_mut().find(|a| a.desc == desc) {
            Some(existing) => {
                for value in values {
                    if !existing.values.contains(&value) {
                        existing.values.push(value);
                    }
                }
            }
            None => {
                let mut unique: Vec<Vec<u8>> = Vec::new();
                for value in values {
                    if !unique.contains(&value) {
                        unique.push(value);
                    }
                }
                self.attributes.push(Attribute::new(desc, unique));
            }
        }
    }

    /// Builder form of [`Entry::add_values`]
    pub fn with_values<I, V>(mut self, desc: AttributeDescriptor, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        self.add_values(desc, values);
        self
    }

    /// Attributes covered by an assertion on `desc` (same type or subtype)
    pub fn attributes_for<'a>(
        &'a self,
        desc: &'a AttributeDescriptor,
    ) -> impl Iterator<Item = &'a Attribute> + 'a {
        self.attributes.iter().filter(move |a| a.desc.is_covered_by(desc))
    }

    /// Values of the attribute whose type carries `name`, options ignored
    pub fn values_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.attributes
            .iter()
            .filter(move |a| a.desc.attr_type().has_name(name))
            .flat_map(|a| a.values.iter().map(Vec::as_slice))
    }

    /// Whether the entry lists `class` among its object classes
    pub fn has_object_class(&self, class: &str) -> bool {
        self.values_named("objectClass")
            .any(|v| std::str::from_utf8(v).map_or(false, |s| s.trim().eq_ignore_ascii_case(class)))
    }
}
