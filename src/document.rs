//! The output tree (spec section 3 "Document") and its attribute-collection
//! rules (spec 4.4.6), grounded in `bach.py`'s `Document.addAttribute`.

use multimap::MultiMap;

use crate::error::BachError;
use crate::position::Position;
use crate::shorthand::CollectionType;

/// A child is either a nested document or a literal string (spec 9's "tagged
/// unions for tokens and children" design note).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Document(Document),
    Literal(String),
}

/// The output tree node. `label` is set exactly once, before any attribute or
/// child is observed; `attributes` preserves per-key insertion order;
/// `children` preserves insertion order across literals and subdocuments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    label: Option<String>,
    attributes: MultiMap<String, String>,
    children: Vec<Child>,
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn attributes(&self) -> &MultiMap<String, String> {
        &self.attributes
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Set the label. The grammar guarantees this is called exactly once per
    /// scope, before anything else; this is asserted defensively since a
    /// violation would be an internal-invariant breach (spec section 7).
    pub fn set_label(&mut self, label: String, at: Position) -> Result<(), BachError> {
        if self.label.is_some() {
            return Err(BachError::semantic("label set more than once for one document scope", at));
        }
        self.label = Some(label);
        Ok(())
    }

    pub fn push_literal(&mut self, text: String) {
        self.children.push(Child::Literal(text));
    }

    pub fn push_child(&mut self, doc: Document) {
        self.children.push(Child::Document(doc));
    }

    /// Plain (non-shorthand) attribute: always appended, duplicates allowed
    /// (spec section 3: "duplicates allowed unless a shorthand says
    /// otherwise").
    pub fn add_attribute(&mut self, name: String, value: String) {
        self.attributes.insert(name, value);
    }

    /// Shorthand-expanded attribute, subject to the shorthand's collection
    /// rule (spec 4.4.6), mirroring `bach.py`'s `Document.addAttribute`
    /// dispatch on `collectionType`.
    pub fn add_shorthand_attribute(
        &mut self,
        name: &str,
        value: String,
        collection_type: CollectionType,
        at: Position,
    ) -> Result<(), BachError> {
        match collection_type {
            CollectionType::List => {
                self.attributes.insert(name.to_string(), value);
            }
            CollectionType::Set => {
                let already_present = self
                    .attributes
                    .get_vec(name)
                    .map(|values| values.iter().any(|v| v == &value))
                    .unwrap_or(false);
                if !already_present {
                    self.attributes.insert(name.to_string(), value);
                }
            }
            CollectionType::None => {
                let count = self.attributes.get_vec(name).map(|v| v.len()).unwrap_or(0);
                if count >= 1 {
                    return Err(BachError::semantic(
                        format!("multiple values not allowed for attribute '{name}'"),
                        at,
                    ));
                }
                self.attributes.insert(name.to_string(), value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_set_once() {
        let mut d = Document::new();
        d.set_label("doc".to_string(), Position::start()).unwrap();
        assert!(d.set_label("again".to_string(), Position::start()).is_err());
    }

    #[test]
    fn set_collection_dedupes() {
        let mut d = Document::new();
        d.add_shorthand_attribute("class", "a".into(), CollectionType::Set, Position::start()).unwrap();
        d.add_shorthand_attribute("class", "a".into(), CollectionType::Set, Position::start()).unwrap();
        assert_eq!(d.attributes().get_vec("class").unwrap(), &vec!["a".to_string()]);
    }

    #[test]
    fn none_collection_errors_on_second_value() {
        let mut d = Document::new();
        d.add_shorthand_attribute("id", "a".into(), CollectionType::None, Position::start()).unwrap();
        assert!(d
            .add_shorthand_attribute("id", "b".into(), CollectionType::None, Position::start())
            .is_err());
    }

    #[test]
    fn list_collection_keeps_duplicates() {
        let mut d = Document::new();
        d.add_shorthand_attribute("tag", "a".into(), CollectionType::List, Position::start()).unwrap();
        d.add_shorthand_attribute("tag", "a".into(), CollectionType::List, Position::start()).unwrap();
        assert_eq!(d.attributes().get_vec("tag").unwrap().len(), 2);
    }
}
