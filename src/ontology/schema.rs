//! Ontology schema types shared by the extraction pipeline's Validate stage
//! and the query generator's priming-text builders.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum XsdType {
    Integer,
    Decimal,
    Date,
    DateTime,
    Boolean,
    AnyUri,
    String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataProperty {
    pub name: String,
    pub domain_class: String,
    pub range: XsdType,
    /// Whether every instance of `domain_class` MUST carry this property.
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub name: String,
    pub domain_class: String,
    pub range_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub iri: String,
    pub identity_attrs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OntologySchema {
    pub ontology_version: String,
    pub classes: Vec<ClassDef>,
    pub data_properties: Vec<DataProperty>,
    pub object_properties: Vec<ObjectProperty>,
}

impl OntologySchema {
    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn data_properties_for(&self, class: &str) -> Vec<&DataProperty> {
        self.data_properties.iter().filter(|p| p.domain_class.eq_ignore_ascii_case(class)).collect()
    }

    pub fn object_properties_for(&self, class: &str) -> Vec<&ObjectProperty> {
        self.object_properties.iter().filter(|p| p.domain_class.eq_ignore_ascii_case(class)).collect()
    }

    pub fn relationship(&self, name: &str) -> Option<&ObjectProperty> {
        self.object_properties.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}
