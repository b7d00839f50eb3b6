use std::collections::BTreeMap;

use serde::Deserialize;

use super::{AssociationKind, Attribute, AttributeType, ScalarType, SchemaCatalog};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid schema document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("entity '{0}' is defined more than once")]
    DuplicateEntity(String),
    #[error("attribute '{entity}.{attribute}' is defined more than once")]
    DuplicateAttribute { entity: String, attribute: String },
    #[error("identifier '{id}' of entity '{entity}' is not one of its attributes")]
    MissingIdentifier { entity: String, id: String },
    #[error("association '{entity}.{attribute}' needs a target entity")]
    MissingTarget { entity: String, attribute: String },
    #[error("association '{entity}.{attribute}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        attribute: String,
        target: String,
    },
}

/// The `type` of an attribute in a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AttributeKindDef {
    Scalar(ScalarType),
    Association(AssociationKind),
}

/// Attribute as written in a schema document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKindDef,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub mapped_by: Option<String>,
}

/// Entity as written in a schema document.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDef {
    pub name: String,
    #[serde(default = "default_id")]
    pub id: String,
    pub attributes: Vec<AttributeDef>,
}

fn default_id() -> String {
    "id".to_string()
}

impl EntityDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: default_id(),
            attributes: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn scalar(mut self, name: impl Into<String>, scalar: ScalarType) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            kind: AttributeKindDef::Scalar(scalar),
            target: None,
            mapped_by: None,
        });
        self
    }

    pub fn association(
        mut self,
        name: impl Into<String>,
        kind: AssociationKind,
        target: impl Into<String>,
        mapped_by: Option<&str>,
    ) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            kind: AttributeKindDef::Association(kind),
            target: Some(target.into()),
            mapped_by: mapped_by.map(str::to_string),
        });
        self
    }
}

#[derive(Debug, Deserialize)]
struct SchemaDocument {
    entities: Vec<EntityDef>,
}

#[derive(Debug, Clone)]
struct EntityType {
    id: String,
    attributes: Vec<Attribute>,
}

/// In-memory catalog built from entity definitions.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    types: BTreeMap<String, EntityType>,
}

impl StaticCatalog {
    /// Build a catalog, checking identifiers and association targets.
    pub fn new(entities: Vec<EntityDef>) -> Result<Self, CatalogError> {
        let names: Vec<String> = entities.iter().map(|e| e.name.clone()).collect();
        let mut types = BTreeMap::new();

        for entity in entities {
            let mut attributes: Vec<Attribute> = Vec::with_capacity(entity.attributes.len());
            for def in entity.attributes {
                if attributes.iter().any(|a| a.name == def.name) {
                    return Err(CatalogError::DuplicateAttribute {
                        entity: entity.name,
                        attribute: def.name,
                    });
                }
                let kind = match def.kind {
                    AttributeKindDef::Scalar(scalar) => AttributeType::Scalar(scalar),
                    AttributeKindDef::Association(kind) => {
                        let Some(target) = def.target else {
                            return Err(CatalogError::MissingTarget {
                                entity: entity.name,
                                attribute: def.name,
                            });
                        };
                        if !names.contains(&target) {
                            return Err(CatalogError::UnknownTarget {
                                entity: entity.name,
                                attribute: def.name,
                                target,
                            });
                        }
                        AttributeType::Association {
                            kind,
                            target,
                            mapped_by: def.mapped_by,
                        }
                    }
                };
                attributes.push(Attribute {
                    name: def.name,
                    declaring_type: entity.name.clone(),
                    kind,
                });
            }

            if !attributes.iter().any(|a| a.name == entity.id) {
                return Err(CatalogError::MissingIdentifier {
                    entity: entity.name,
                    id: entity.id,
                });
            }
            if types.contains_key(&entity.name) {
                return Err(CatalogError::DuplicateEntity(entity.name));
            }
            types.insert(
                entity.name,
                EntityType {
                    id: entity.id,
                    attributes,
                },
            );
        }

        tracing::debug!(entities = types.len(), "built schema catalog");
        Ok(Self { types })
    }

    /// Load a catalog from a JSON document of the form
    /// `{"entities": [{"name", "id", "attributes": [{"name", "type", "target", "mappedBy"}]}]}`.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: SchemaDocument = serde_json::from_str(json)?;
        Self::new(document.entities)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl SchemaCatalog for StaticCatalog {
    fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    fn attribute(&self, type_name: &str, name: &str) -> Option<&Attribute> {
        self.types
            .get(type_name)?
            .attributes
            .iter()
            .find(|a| a.name == name)
    }

    fn attributes(&self, type_name: &str) -> Vec<&Attribute> {
        self.types
            .get(type_name)
            .map(|t| t.attributes.iter().collect())
            .unwrap_or_default()
    }

    fn identifier_attribute_name(&self, type_name: &str) -> Option<&str> {
        self.types.get(type_name).map(|t| t.id.as_str())
    }
}
