//! Schema metadata the compiler resolves field paths against.

mod catalog;

pub use catalog::{AttributeDef, AttributeKindDef, CatalogError, EntityDef, StaticCatalog};

#[cfg(test)]
pub(crate) use catalog::tests::company;

use serde::{Deserialize, Serialize};

/// Scalar attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarType {
    String,
    Integer,
    Float,
    Boolean,
    /// Calendar date without time.
    Date,
    /// Time of day without date.
    Time,
    LocalDateTime,
    Instant,
    OffsetDateTime,
    ZonedDateTime,
    OffsetTime,
    /// Generic SQL timestamp.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    ManyToOne,
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl AssociationKind {
    pub fn is_collection(self) -> bool {
        matches!(self, AssociationKind::OneToMany | AssociationKind::ManyToMany)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    Scalar(ScalarType),
    Association {
        kind: AssociationKind,
        target: String,
        mapped_by: Option<String>,
    },
}

/// A named attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub declaring_type: String,
    pub kind: AttributeType,
}

impl Attribute {
    pub fn is_association(&self) -> bool {
        matches!(self.kind, AttributeType::Association { .. })
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.kind, AttributeType::Association { kind, .. } if kind.is_collection())
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            AttributeType::Scalar(t) => Some(t),
            AttributeType::Association { .. } => None,
        }
    }

    /// Entity type an association navigates to.
    pub fn target(&self) -> Option<&str> {
        match &self.kind {
            AttributeType::Association { target, .. } => Some(target),
            AttributeType::Scalar(_) => None,
        }
    }

    pub fn mapped_by(&self) -> Option<&str> {
        match &self.kind {
            AttributeType::Association { mapped_by, .. } => mapped_by.as_deref(),
            AttributeType::Scalar(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.scalar_type(),
            Some(ScalarType::Integer | ScalarType::Float)
        )
    }

    pub fn is_boolean(&self) -> bool {
        self.scalar_type() == Some(ScalarType::Boolean)
    }
}

/// Why a dotted path did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("unknown entity type '{0}'")]
    UnknownType(String),
    #[error("no attribute '{attribute}' defined for entity '{type_name}'")]
    UnknownAttribute { type_name: String, attribute: String },
    #[error("non-association attribute '{0}' encountered before the end of the path")]
    NotNavigable(String),
    #[error("empty path")]
    Empty,
}

/// Read access to entity metadata.
pub trait SchemaCatalog: Send + Sync {
    fn has_type(&self, type_name: &str) -> bool;

    /// Direct attribute of a type.
    fn attribute(&self, type_name: &str, name: &str) -> Option<&Attribute>;

    /// All attributes of a type in declaration order.
    fn attributes(&self, type_name: &str) -> Vec<&Attribute>;

    fn identifier_attribute_name(&self, type_name: &str) -> Option<&str>;

    /// Walk `path` from `root_type`. Associations navigate to their target; a
    /// scalar may only appear as the last segment.
    fn resolve_path(&self, root_type: &str, path: &str) -> Result<&Attribute, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if !self.has_type(root_type) {
            return Err(PathError::UnknownType(root_type.to_string()));
        }

        let segments: Vec<&str> = path.split('.').collect();
        let mut current_type = root_type;
        let mut found = None;
        for (i, segment) in segments.iter().enumerate() {
            let attribute = self.attribute(current_type, segment).ok_or_else(|| {
                PathError::UnknownAttribute {
                    type_name: current_type.to_string(),
                    attribute: segment.to_string(),
                }
            })?;
            match attribute.target() {
                Some(target) => current_type = target,
                None if i + 1 < segments.len() => {
                    return Err(PathError::NotNavigable(segment.to_string()))
                }
                None => {}
            }
            found = Some(attribute);
        }
        found.ok_or(PathError::Empty)
    }

    fn is_valid_path(&self, root_type: &str, path: &str) -> bool {
        self.resolve_path(root_type, path).is_ok()
    }

    fn target_type<'a>(&self, attribute: &'a Attribute) -> Option<&'a str> {
        attribute.target()
    }

    /// The attribute on `target_type` that points back at `source_attribute`:
    /// either the one it is `mapped_by`, or the one whose `mapped_by` names it.
    fn inverse_attribute(
        &self,
        source_type: &str,
        source_attribute: &Attribute,
        target_type: &str,
    ) -> Option<&Attribute> {
        if let Some(mapped_by) = source_attribute.mapped_by().filter(|m| !m.is_empty()) {
            return self.attribute(target_type, mapped_by);
        }
        self.attributes(target_type).into_iter().find(|candidate| {
            candidate.target() == Some(source_type)
                && candidate.mapped_by() == Some(source_attribute.name.as_str())
        })
    }

    fn is_association(&self, attribute: &Attribute) -> bool {
        attribute.is_association()
    }

    fn is_collection(&self, attribute: &Attribute) -> bool {
        attribute.is_collection()
    }

    fn is_numeric(&self, attribute: &Attribute) -> bool {
        attribute.is_numeric()
    }

    fn is_boolean(&self, attribute: &Attribute) -> bool {
        attribute.is_boolean()
    }
}
