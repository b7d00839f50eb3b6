//! Compiles parsed filters into JPQL-style queries against a schema catalog.

pub mod query;
pub mod schema;
pub mod transform;

pub use query::{
    BoundValue, CompileError, CompiledQuery, CompilerOptions, QueryCompiler,
};
pub use schema::{
    AssociationKind, Attribute, AttributeType, PathError, ScalarType, SchemaCatalog,
    StaticCatalog,
};
pub use transform::{FieldNaming, FieldTransform};
