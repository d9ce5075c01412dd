pub mod form;
pub mod model;

pub use form::{DynamicField, FieldType, label_for, process_attributes};
pub use model::{
    Category, CategoryList, CategoryRef, CreateEntityRequest, Entity, EntityImage, EntityList,
    SearchFilter, SearchParams, images_from_value,
};
