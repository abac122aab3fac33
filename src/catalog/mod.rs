//! Catalog data model.
//!
//! Records and drafts are the generic shapes every view operates on; the typed
//! entities mirror the backend's JSON for callers that want named fields.
//! `ViewRegistry` loads the validated view definitions under
//! `schema/views.json`, and `Collection` holds one view's records in memory.

pub mod identity;
pub mod index;
pub mod model;
pub mod record;
pub mod repository;

pub use identity::{Department, RecordId, Role, ViewKey};
pub use index::{VIEWS_SCHEMA_VERSION, ViewRegistry};
pub use model::{AddPolicy, Dimension, Domain, ID_PLACEHOLDER, ViewSpec, ViewsFile};
pub use record::{
    Attachment, Draft, Lecture, Record, Resource, ResourceFile, Subject, scalar_text,
};
pub use repository::Collection;

pub use model::load_views_from_path;
