//! Building blocks shared by every schema type
//!
//! - **Errors**: [`SchemaError`] for malformed definitions, [`ValidationError`]
//!   and its [`Detail`]s for rejected values
//! - **Options**: [`ValidationOptions`] per call, [`Settings`] per node
//! - **Language**: message templates and rendering
//! - **References**: [`Ref`] and the ancestor chain it resolves against

mod annotate;
pub mod error;
pub mod language;
pub mod options;
pub mod reference;
pub(crate) mod state;

pub use error::{AssertError, Context, Detail, Report, SchemaError, ValidationError};
pub use language::Language;
pub use options::{Presence, Settings, StripUnknown, ValidationOptions};
pub use reference::{Ref, RefScope};
pub use state::PathSegment;
