//! Tool dispatch core shared by every server.
//!
//! - **schema**: tool descriptors and typed parameter declarations
//! - **validate**: the single routine that checks raw arguments against a descriptor
//! - **dispatcher**: lookup, validation, bounded invocation and error translation
//! - **result** / **error**: the normalized success/failure shapes

mod dispatcher;
mod error;
mod result;
mod schema;
mod validate;


pub use dispatcher::{Dispatcher, ToolSet};
pub use error::{ErrorKind, ToolError, ToolOutcome};
pub use result::ToolResult;
pub use schema::{ArgValue, Bounds, BoundsPolicy, ParamKind, ParamSpec, ToolDescriptor};
pub use validate::{Arguments, validate};
