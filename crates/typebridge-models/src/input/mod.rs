//! Input readers - parse source modules into declarations.

#[cfg(feature = "read-python")]
pub mod annotation;

#[cfg(feature = "read-python")]
pub mod python;

#[cfg(feature = "read-python")]
pub use annotation::parse_type;

#[cfg(feature = "read-python")]
pub use python::{PYTHON_READER, PythonReader, clean_docstring, read_python};
