//! Dataset file formats.
//!
//! - [`descriptor`]: JSON dataset descriptor (`graphs`, `nodes_size_list`, `labels`, ...)

pub mod descriptor;

pub use descriptor::DatasetDescriptor;
