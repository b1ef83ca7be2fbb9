//! Utility modules shared by the server, the watcher and the pipeline.

pub mod exec;
pub mod html;
pub mod mime;
pub mod path;
