//! Configuration section definitions.
//!
//! Each module corresponds to a section in `devroot.toml`:
//!
//! | Module     | TOML Section   | Purpose                               |
//! |------------|----------------|---------------------------------------|
//! | `serve`    | `[serve]`      | HTTP and live-reload endpoints        |
//! | `mount`    | `[[mounts]]`   | Logical prefixes and document roots   |
//! | `watch`    | `[watch]`      | Backend selection and debounce window |
//! | `template` | `[template]`   | Template engine and extensions        |
//! | `pipeline` | `[pipeline]`   | External resource pipeline command    |

mod mount;
mod pipeline;
mod serve;
mod template;
mod watch;

pub use mount::MountConfig;
pub use pipeline::PipelineConfig;
pub use serve::ServeConfig;
pub use template::{EngineKind, TemplateConfig};
pub use watch::{BackendKind, WatchConfig};
