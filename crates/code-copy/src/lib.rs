//! Copy-to-clipboard buttons for code samples on documentation pages.
//!
//! At page load every copy button is paired with its code block, either via an
//! explicit `data-copy-target` id or by position. Clicking a bound button copies
//! the code text and pulses a `copied` class for two seconds.

pub mod binder;
pub mod components;
pub mod config;
pub mod error;
pub mod page;

#[cfg(feature = "hydrate")]
pub mod dom;

pub use binder::{Binding, Bindings, associate, initialize};
pub use config::BinderConfig;
pub use error::{BindError, CopyError};
