//! Platform capabilities the binder consumes.
//!
//! The browser implementations live in [`crate::dom`]; [`memory`] holds an
//! in-process page used off the browser (tests, previews).

pub mod memory;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use std::time::Duration;

use crate::error::CopyError;

/// A code body captured at initialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBody {
    /// Element id, if the page gave it one
    pub id: Option<String>,
    /// Rendered plain text of the code sample
    pub text: String,
}

/// A copy button as found on the page
#[derive(Debug, Clone)]
pub struct CopyButton<B> {
    pub element: B,
    /// Explicit code body id from the target attribute
    pub target: Option<String>,
    /// Already carries a click listener from an earlier binding pass
    pub registered: bool,
}

/// Render-tree queries, both returning elements in document order.
pub trait Page {
    type Button: Marker + Clone + 'static;

    fn code_bodies(&self, selector: &str) -> Result<Vec<CodeBody>>;

    fn buttons(&self, selector: &str, target_attribute: &str) -> Result<Vec<CopyButton<Self::Button>>>;
}

/// The "copied" presentation marker on a button.
pub trait Marker {
    fn set_marked(&self, marked: bool);
}

/// Async write-text-to-clipboard.
pub trait Clipboard {
    fn write_text<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, Result<(), CopyError>>;
}

/// One-shot deferred callbacks. There is no cancellation handle.
pub trait Scheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>);
}
