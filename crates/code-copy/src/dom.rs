//! Browser bindings (hydrate feature): `web-sys` implementations of the page
//! traits and the exported entry point.

use anyhow::{Result, anyhow};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use gloo_timers::callback::Timeout;
use std::rc::Rc;
use std::time::Duration;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlElement};

use crate::binder::{self, Binding};
use crate::config::{BOUND_ATTRIBUTE, BinderConfig, timer_millis};
use crate::error::CopyError;
use crate::page::{Clipboard, CodeBody, CopyButton, Marker, Page, Scheduler};

/// The live document
pub struct DomPage {
    document: Document,
    marker_class: Rc<str>,
}

impl DomPage {
    pub fn new(document: Document, marker_class: &str) -> Self {
        Self {
            document,
            marker_class: Rc::from(marker_class),
        }
    }

    fn query_all(&self, selector: &str) -> Result<Vec<Element>> {
        let nodes = self
            .document
            .query_selector_all(selector)
            .map_err(|e| anyhow!("Invalid selector `{}`: {}", selector, describe(&e)))?;
        Ok((0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect())
    }
}

impl Page for DomPage {
    type Button = DomButton;

    fn code_bodies(&self, selector: &str) -> Result<Vec<CodeBody>> {
        Ok(self
            .query_all(selector)?
            .into_iter()
            .map(|element| {
                // innerText is the rendered text, without line-number gutters hidden by CSS
                let text = match element.dyn_ref::<HtmlElement>() {
                    Some(html) => html.inner_text(),
                    None => element.text_content().unwrap_or_default(),
                };
                let id = element.id();
                CodeBody {
                    id: (!id.is_empty()).then_some(id),
                    text,
                }
            })
            .collect())
    }

    fn buttons(&self, selector: &str, target_attribute: &str) -> Result<Vec<CopyButton<DomButton>>> {
        Ok(self
            .query_all(selector)?
            .into_iter()
            .map(|element| CopyButton {
                target: element.get_attribute(target_attribute).filter(|t| !t.is_empty()),
                registered: element.has_attribute(BOUND_ATTRIBUTE),
                element: DomButton {
                    element,
                    marker_class: Rc::clone(&self.marker_class),
                },
            })
            .collect())
    }
}

/// A copy button element; the marker is a class on it
#[derive(Clone)]
pub struct DomButton {
    element: Element,
    marker_class: Rc<str>,
}

impl DomButton {
    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Marker for DomButton {
    fn set_marked(&self, marked: bool) {
        let classes = self.element.class_list();
        let result = if marked {
            classes.add_1(&self.marker_class)
        } else {
            classes.remove_1(&self.marker_class)
        };
        if let Err(e) = result {
            log::warn!("[code-copy] Failed to update `{}` class: {}", self.marker_class, describe(&e));
        }
    }
}

/// `navigator.clipboard`
pub struct NavigatorClipboard;

impl Clipboard for NavigatorClipboard {
    fn write_text<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, Result<(), CopyError>> {
        async move {
            let clipboard = web_sys::window()
                .map(|w| w.navigator().clipboard())
                .ok_or(CopyError::Unavailable)?;
            // Undefined outside secure contexts
            if AsRef::<JsValue>::as_ref(&clipboard).is_undefined() {
                return Err(CopyError::Unavailable);
            }
            JsFuture::from(clipboard.write_text(text))
                .await
                .map(|_| ())
                .map_err(|e| CopyError::Rejected(describe(&e)))
        }
        .boxed_local()
    }
}

/// `setTimeout` via gloo-timers
pub struct TimeoutScheduler;

impl Scheduler for TimeoutScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        // Fire-and-forget: revert timers are never cancelled
        Timeout::new(timer_millis(delay), task).forget();
    }
}

fn describe(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    match value.dyn_ref::<js_sys::Error>() {
        Some(err) => String::from(err.message()),
        None => format!("{:?}", value),
    }
}

fn register_click(binding: Binding<DomButton>) -> Result<()> {
    let element = binding.button().element().clone();
    let handler = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
        let binding = binding.clone();
        wasm_bindgen_futures::spawn_local(async move {
            // Failures are already logged by the binding
            let _ = binding.click().await;
        });
    });
    element
        .add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())
        .map_err(|e| anyhow!("Failed to add click listener: {}", describe(&e)))?;
    // Bindings live as long as the page
    handler.forget();
    if let Err(e) = element.set_attribute(BOUND_ATTRIBUTE, "") {
        log::warn!("[code-copy] Failed to set `{}`: {}", BOUND_ATTRIBUTE, describe(&e));
    }
    Ok(())
}

/// Bind every copy button in `document`. Returns the number of buttons that
/// got a click listener on this call; buttons carrying `data-copy-bound` from
/// an earlier call are skipped.
pub fn bind_document(document: Document, config: &BinderConfig) -> Result<usize> {
    let page = DomPage::new(document, &config.marker_class);
    let bindings = binder::initialize(&page, config, Rc::new(NavigatorClipboard), Rc::new(TimeoutScheduler))?;

    let mut bound = 0;
    for binding in bindings.unregistered() {
        let index = binding.index();
        match register_click(binding.clone()) {
            Ok(()) => bound += 1,
            Err(e) => log::warn!("[code-copy] Button {} left unbound: {}", index, e),
        }
    }
    Ok(bound)
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

/// Entry point called from the page once the DOM is ready.
///
/// `config_toml` overrides selectors, marker class or delay; `undefined` keeps
/// the defaults.
#[wasm_bindgen(js_name = bindCopyButtons)]
pub fn bind_copy_buttons(config_toml: Option<String>) -> Result<usize, JsValue> {
    let config = match config_toml.as_deref() {
        Some(toml) => BinderConfig::from_toml_str(toml).map_err(|e| JsValue::from_str(&format!("{:#}", e)))?,
        None => BinderConfig::default(),
    };
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document available"))?;

    bind_document(document, &config).map_err(|e| {
        log::error!("[code-copy] Initialization failed: {:#}", e);
        JsValue::from_str(&format!("{:#}", e))
    })
}
