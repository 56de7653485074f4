//! In-process page, clipboard and scheduler.
//!
//! `ManualScheduler` runs on a virtual clock so timer behavior can be checked
//! to the millisecond without sleeping.

use anyhow::Result;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use super::{Clipboard, CodeBody, CopyButton, Marker, Page, Scheduler};
use crate::error::CopyError;

/// Button whose marker state is shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryButton {
    marked: Rc<Cell<bool>>,
    /// Number of times the marker went from off to on
    pulses: Rc<Cell<usize>>,
}

impl MemoryButton {
    pub fn is_marked(&self) -> bool {
        self.marked.get()
    }

    pub fn pulses(&self) -> usize {
        self.pulses.get()
    }
}

impl Marker for MemoryButton {
    fn set_marked(&self, marked: bool) {
        if marked && !self.marked.get() {
            self.pulses.set(self.pulses.get() + 1);
        }
        self.marked.set(marked);
    }
}

/// A page built up in document order. Selectors are ignored: everything added
/// with [`MemoryPage::code`] is a code body and everything added with
/// [`MemoryPage::button`] is a copy button.
#[derive(Debug, Default)]
pub struct MemoryPage {
    bodies: Vec<CodeBody>,
    buttons: Vec<CopyButton<MemoryButton>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page with one positional button per code text
    pub fn with_samples(texts: &[&str]) -> Self {
        texts.iter().fold(Self::new(), |page, text| page.code(None, text).button(None))
    }

    pub fn code(mut self, id: Option<&str>, text: &str) -> Self {
        self.bodies.push(CodeBody {
            id: id.map(str::to_string),
            text: text.to_string(),
        });
        self
    }

    pub fn button(mut self, target: Option<&str>) -> Self {
        self.buttons.push(CopyButton {
            element: MemoryButton::default(),
            target: target.map(str::to_string),
            registered: false,
        });
        self
    }

    /// Flag the button at `index` as already having a click listener
    pub fn mark_registered(&mut self, index: usize) {
        if let Some(button) = self.buttons.get_mut(index) {
            button.registered = true;
        }
    }

    /// Handle sharing marker state with the page's button at `index`
    pub fn button_at(&self, index: usize) -> Option<MemoryButton> {
        self.buttons.get(index).map(|b| b.element.clone())
    }

    pub fn marked(&self) -> Vec<bool> {
        self.buttons.iter().map(|b| b.element.is_marked()).collect()
    }
}

impl Page for MemoryPage {
    type Button = MemoryButton;

    fn code_bodies(&self, _selector: &str) -> Result<Vec<CodeBody>> {
        Ok(self.bodies.clone())
    }

    fn buttons(&self, _selector: &str, _target_attribute: &str) -> Result<Vec<CopyButton<MemoryButton>>> {
        Ok(self.buttons.clone())
    }
}

/// Clipboard that records every write, or rejects them all once denied
#[derive(Debug, Default)]
pub struct RecordingClipboard {
    writes: RefCell<Vec<String>>,
    denied: Cell<bool>,
}

impl RecordingClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denied() -> Self {
        let clipboard = Self::default();
        clipboard.set_denied(true);
        clipboard
    }

    pub fn set_denied(&self, denied: bool) {
        self.denied.set(denied);
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }

    /// Current clipboard contents
    pub fn contents(&self) -> Option<String> {
        self.writes.borrow().last().cloned()
    }
}

impl Clipboard for RecordingClipboard {
    fn write_text<'a>(&'a self, text: &'a str) -> LocalBoxFuture<'a, Result<(), CopyError>> {
        let result = if self.denied.get() {
            Err(CopyError::Rejected("Write permission denied.".to_string()))
        } else {
            self.writes.borrow_mut().push(text.to_string());
            Ok(())
        };
        futures::future::ready(result).boxed_local()
    }
}

struct PendingTask {
    due: Duration,
    seq: u64,
    task: Box<dyn FnOnce()>,
}

/// Scheduler driven by [`ManualScheduler::advance`]
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    pending: RefCell<Vec<PendingTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Move the clock forward, firing due tasks in deadline order.
    /// Tasks scheduled at the same deadline fire in scheduling order.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = {
                let mut pending = self.pending.borrow_mut();
                let earliest = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                earliest.map(|i| pending.swap_remove(i))
            };
            // Run outside the borrow so tasks may schedule more work
            let Some(next) = next else { break };
            self.now.set(next.due);
            (next.task)();
        }
        self.now.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.pending.borrow_mut().push(PendingTask {
            due: self.now.get() + delay,
            seq,
            task,
        });
    }
}
