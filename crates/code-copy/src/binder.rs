//! Copy-button binder.
//!
//! Buttons are paired with code bodies once, at initialization. A button with a
//! target attribute binds to the code body with that id; any other button binds
//! to the code body at its own position. Buttons that cannot be paired are
//! reported and left inert, never bound to some other body's text.

use anyhow::Result;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::BinderConfig;
use crate::error::{BindError, CopyError};
use crate::page::{Clipboard, CodeBody, Marker, Page, Scheduler};

/// A copy button paired with the text of its code body
#[derive(Clone)]
pub struct Binding<B> {
    index: usize,
    button: B,
    text: Rc<str>,
    /// Bumped on every successful copy; a revert only applies to the latest one
    generation: Rc<Cell<u64>>,
    registered: bool,
    clipboard: Rc<dyn Clipboard>,
    scheduler: Rc<dyn Scheduler>,
    revert_delay: Duration,
}

impl<B: Marker + Clone + 'static> Binding<B> {
    /// Position of the button among all copy buttons on the page
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn button(&self) -> &B {
        &self.button
    }

    /// Code text captured at initialization
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the button already had a click listener when it was bound
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Copy the code text, then show the marker until `revert_delay` after the
    /// last successful click. A failed write is logged and leaves the marker
    /// untouched.
    pub async fn click(&self) -> Result<(), CopyError> {
        if let Err(e) = self.clipboard.write_text(&self.text).await {
            log::warn!("[code-copy] Copy from button {} failed: {}", self.index, e);
            return Err(e);
        }
        self.pulse();
        Ok(())
    }

    fn pulse(&self) {
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        self.button.set_marked(true);

        let button = self.button.clone();
        let latest = Rc::clone(&self.generation);
        self.scheduler.schedule(
            self.revert_delay,
            Box::new(move || {
                if latest.get() == generation {
                    button.set_marked(false);
                }
            }),
        );
    }
}

/// All buttons found at initialization, bound or not
pub struct Bindings<B> {
    slots: Vec<Option<Binding<B>>>,
    code_bodies: usize,
    errors: Vec<BindError>,
}

impl<B> Bindings<B> {
    /// Binding for the button at `index`, `None` if it is inert or missing
    pub fn get(&self, index: usize) -> Option<&Binding<B>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn bound(&self) -> impl Iterator<Item = &Binding<B>> {
        self.slots.iter().flatten()
    }

    /// Bound buttons that still need a click listener. Calling the entry
    /// point twice must not attach a second listener to the same button.
    pub fn unregistered(&self) -> impl Iterator<Item = &Binding<B>> {
        self.bound().filter(|binding| !binding.registered)
    }

    pub fn bound_count(&self) -> usize {
        self.bound().count()
    }

    /// Number of buttons found, including inert ones
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn code_bodies(&self) -> usize {
        self.code_bodies
    }

    /// Association failures reported at initialization
    pub fn errors(&self) -> &[BindError] {
        &self.errors
    }
}

/// Pair each button (given by its optional target id) with a code body index.
pub fn associate(bodies: &[CodeBody], targets: &[Option<String>]) -> Vec<Result<usize, BindError>> {
    targets
        .iter()
        .enumerate()
        .map(|(button, target)| match target {
            Some(id) => bodies
                .iter()
                .position(|body| body.id.as_deref() == Some(id.as_str()))
                .ok_or_else(|| BindError::UnknownTarget {
                    button,
                    target: id.clone(),
                }),
            None if button < bodies.len() => Ok(button),
            None => Err(BindError::IndexOutOfRange {
                button,
                code_bodies: bodies.len(),
            }),
        })
        .collect()
}

/// Capture code bodies and buttons from the page and bind them.
///
/// Association failures are logged once here and kept in
/// [`Bindings::errors`]; only a failing page query is an `Err`.
pub fn initialize<P: Page>(
    page: &P,
    config: &BinderConfig,
    clipboard: Rc<dyn Clipboard>,
    scheduler: Rc<dyn Scheduler>,
) -> Result<Bindings<P::Button>> {
    config.validate()?;
    let bodies = page.code_bodies(&config.code_selector)?;
    let buttons = page.buttons(&config.button_selector, &config.target_attribute)?;

    let targets: Vec<Option<String>> = buttons.iter().map(|b| b.target.clone()).collect();
    let texts: Vec<Rc<str>> = bodies.iter().map(|b| Rc::from(b.text.as_str())).collect();
    let revert_delay = config.revert_delay();

    let mut slots = Vec::with_capacity(buttons.len());
    let mut errors = Vec::new();

    for (index, (button, association)) in buttons.into_iter().zip(associate(&bodies, &targets)).enumerate() {
        match association {
            Ok(body) => slots.push(Some(Binding {
                index,
                button: button.element,
                text: Rc::clone(&texts[body]),
                generation: Rc::new(Cell::new(0)),
                registered: button.registered,
                clipboard: Rc::clone(&clipboard),
                scheduler: Rc::clone(&scheduler),
                revert_delay,
            })),
            Err(e) => {
                log::warn!("[code-copy] {}", e);
                errors.push(e);
                slots.push(None);
            }
        }
    }

    let bindings = Bindings {
        slots,
        code_bodies: bodies.len(),
        errors,
    };
    log::info!(
        "[code-copy] Bound {} of {} copy buttons to {} code blocks",
        bindings.bound_count(),
        bindings.len(),
        bindings.code_bodies()
    );
    Ok(bindings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::memory::{ManualScheduler, MemoryButton, MemoryPage, RecordingClipboard};

    const DELAY: Duration = Duration::from_millis(2000);
    const TICK: Duration = Duration::from_millis(1);

    fn bind(
        page: &MemoryPage,
        clipboard: &Rc<RecordingClipboard>,
        scheduler: &Rc<ManualScheduler>,
    ) -> Bindings<MemoryButton> {
        initialize(page, &BinderConfig::default(), clipboard.clone(), scheduler.clone()).unwrap()
    }

    fn body(id: Option<&str>, text: &str) -> CodeBody {
        CodeBody {
            id: id.map(str::to_string),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_associate_positional() {
        let bodies = [body(None, "a"), body(None, "b")];
        let result = associate(&bodies, &[None, None]);
        assert_eq!(result, vec![Ok(0), Ok(1)]);
    }

    #[test]
    fn test_associate_extra_button_out_of_range() {
        let bodies = [body(None, "a"), body(None, "b")];
        let result = associate(&bodies, &[None, None, None]);
        assert_eq!(
            result[2],
            Err(BindError::IndexOutOfRange {
                button: 2,
                code_bodies: 2
            })
        );
    }

    #[test]
    fn test_associate_explicit_target_ignores_position() {
        let bodies = [body(Some("first"), "a"), body(Some("second"), "b")];
        let targets = [Some("second".to_string()), Some("first".to_string())];
        assert_eq!(associate(&bodies, &targets), vec![Ok(1), Ok(0)]);
    }

    #[test]
    fn test_associate_unknown_target() {
        let bodies = [body(Some("first"), "a")];
        let result = associate(&bodies, &[Some("missing".to_string())]);
        assert_eq!(
            result,
            vec![Err(BindError::UnknownTarget {
                button: 0,
                target: "missing".to_string()
            })]
        );
    }

    #[test]
    fn test_associate_mixed_explicit_and_positional() {
        let bodies = [body(Some("a"), "first"), body(Some("b"), "second")];
        let targets = [Some("b".to_string()), None];
        assert_eq!(associate(&bodies, &targets), vec![Ok(1), Ok(1)]);
    }

    #[test]
    fn test_associate_duplicate_id_first_wins() {
        let bodies = [body(Some("dup"), "first"), body(Some("dup"), "second")];
        assert_eq!(associate(&bodies, &[Some("dup".to_string())]), vec![Ok(0)]);
    }

    #[test]
    fn test_associate_no_buttons() {
        assert!(associate(&[body(None, "a")], &[]).is_empty());
    }

    #[tokio::test]
    async fn test_click_copies_own_text() {
        let page = MemoryPage::with_samples(&["echo hi", "ls -la", "pwd"]);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);

        for (i, expected) in ["echo hi", "ls -la", "pwd"].iter().enumerate() {
            bindings.get(i).unwrap().click().await.unwrap();
            assert_eq!(clipboard.contents().as_deref(), Some(*expected));
        }
        assert_eq!(clipboard.writes().len(), 3);
    }

    #[tokio::test]
    async fn test_marker_set_immediately_and_cleared_after_delay() {
        let page = MemoryPage::with_samples(&["cargo build"]);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);
        let button = page.button_at(0).unwrap();

        assert!(!button.is_marked());
        bindings.get(0).unwrap().click().await.unwrap();
        assert!(button.is_marked());

        scheduler.advance(DELAY - TICK);
        assert!(button.is_marked(), "marker cleared before the delay elapsed");

        scheduler.advance(TICK);
        assert!(!button.is_marked());
    }

    #[tokio::test]
    async fn test_click_does_not_touch_other_buttons() {
        let page = MemoryPage::with_samples(&["a", "b", "c"]);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);

        bindings.get(0).unwrap().click().await.unwrap();
        assert_eq!(page.marked(), vec![true, false, false]);

        scheduler.advance(Duration::from_millis(500));
        bindings.get(2).unwrap().click().await.unwrap();
        assert_eq!(page.marked(), vec![true, false, true]);

        // Button 0's revert fires at 2000ms and leaves button 2 alone
        scheduler.advance(Duration::from_millis(1500));
        assert_eq!(page.marked(), vec![false, false, true]);

        scheduler.advance(Duration::from_millis(500));
        assert_eq!(page.marked(), vec![false, false, false]);
        assert_eq!(page.button_at(1).unwrap().pulses(), 0);
    }

    #[tokio::test]
    async fn test_reclick_extends_marker_from_last_click() {
        let page = MemoryPage::with_samples(&["make"]);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);
        let button = page.button_at(0).unwrap();
        let binding = bindings.get(0).unwrap();

        binding.click().await.unwrap();
        scheduler.advance(Duration::from_millis(1500));
        binding.click().await.unwrap();

        // First timer fires at 2000ms but is stale
        scheduler.advance(Duration::from_millis(1999));
        assert!(button.is_marked());
        assert_eq!(scheduler.now(), Duration::from_millis(3499));

        scheduler.advance(TICK);
        assert!(!button.is_marked());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(button.pulses(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_shows_no_marker() {
        let page = MemoryPage::with_samples(&["secret"]);
        let clipboard = Rc::new(RecordingClipboard::denied());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);

        let err = bindings.get(0).unwrap().click().await.unwrap_err();
        assert!(matches!(err, CopyError::Rejected(_)));
        assert!(!page.button_at(0).unwrap().is_marked());
        assert_eq!(scheduler.pending(), 0);
        assert!(clipboard.writes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_existing_revert() {
        let page = MemoryPage::with_samples(&["ls"]);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);
        let button = page.button_at(0).unwrap();

        bindings.get(0).unwrap().click().await.unwrap();
        clipboard.set_denied(true);
        scheduler.advance(Duration::from_millis(1000));
        assert!(bindings.get(0).unwrap().click().await.is_err());

        scheduler.advance(Duration::from_millis(1000));
        assert!(!button.is_marked());
    }

    #[tokio::test]
    async fn test_extra_buttons_are_inert() {
        let page = MemoryPage::new()
            .code(None, "first")
            .button(None)
            .code(None, "second")
            .button(None)
            .button(None);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);

        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings.bound_count(), 2);
        assert!(bindings.get(2).is_none());
        assert_eq!(
            bindings.errors(),
            &[BindError::IndexOutOfRange {
                button: 2,
                code_bodies: 2
            }]
        );

        bindings.get(1).unwrap().click().await.unwrap();
        assert_eq!(clipboard.writes(), vec!["second".to_string()]);
    }

    #[tokio::test]
    async fn test_explicit_targets_bind_out_of_order() {
        let page = MemoryPage::new()
            .code(Some("install"), "cargo install code-copy")
            .code(Some("run"), "code-copy --help")
            .button(Some("run"))
            .button(Some("install"))
            .button(Some("gone"));
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);

        assert_eq!(bindings.get(0).unwrap().text(), "code-copy --help");
        assert_eq!(bindings.get(1).unwrap().text(), "cargo install code-copy");
        assert!(bindings.get(2).is_none());
        assert!(matches!(bindings.errors(), [BindError::UnknownTarget { button: 2, .. }]));
    }

    #[test]
    fn test_initialize_rejects_zero_delay() {
        let page = MemoryPage::with_samples(&["x"]);
        let config = BinderConfig {
            revert_delay_ms: 0,
            ..BinderConfig::default()
        };
        let result = initialize(
            &page,
            &config,
            Rc::new(RecordingClipboard::new()),
            Rc::new(ManualScheduler::new()),
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("revert_delay_ms"));
    }

    #[test]
    fn test_initialize_rejects_delay_past_timer_range() {
        let page = MemoryPage::with_samples(&["x"]);
        let config = BinderConfig {
            revert_delay_ms: 3_000_000_000,
            ..BinderConfig::default()
        };
        let result = initialize(
            &page,
            &config,
            Rc::new(RecordingClipboard::new()),
            Rc::new(ManualScheduler::new()),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_registered_buttons_stay_bound_but_need_no_listener() {
        let mut page = MemoryPage::with_samples(&["one", "two", "three"]);
        page.mark_registered(0);
        page.mark_registered(2);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let bindings = bind(&page, &clipboard, &scheduler);

        assert_eq!(bindings.bound_count(), 3);
        let fresh: Vec<usize> = bindings.unregistered().map(|b| b.index()).collect();
        assert_eq!(fresh, vec![1]);

        // Positions are unchanged, so the second pass binds the same text
        assert!(bindings.get(2).unwrap().is_registered());
        assert_eq!(bindings.get(2).unwrap().text(), "three");
    }

    #[test]
    fn test_custom_delay_is_used() {
        let page = MemoryPage::with_samples(&["x"]);
        let clipboard = Rc::new(RecordingClipboard::new());
        let scheduler = Rc::new(ManualScheduler::new());
        let config = BinderConfig {
            revert_delay_ms: 300,
            ..BinderConfig::default()
        };
        let bindings = initialize(&page, &config, clipboard, scheduler.clone()).unwrap();

        futures::executor::block_on(bindings.get(0).unwrap().click()).unwrap();
        scheduler.advance(Duration::from_millis(299));
        assert!(page.button_at(0).unwrap().is_marked());
        scheduler.advance(TICK);
        assert!(!page.button_at(0).unwrap().is_marked());
    }
}
