//! Binder configuration: selectors, marker class and revert delay.
//!
//! Defaults match the markup rendered by [`crate::components::CodeSample`].
//! Pages with different markup can pass a TOML override to the entry point.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::time::Duration;

pub const CODE_HEADER_CLASS: &str = "code-block-header";
pub const CODE_BODY_CLASS: &str = "highlighter-rouge";
pub const COPY_BUTTON_CLASS: &str = "code-copy-button";
pub const COPIED_CLASS: &str = "copied";
pub const TARGET_ATTRIBUTE: &str = "data-copy-target";
pub const BOUND_ATTRIBUTE: &str = "data-copy-bound";
pub const REVERT_DELAY_MS: u64 = 2000;
/// `setTimeout` takes a signed 32-bit delay; larger values wrap and fire at once
pub const MAX_REVERT_DELAY_MS: u64 = i32::MAX as u64;

/// Configuration for [`crate::initialize`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinderConfig {
    /// Selector for copyable code bodies, in document order
    #[serde(default = "default_code_selector")]
    pub code_selector: String,
    /// Selector for copy buttons, in document order
    #[serde(default = "default_button_selector")]
    pub button_selector: String,
    /// Class added while a button shows "copied"
    #[serde(default = "default_marker_class")]
    pub marker_class: String,
    /// Attribute on a button naming the id of its code body
    #[serde(default = "default_target_attribute")]
    pub target_attribute: String,
    /// How long the marker stays on after a copy (default: 2000)
    #[serde(default = "default_revert_delay_ms")]
    pub revert_delay_ms: u64,
}

fn default_code_selector() -> String {
    format!(".{} + .{}", CODE_HEADER_CLASS, CODE_BODY_CLASS)
}

fn default_button_selector() -> String {
    format!(".{}", COPY_BUTTON_CLASS)
}

fn default_marker_class() -> String {
    COPIED_CLASS.to_string()
}

fn default_target_attribute() -> String {
    TARGET_ATTRIBUTE.to_string()
}

fn default_revert_delay_ms() -> u64 {
    REVERT_DELAY_MS
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            code_selector: default_code_selector(),
            button_selector: default_button_selector(),
            marker_class: default_marker_class(),
            target_attribute: default_target_attribute(),
            revert_delay_ms: default_revert_delay_ms(),
        }
    }
}

impl BinderConfig {
    /// Parse and validate a TOML override. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).with_context(|| {
            "Failed to parse code-copy config. Check for:\n\
             - Unknown keys (allowed: code_selector, button_selector, marker_class,\n\
               target_attribute, revert_delay_ms)\n\
             - Invalid TOML syntax (missing quotes, brackets, etc.)\n\
             - revert_delay_ms given as a string instead of a number"
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.code_selector.trim().is_empty() {
            bail!("code_selector must not be empty");
        }
        if self.button_selector.trim().is_empty() {
            bail!("button_selector must not be empty");
        }
        // classList.add throws on empty tokens or tokens with whitespace
        if self.marker_class.is_empty() || self.marker_class.chars().any(char::is_whitespace) {
            bail!("marker_class must be a single class name, got {:?}", self.marker_class);
        }
        if self.revert_delay_ms == 0 {
            bail!("revert_delay_ms must be greater than zero");
        }
        if self.revert_delay_ms > MAX_REVERT_DELAY_MS {
            bail!(
                "revert_delay_ms must be at most {}, got {}",
                MAX_REVERT_DELAY_MS,
                self.revert_delay_ms
            );
        }
        Ok(())
    }

    pub fn revert_delay(&self) -> Duration {
        Duration::from_millis(self.revert_delay_ms)
    }
}

/// Milliseconds to hand to `setTimeout`, clamped to what it accepts.
pub fn timer_millis(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis().min(u128::from(MAX_REVERT_DELAY_MS))).unwrap_or(i32::MAX as u32)
}
