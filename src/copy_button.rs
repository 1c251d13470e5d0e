//! The copy-steps button.
//!
//! A click writes the bootloader instructions to the clipboard, flips the
//! button label to a confirmation or failure text and schedules a one-shot
//! revert. The button needs nothing but the page and a clipboard.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use clap::ValueEnum;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

use crate::clipboard::ClipboardWriter;
use crate::page::{ElementHandle, ElementId, Page};

pub const COPY_LABEL: &str = "Copy Boot Steps";
pub const COPIED_LABEL: &str = "Copied!";
pub const COPY_FAILED_LABEL: &str = "Copy failed";

/// Instructions written to the clipboard.
pub const BOOT_STEPS: &str = "Enter bootloader:\n1) Hold BOOT\n2) Tap RESET\n3) Release BOOT";

pub const REVERT_DELAY: Duration = Duration::from_secs(2);

/// How overlapping label reverts interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RevertPolicy {
    /// Every click schedules its own revert; the last one to fire wins.
    #[default]
    LastWins,
    /// A new click aborts the pending revert of the previous one.
    CancelPrevious,
}

#[derive(Debug, Clone)]
pub struct CopyConfig {
    pub revert_delay: Duration,
    pub revert_policy: RevertPolicy,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            revert_delay: REVERT_DELAY,
            revert_policy: RevertPolicy::default(),
        }
    }
}

/// Result of a click.
#[derive(Debug)]
pub struct CopyOutcome {
    pub copied: bool,
    /// The scheduled label revert.
    pub revert: JoinHandle<()>,
}

pub struct CopyStepsButton<C> {
    label: ElementHandle,
    clipboard: C,
    config: CopyConfig,
    pending_revert: Mutex<Option<AbortHandle>>,
}

impl<C: ClipboardWriter> CopyStepsButton<C> {
    /// Bind to the page's copy button, if it has one.
    pub fn attach(page: &Page, clipboard: C, config: CopyConfig) -> Option<Self> {
        Some(Self {
            label: page.handle(ElementId::CopySteps)?,
            clipboard,
            config,
            pending_revert: Mutex::new(None),
        })
    }

    pub async fn click(&self) -> CopyOutcome {
        let copied = match self.clipboard.write_text(BOOT_STEPS).await {
            Ok(()) => {
                self.label.set_text(COPIED_LABEL);
                true
            }
            Err(e) => {
                warn!(error = %e, "copying boot steps failed");
                self.label.set_text(COPY_FAILED_LABEL);
                false
            }
        };

        CopyOutcome {
            copied,
            revert: self.schedule_revert(),
        }
    }

    fn schedule_revert(&self) -> JoinHandle<()> {
        let label = self.label.clone();
        let delay = self.config.revert_delay;
        let revert = async move {
            tokio::time::sleep(delay).await;
            label.set_text(COPY_LABEL);
        };

        if self.config.revert_policy == RevertPolicy::LastWins {
            return tokio::spawn(revert);
        }

        // Held across the spawn so reverts are registered in click order.
        let mut pending = self
            .pending_revert
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = tokio::spawn(revert);
        if let Some(previous) = pending.replace(handle.abort_handle()) {
            debug!("cancelling pending label revert");
            previous.abort();
        }
        handle
    }
}
