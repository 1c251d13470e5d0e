//! The page controller.
//!
//! Two flows run over disjoint elements: loading the manifest into the
//! version/chip/status elements, and the copy-steps button. Neither has
//! intermediate states; each ends in success or failure.

use tracing::{info, warn};

use crate::capability::Capabilities;
use crate::clipboard::ClipboardWriter;
use crate::copy_button::{CopyConfig, CopyOutcome, CopyStepsButton};
use crate::error::{Error, LoadError, Result};
use crate::manifest::ManifestSummary;
use crate::page::{Display, ElementHandle, ElementId, Page};
use crate::source::ManifestSource;

pub const STATUS_READY: &str = "Ready";
pub const STATUS_UNSUPPORTED: &str = "Browser unsupported";
pub const WARNING_COLOR: &str = "#b45309";

/// Result of a manifest load, for callers that care.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(ManifestSummary),
    Missing(LoadError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

pub struct PageController<S, C> {
    page: Page,
    source: S,
    capabilities: Capabilities,
    version: ElementHandle,
    chip: ElementHandle,
    status: ElementHandle,
    warning: Option<ElementHandle>,
    copy_button: Option<CopyStepsButton<C>>,
}

impl<S, C> PageController<S, C>
where
    S: ManifestSource,
    C: ClipboardWriter,
{
    /// Bind the controller to `page`.
    ///
    /// Fails before touching the page if a display element is missing.
    pub fn attach(
        page: Page,
        source: S,
        clipboard: C,
        capabilities: Capabilities,
        config: CopyConfig,
    ) -> Result<Self> {
        let required = |id: ElementId| page.handle(id).ok_or(Error::MissingElement(id));
        let version = required(ElementId::FirmwareVersion)?;
        let chip = required(ElementId::ChipFamily)?;
        let status = required(ElementId::Status)?;

        Ok(Self {
            warning: page.handle(ElementId::BrowserWarning),
            copy_button: CopyStepsButton::attach(&page, clipboard, config),
            page,
            source,
            capabilities,
            version,
            chip,
            status,
        })
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Show or hide the unsupported-host warning.
    pub fn init(&self) {
        if let Some(warning) = &self.warning {
            let display = if self.capabilities.serial {
                Display::None
            } else {
                Display::Block
            };
            warning.set_display(display);
        }
    }

    /// Page setup: capability check, then manifest load.
    pub async fn start(&self) -> LoadOutcome {
        self.init();
        self.load_manifest().await
    }

    /// Fetch the manifest and update the version, chip and status elements.
    pub async fn load_manifest(&self) -> LoadOutcome {
        match self.fetch_summary().await {
            Ok(summary) => {
                self.version.set_text(summary.version.as_str());
                if let Some(chip) = &summary.chip_family {
                    self.chip.set_text(chip.as_str());
                }
                self.status.set_text(if self.capabilities.serial {
                    STATUS_READY
                } else {
                    STATUS_UNSUPPORTED
                });
                info!(version = %summary.version, chip = ?summary.chip_family, "manifest loaded");
                LoadOutcome::Loaded(summary)
            }
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "manifest load failed");
                self.status.set_text(e.display_text());
                self.status.set_color(WARNING_COLOR);
                LoadOutcome::Missing(e)
            }
        }
    }

    async fn fetch_summary(&self) -> std::result::Result<ManifestSummary, LoadError> {
        let body = self.source.fetch().await?;
        ManifestSummary::from_slice(&body)
    }

    /// Handle a click on the copy-steps button.
    ///
    /// Returns `None` when the page has no such button.
    pub async fn copy_steps(&self) -> Option<CopyOutcome> {
        Some(self.copy_button.as_ref()?.click().await)
    }
}
