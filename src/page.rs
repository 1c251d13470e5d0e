//! In-process model of the status page.
//!
//! The page is a small tree of elements addressed by fixed identifiers. Any
//! element may be absent; callers resolve an [`ElementHandle`] once at setup
//! and branch on whether it exists.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Well-known element identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ElementId {
    #[serde(rename = "fw-version")]
    FirmwareVersion,
    #[serde(rename = "fw-chip")]
    ChipFamily,
    #[serde(rename = "fw-status")]
    Status,
    #[serde(rename = "browser-warning")]
    BrowserWarning,
    #[serde(rename = "copy-steps")]
    CopySteps,
}

impl ElementId {
    pub const ALL: [ElementId; 5] = [
        ElementId::FirmwareVersion,
        ElementId::ChipFamily,
        ElementId::Status,
        ElementId::BrowserWarning,
        ElementId::CopySteps,
    ];

    /// The identifier used in the page markup.
    pub const fn dom_id(self) -> &'static str {
        match self {
            ElementId::FirmwareVersion => "fw-version",
            ElementId::ChipFamily => "fw-chip",
            ElementId::Status => "fw-status",
            ElementId::BrowserWarning => "browser-warning",
            ElementId::CopySteps => "copy-steps",
        }
    }

    /// Content the element carries before any script runs.
    pub const fn default_text(self) -> &'static str {
        match self {
            ElementId::FirmwareVersion => "unknown",
            ElementId::ChipFamily => "ESP32",
            ElementId::Status => "",
            ElementId::BrowserWarning => {
                "This browser does not support Web Serial. Use Chrome or Edge on desktop."
            }
            ElementId::CopySteps => crate::copy_button::COPY_LABEL,
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_id())
    }
}

/// CSS-like display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Display {
    #[default]
    Default,
    Block,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Element {
    pub text: String,
    pub color: Option<String>,
    pub display: Display,
}

impl Element {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether the element would be rendered.
    pub fn is_visible(&self) -> bool {
        self.display != Display::None
    }
}

type Tree = BTreeMap<ElementId, Element>;

/// Shared handle to the element tree.
#[derive(Debug, Clone, Default)]
pub struct Page {
    inner: Arc<Mutex<Tree>>,
}

impl Page {
    /// A page with no elements.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A page carrying all five elements with their default content.
    pub fn standard() -> Self {
        ElementId::ALL
            .iter()
            .fold(Self::empty(), |page, id| page.with_element(*id, id.default_text()))
    }

    /// Add (or replace) an element.
    pub fn with_element(self, id: ElementId, text: impl Into<String>) -> Self {
        self.lock().insert(id, Element::new(text));
        self
    }

    /// Remove an element, returning the page.
    pub fn without_element(self, id: ElementId) -> Self {
        self.lock().remove(&id);
        self
    }

    /// Resolve a handle if the element is present.
    pub fn handle(&self, id: ElementId) -> Option<ElementHandle> {
        self.lock().contains_key(&id).then(|| ElementHandle {
            page: self.clone(),
            id,
        })
    }

    /// Clone of a single element.
    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.lock().get(&id).cloned()
    }

    /// Clone of the whole tree, in identifier order.
    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            elements: self.lock().clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        // A panicking writer can only leave a half-written string behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolved reference to a present element.
#[derive(Debug, Clone)]
pub struct ElementHandle {
    page: Page,
    id: ElementId,
}

impl ElementHandle {
    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.with(|el| el.text = text);
    }

    pub fn set_color(&self, color: impl Into<String>) {
        let color = color.into();
        self.with(|el| el.color = Some(color));
    }

    pub fn set_display(&self, display: Display) {
        self.with(|el| el.display = display);
    }

    fn with<R>(&self, f: impl FnOnce(&mut Element) -> R) -> Option<R> {
        self.page.lock().get_mut(&self.id).map(f)
    }
}

/// Point-in-time copy of the page used for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSnapshot {
    pub elements: BTreeMap<ElementId, Element>,
}

impl fmt::Display for PageSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, el) in &self.elements {
            if !el.is_visible() {
                continue;
            }
            write!(f, "{:<16} {}", id.dom_id(), el.text)?;
            if let Some(color) = &el.color {
                write!(f, " [{}]", color)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
