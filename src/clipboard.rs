use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ClipboardError;

/// Something that owns clipboard contents once written.
///
/// On X11 and Wayland the copied text is served by the owning handle, so the
/// handle has to stay alive for as long as the text should be pasteable.
pub trait Selection {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

impl Selection for arboard::Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        arboard::Clipboard::set_text(self, text.to_owned())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}

type Opener = fn() -> Result<Box<dyn Selection>, ClipboardError>;

fn open_system() -> Result<Box<dyn Selection>, ClipboardError> {
    let ctx = arboard::Clipboard::new().map_err(|e| ClipboardError::Init(e.to_string()))?;
    Ok(Box::new(ctx))
}

/// Copy `s` into the selection held in `slot`, opening one if needed.
///
/// On some platforms or in headless CI environments clipboard initialization
/// may fail, so callers treat errors as a "Copy failed" label rather than a
/// fatal error. A failed open is retried on the next copy.
pub fn copy_to_clipboard(
    slot: &mut Option<Box<dyn Selection>>,
    open: Opener,
    s: &str,
) -> Result<(), ClipboardError> {
    let ctx = match slot.take() {
        Some(ctx) => ctx,
        None => open()?,
    };
    slot.insert(ctx).set_text(s)
}

/// Something that accepts text writes.
#[async_trait]
pub trait ClipboardWriter: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[async_trait]
impl<T: ClipboardWriter + ?Sized> ClipboardWriter for Arc<T> {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        (**self).write_text(text).await
    }
}

struct CopyRequest {
    text: String,
    reply: oneshot::Sender<Result<(), ClipboardError>>,
}

/// The host clipboard.
///
/// Writes go to a dedicated thread that keeps the clipboard handle open until
/// this value is dropped.
#[derive(Debug)]
pub struct SystemClipboard {
    worker: Mutex<Option<mpsc::Sender<CopyRequest>>>,
    open: Opener,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::with_opener(open_system)
    }
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_opener(open: Opener) -> Self {
        Self {
            worker: Mutex::new(None),
            open,
        }
    }

    fn sender(&self) -> Result<mpsc::Sender<CopyRequest>, ClipboardError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = worker.as_ref() {
            return Ok(sender.clone());
        }

        let (sender, requests) = mpsc::channel::<CopyRequest>();
        let open = self.open;
        std::thread::Builder::new()
            .name("clipboard".into())
            .spawn(move || {
                let mut slot = None;
                for request in requests {
                    let result = copy_to_clipboard(&mut slot, open, &request.text);
                    let _ = request.reply.send(result);
                }
                debug!("clipboard worker stopped");
            })
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        Ok(worker.insert(sender).clone())
    }
}

#[async_trait]
impl ClipboardWriter for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let (reply, result) = oneshot::channel();
        self.sender()?
            .send(CopyRequest {
                text: text.to_owned(),
                reply,
            })
            .map_err(|_| ClipboardError::Unavailable("clipboard worker stopped".into()))?;
        result
            .await
            .map_err(|_| ClipboardError::Unavailable("clipboard worker stopped".into()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    static OPENED: AtomicUsize = AtomicUsize::new(0);
    static DROPPED: AtomicUsize = AtomicUsize::new(0);
    static LAST: Mutex<String> = Mutex::new(String::new());

    struct Counting;

    impl Selection for Counting {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            *LAST.lock().unwrap() = text.to_string();
            Ok(())
        }
    }

    impl Drop for Counting {
        fn drop(&mut self) {
            DROPPED.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn open_counting() -> Result<Box<dyn Selection>, ClipboardError> {
        OPENED.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Counting))
    }

    fn open_headless() -> Result<Box<dyn Selection>, ClipboardError> {
        Err(ClipboardError::Init("no display".into()))
    }

    #[tokio::test]
    async fn selection_stays_open_between_writes() {
        let clipboard = SystemClipboard::with_opener(open_counting);
        clipboard.write_text("Enter bootloader:").await.unwrap();
        clipboard.write_text("1) Hold BOOT").await.unwrap();

        assert_eq!(OPENED.load(Ordering::SeqCst), 1);
        assert_eq!(DROPPED.load(Ordering::SeqCst), 0);
        assert_eq!(*LAST.lock().unwrap(), "1) Hold BOOT");

        drop(clipboard);
        for _ in 0..200 {
            if DROPPED.load(Ordering::SeqCst) == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(DROPPED.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn open_failure_is_reported_each_time() {
        let clipboard = SystemClipboard::with_opener(open_headless);
        for _ in 0..2 {
            assert!(matches!(
                clipboard.write_text("test").await,
                Err(ClipboardError::Init(_))
            ));
        }
    }

    #[tokio::test]
    async fn system_clipboard_write_no_panic() {
        // Best-effort: headless CI may have no clipboard.
        let _ = SystemClipboard::new().write_text("Enter bootloader:").await;
    }
}
