//! Serial capability detection.
//!
//! The page only needs to know whether flashing over serial could work on this
//! host. Nothing here opens a port.

use std::path::Path;

use clap::ValueEnum;
use tracing::debug;

/// How serial capability is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SerialSupport {
    /// Look for serial device nodes on the host.
    #[default]
    Auto,
    /// Treat serial as available.
    Present,
    /// Treat serial as unavailable.
    Absent,
}

/// Host features resolved once at setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub serial: bool,
}

impl Capabilities {
    pub fn with_serial(serial: bool) -> Self {
        Self { serial }
    }

    /// Resolve capabilities according to `support`.
    pub fn detect(support: SerialSupport) -> Self {
        let serial = match support {
            SerialSupport::Present => true,
            SerialSupport::Absent => false,
            SerialSupport::Auto => host_has_serial(),
        };
        debug!(?support, serial, "resolved serial capability");
        Self { serial }
    }
}

#[cfg(windows)]
fn host_has_serial() -> bool {
    true
}

#[cfg(not(windows))]
fn host_has_serial() -> bool {
    dev_has_serial_nodes(Path::new("/dev"))
}

const SERIAL_PREFIXES: &[&str] = &["ttyUSB", "ttyACM", "ttyS", "cu.", "tty.usb"];

/// Whether `dir` contains any entry that looks like a serial device node.
pub fn dev_has_serial_nodes(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .any(|entry| is_serial_node_name(&entry.file_name().to_string_lossy()))
}

fn is_serial_node_name(name: &str) -> bool {
    SERIAL_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}
