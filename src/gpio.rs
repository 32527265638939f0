use log::{debug, trace};
use std::{
    fmt, fs,
    io::{self, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::gpio_pin_data::SYSFS_ROOT;

/// Specifies the GPIO pin direction.
///
/// * `IN` - Input
/// * `OUT` - Output
///
/// # Example
///
/// ```rust
/// use pinsetup::Direction;
///
/// assert_eq!(Direction::OUT.as_str(), "out");
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    IN,
    OUT,
}

impl Direction {
    /// The string the kernel expects in a `direction` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::IN => "in",
            Direction::OUT => "out",
        }
    }
}

/// Names the control file an operation writes to, for diagnostics.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Operation {
    Export,
    Unexport,
    Direction,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Export => write!(f, "export"),
            Operation::Unexport => write!(f, "unexport"),
            Operation::Direction => write!(f, "direction"),
        }
    }
}

/// Why a single pin could not be configured.
///
/// None of these abort a run; they are reported and the next pin is processed.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("Warning, pin {pin} does not exist on the board and will be ignored")]
    IllegalPin { pin: String },
    #[error("Failed to open {operation} for pin {pin}: {source}")]
    OpenFailed {
        pin: u32,
        operation: Operation,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write {operation} for pin {pin}: {source}")]
    WriteFailed {
        pin: u32,
        operation: Operation,
        #[source]
        source: io::Error,
    },
}

/// The three primitive operations of the GPIO driver.
///
/// Callers pass only pins that are legal on the board.
pub trait PinDriver {
    fn export(&mut self, pin: u32) -> Result<(), PinError>;
    fn unexport(&mut self, pin: u32) -> Result<(), PinError>;
    fn set_direction(&mut self, pin: u32, direction: Direction) -> Result<(), PinError>;
}

impl<D: PinDriver + ?Sized> PinDriver for &mut D {
    fn export(&mut self, pin: u32) -> Result<(), PinError> {
        (**self).export(pin)
    }

    fn unexport(&mut self, pin: u32) -> Result<(), PinError> {
        (**self).unexport(pin)
    }

    fn set_direction(&mut self, pin: u32, direction: Direction) -> Result<(), PinError> {
        (**self).set_direction(pin, direction)
    }
}

/// Drives pins through the sysfs GPIO class (`/sys/class/gpio`).
///
/// Each operation opens its control file write-only, writes once, syncs and
/// closes the file before returning. Nothing is ever read back.
///
/// # Example
///
/// ```no_run
/// use pinsetup::{Direction, PinDriver, SysfsWriter};
///
/// let mut writer = SysfsWriter::default();
/// writer.export(17).unwrap();
/// writer.set_direction(17, Direction::OUT).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SysfsWriter {
    root: PathBuf,
}

impl Default for SysfsWriter {
    fn default() -> Self {
        SysfsWriter::new(SYSFS_ROOT)
    }
}

impl SysfsWriter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        SysfsWriter { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn direction_path(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin)).join("direction")
    }

    fn write_attribute(
        &self,
        path: &Path,
        pin: u32,
        operation: Operation,
        value: &str,
    ) -> Result<(), PinError> {
        trace!("Writing {:?} to {}", value, path.display());

        // the file is closed when it goes out of scope, on every path
        let mut file = fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| PinError::OpenFailed {
                pin,
                operation,
                source,
            })?;

        let written = file
            .write(value.as_bytes())
            .map_err(|source| PinError::WriteFailed {
                pin,
                operation,
                source,
            })?;
        if written != value.len() {
            return Err(PinError::WriteFailed {
                pin,
                operation,
                source: io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", written, value.len()),
                ),
            });
        }

        // sysfs attributes do not implement fsync, the store already happened
        if let Err(e) = file.sync_all() {
            debug!("Sync of {} failed: {}", path.display(), e);
        }

        Ok(())
    }
}

impl PinDriver for SysfsWriter {
    fn export(&mut self, pin: u32) -> Result<(), PinError> {
        let path = self.root.join("export");
        self.write_attribute(&path, pin, Operation::Export, &pin.to_string())
    }

    fn unexport(&mut self, pin: u32) -> Result<(), PinError> {
        let path = self.root.join("unexport");
        self.write_attribute(&path, pin, Operation::Unexport, &pin.to_string())
    }

    fn set_direction(&mut self, pin: u32, direction: Direction) -> Result<(), PinError> {
        let path = self.direction_path(pin);
        self.write_attribute(&path, pin, Operation::Direction, direction.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_sysfs() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("export"), "").unwrap();
        fs::write(dir.path().join("unexport"), "").unwrap();
        dir
    }

    #[test]
    fn test_export_writes_decimal_pin() {
        let dir = fake_sysfs();
        let mut writer = SysfsWriter::new(dir.path());

        writer.export(4).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("export")).unwrap(), "4");

        writer.unexport(27).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("unexport")).unwrap(), "27");
    }

    #[test]
    fn test_set_direction() {
        let dir = fake_sysfs();
        fs::create_dir(dir.path().join("gpio17")).unwrap();
        fs::write(dir.path().join("gpio17/direction"), "").unwrap();
        let mut writer = SysfsWriter::new(dir.path());

        writer.set_direction(17, Direction::IN).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("gpio17/direction")).unwrap(), "in");

        writer.set_direction(17, Direction::OUT).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("gpio17/direction")).unwrap(), "out");
    }

    #[test]
    fn test_direction_on_unexported_pin_fails_to_open() {
        let dir = fake_sysfs();
        let mut writer = SysfsWriter::new(dir.path());

        let err = writer.set_direction(22, Direction::OUT).unwrap_err();
        assert!(matches!(
            err,
            PinError::OpenFailed {
                pin: 22,
                operation: Operation::Direction,
                ..
            }
        ));
        assert!(!dir.path().join("gpio22").exists());
    }

    #[test]
    fn test_missing_control_file_is_not_created() {
        let dir = TempDir::new().unwrap();
        let mut writer = SysfsWriter::new(dir.path());

        let err = writer.export(4).unwrap_err();
        assert!(matches!(
            err,
            PinError::OpenFailed {
                pin: 4,
                operation: Operation::Export,
                ..
            }
        ));
        assert!(!dir.path().join("export").exists());
        assert!(err.to_string().starts_with("Failed to open export for pin 4"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_write_is_reported() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join("export")).unwrap();
        let mut writer = SysfsWriter::new(dir.path());

        let err = writer.export(4).unwrap_err();
        assert!(matches!(
            err,
            PinError::WriteFailed {
                pin: 4,
                operation: Operation::Export,
                ..
            }
        ));
        assert!(err.to_string().starts_with("Failed to write export for pin 4"));
    }

    #[test]
    fn test_default_root() {
        assert_eq!(SysfsWriter::default().root(), Path::new("/sys/class/gpio"));
    }
}
