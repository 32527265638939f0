use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    fmt, fs,
    path::{Path, PathBuf},
};

pub(crate) static SYSFS_ROOT: &str = "/sys/class/gpio";

static RPI: &str = "rpi";
static RPI_26PIN: &str = "rpi-26pin";

/// BCM numbers of the GPIOs broken out on the 40-pin header, listed in
/// header order.
static RPI_40PIN_GPIOS: [u32; 26] = [
    2, 3, 4, 14, 15, 17, 18, 27, 22, 23, 24, 10, 9, 25, 11, 8, 7, 5, 6, 12, 13, 19, 16, 26, 20,
    21,
];

/// BCM numbers of the GPIOs on the P1 header of the Model B rev 2.
static RPI_26PIN_GPIOS: [u32; 17] = [2, 3, 4, 14, 15, 17, 18, 27, 22, 23, 24, 10, 9, 25, 11, 8, 7];

/// The set of GPIO numbers that exist on a board.
///
/// The set is built once from a [`BoardProfile`] and never changes afterwards.
///
/// # Example
///
/// ```rust
/// use pinsetup::LegalPinSet;
///
/// let pins = LegalPinSet::from_iter([2, 3, 4]);
/// assert!(pins.is_legal(3));
/// assert!(!pins.is_legal(-3));
/// assert!(!pins.is_legal(99));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegalPinSet {
    pins: BTreeSet<u32>,
}

impl LegalPinSet {
    /// Returns `true` if `pin` is a GPIO on this board.
    ///
    /// Accepts any signed value so that numbers parsed straight from the
    /// command line can be checked without a prior range check.
    pub fn is_legal(&self, pin: i64) -> bool {
        self.check(pin).is_some()
    }

    /// Returns the pin as a GPIO number if it is legal on this board.
    pub fn check(&self, pin: i64) -> Option<u32> {
        u32::try_from(pin).ok().filter(|pin| self.pins.contains(pin))
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}

impl FromIterator<u32> for LegalPinSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        LegalPinSet {
            pins: iter.into_iter().collect(),
        }
    }
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(SYSFS_ROOT)
}

/// Describes a board: which GPIOs it has and where its sysfs GPIO class lives.
///
/// Built-in profiles are looked up with [`get_profile`]; others are read from
/// TOML files with [`BoardProfile::load`]:
///
/// ```toml
/// id = "myboard"
/// name = "My board"
/// sysfs_root = "/sys/class/gpio"
/// pins = [2, 3, 4]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct BoardProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    pub pins: Vec<u32>,
}

impl BoardProfile {
    fn builtin(id: &str, name: &str, description: &str, pins: &[u32]) -> Self {
        BoardProfile {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            sysfs_root: default_sysfs_root(),
            pins: pins.to_vec(),
        }
    }

    /// Parses a profile from TOML text and checks its pin table.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let profile: BoardProfile =
            toml::from_str(contents).context("Board profile is not valid TOML")?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reads a profile from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read board profile {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid board profile {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.pins.is_empty() {
            bail!("Board profile '{}' lists no pins", self.id);
        }

        let mut seen = BTreeSet::new();
        for pin in &self.pins {
            if !seen.insert(*pin) {
                bail!("Board profile '{}' lists pin {} more than once", self.id, pin);
            }
        }

        Ok(())
    }

    pub fn legal_pins(&self) -> LegalPinSet {
        self.pins.iter().copied().collect()
    }
}

impl fmt::Display for BoardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({} pins)", self.id, self.name, self.pins.len())?;
        if !self.description.is_empty() {
            write!(f, ", {}", self.description)?;
        }
        Ok(())
    }
}

static RPI_PROFILE: Lazy<BoardProfile> = Lazy::new(|| {
    BoardProfile::builtin(
        RPI,
        "Raspberry Pi (40-pin header)",
        "Model A+/B+, 2, 3, 4, Zero",
        &RPI_40PIN_GPIOS,
    )
});

static RPI_26PIN_PROFILE: Lazy<BoardProfile> = Lazy::new(|| {
    BoardProfile::builtin(
        RPI_26PIN,
        "Raspberry Pi (26-pin header)",
        "Model A and Model B rev 2",
        &RPI_26PIN_GPIOS,
    )
});

static BOARD_PROFILES: Lazy<HashMap<&'static str, &'static BoardProfile>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(RPI, &*RPI_PROFILE);
    m.insert("raspberry-pi", &*RPI_PROFILE);
    m.insert(RPI_26PIN, &*RPI_26PIN_PROFILE);
    m.insert("rpi-b-rev2", &*RPI_26PIN_PROFILE);
    m
});

/// Looks up a built-in board profile by id or alias, ignoring case.
///
/// # Example
///
/// ```rust
/// use pinsetup::get_profile;
///
/// let profile = get_profile("RPi").unwrap();
/// assert_eq!(profile.legal_pins().len(), 26);
/// ```
pub fn get_profile(id: &str) -> Option<&'static BoardProfile> {
    BOARD_PROFILES.get(id.to_lowercase().as_str()).copied()
}

/// Built-in profiles without aliases, sorted by id.
pub fn builtin_profiles() -> Vec<&'static BoardProfile> {
    vec![&*RPI_PROFILE, &*RPI_26PIN_PROFILE]
}

/// Picks the profile for this run: a profile file wins over a built-in id,
/// and `sysfs_root` overrides whatever root the profile names.
pub fn select_profile(
    board: &str,
    board_file: Option<&Path>,
    sysfs_root: Option<&Path>,
) -> Result<BoardProfile> {
    let mut profile = match board_file {
        Some(path) => BoardProfile::load(path)?,
        None => get_profile(board)
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "Unknown board '{}'. Use --list-boards to see available boards.",
                    board
                )
            })?,
    };

    if let Some(root) = sysfs_root {
        profile.sysfs_root = root.to_path_buf();
    }

    Ok(profile)
}
