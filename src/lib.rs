pub mod command;
pub mod executor;
pub mod gpio;
pub mod gpio_pin_data;

pub use command::{interpret, ActionKind, Cli, ParseError, PinAction, Plan};
pub use executor::{report, run, ActionResult, Executor, Summary};
pub use gpio::{Direction, Operation, PinDriver, PinError, SysfsWriter};
pub use gpio_pin_data::{builtin_profiles, get_profile, select_profile, BoardProfile, LegalPinSet};
