use clap::{ArgGroup, Parser};
use std::{fmt, num::IntErrorKind, path::PathBuf};
use thiserror::Error;

/// Export, unexport and set the direction of GPIO pins through sysfs.
///
/// Each pin option takes a comma separated list and may be repeated.
/// Regardless of their order on the command line, pins are exported first,
/// then unexported, then set as inputs, then set as outputs.
#[derive(Parser, Debug)]
#[command(name = "pinsetup", version)]
#[command(arg_required_else_help = true)]
#[command(group(
    ArgGroup::new("pins")
        .required(true)
        .multiple(true)
        .args(["add", "remove", "input", "output", "list_boards"])
))]
pub struct Cli {
    /// Pins to export
    #[arg(short, long, value_name = "PINS", value_delimiter = ',', allow_negative_numbers = true)]
    pub add: Vec<String>,

    /// Pins to unexport
    #[arg(short, long, value_name = "PINS", value_delimiter = ',', allow_negative_numbers = true)]
    pub remove: Vec<String>,

    /// Pins to configure as inputs
    #[arg(short, long, value_name = "PINS", value_delimiter = ',', allow_negative_numbers = true)]
    pub input: Vec<String>,

    /// Pins to configure as outputs
    #[arg(short, long, value_name = "PINS", value_delimiter = ',', allow_negative_numbers = true)]
    pub output: Vec<String>,

    /// Built-in board profile
    #[arg(short, long, default_value = "rpi")]
    pub board: String,

    /// Load the board profile from a TOML file
    #[arg(long, value_name = "PATH", conflicts_with = "board")]
    pub board_file: Option<PathBuf>,

    /// Use this directory instead of the profile's sysfs GPIO root
    #[arg(long, value_name = "PATH")]
    pub sysfs_root: Option<PathBuf>,

    /// List the built-in board profiles and exit
    #[arg(long)]
    pub list_boards: bool,

    /// More log output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What to do with a pin.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ActionKind {
    Export,
    Unexport,
    SetInput,
    SetOutput,
}

impl ActionKind {
    /// The long option that queues this kind of action.
    pub fn flag(&self) -> &'static str {
        match self {
            ActionKind::Export => "add",
            ActionKind::Unexport => "remove",
            ActionKind::SetInput => "input",
            ActionKind::SetOutput => "output",
        }
    }
}

/// A single pin operation requested on the command line.
///
/// The pin is kept as given, legality is only decided by the executor.
/// `token` is the pin as it was typed, used in diagnostics. Numbers too large
/// for an `i64` saturate `pin` and are therefore never legal.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PinAction {
    pub kind: ActionKind,
    pub pin: i64,
    pub token: String,
}

impl PinAction {
    pub fn new(kind: ActionKind, pin: i64) -> Self {
        PinAction {
            kind,
            pin,
            token: pin.to_string(),
        }
    }

    fn saturated(kind: ActionKind, pin: i64, token: &str) -> Self {
        PinAction {
            kind,
            pin,
            token: token.to_string(),
        }
    }
}

impl fmt::Display for PinAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::Export => write!(f, "Exported pin {}", self.pin),
            ActionKind::Unexport => write!(f, "Unexported pin {}", self.pin),
            ActionKind::SetInput => write!(f, "Set pin {} as input", self.pin),
            ActionKind::SetOutput => write!(f, "Set pin {} as output", self.pin),
        }
    }
}

/// A pin token that is not a number.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("Invalid pin number '{token}' given to --{flag}")]
pub struct ParseError {
    pub token: String,
    pub flag: &'static str,
}

/// The actions to run, in order, and the tokens that could not be parsed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<PinAction>,
    pub errors: Vec<ParseError>,
}

/// Turns the parsed options into an ordered list of pin actions.
///
/// Groups are processed as add, remove, input, output so that direction
/// changes come after the exports of the same invocation. Within a group the
/// pins keep the order they were given in. Duplicates are kept.
///
/// # Example
///
/// ```rust
/// use clap::Parser;
/// use pinsetup::{interpret, ActionKind, Cli, PinAction};
///
/// let cli = Cli::parse_from(["pinsetup", "--output", "2", "--add", "2"]);
/// let plan = interpret(&cli);
/// assert_eq!(
///     plan.actions,
///     vec![
///         PinAction::new(ActionKind::Export, 2),
///         PinAction::new(ActionKind::SetOutput, 2),
///     ]
/// );
/// ```
pub fn interpret(cli: &Cli) -> Plan {
    let groups = [
        (ActionKind::Export, &cli.add),
        (ActionKind::Unexport, &cli.remove),
        (ActionKind::SetInput, &cli.input),
        (ActionKind::SetOutput, &cli.output),
    ];

    let mut plan = Plan::default();
    for (kind, tokens) in groups {
        for token in tokens {
            let trimmed = token.trim();
            match trimmed.parse::<i64>() {
                Ok(pin) => plan.actions.push(PinAction::new(kind, pin)),
                Err(e) if *e.kind() == IntErrorKind::PosOverflow => {
                    plan.actions.push(PinAction::saturated(kind, i64::MAX, trimmed))
                }
                Err(e) if *e.kind() == IntErrorKind::NegOverflow => {
                    plan.actions.push(PinAction::saturated(kind, i64::MIN, trimmed))
                }
                Err(_) => plan.errors.push(ParseError {
                    token: token.clone(),
                    flag: kind.flag(),
                }),
            }
        }
    }

    plan
}
