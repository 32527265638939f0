use log::debug;
use std::{fmt, io::Write};

use crate::command::{interpret, ActionKind, Cli, ParseError, PinAction};
use crate::gpio::{Direction, PinDriver, PinError};
use crate::gpio_pin_data::LegalPinSet;

/// Outcome of one [`PinAction`].
#[derive(Debug)]
pub enum ActionResult {
    Success(PinAction),
    Failure(PinAction, PinError),
}

impl ActionResult {
    pub fn action(&self) -> &PinAction {
        match self {
            ActionResult::Success(action) => action,
            ActionResult::Failure(action, _) => action,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Success(_))
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionResult::Success(action) => write!(f, "{}", action),
            ActionResult::Failure(_, e) => write!(f, "{}", e),
        }
    }
}

/// Applies pin actions to a driver, one after the other.
///
/// Pins outside the board's legal set never reach the driver. A failed pin
/// does not stop the run and nothing is rolled back. Direction changes on a
/// pin that was not exported fail; exporting first is up to the caller.
pub struct Executor<'a, D> {
    pins: &'a LegalPinSet,
    driver: D,
}

impl<'a, D: PinDriver> Executor<'a, D> {
    pub fn new(pins: &'a LegalPinSet, driver: D) -> Self {
        Executor { pins, driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Runs every action in order and returns one result per action.
    pub fn execute(&mut self, actions: &[PinAction]) -> Vec<ActionResult> {
        actions.iter().map(|action| self.apply(action.clone())).collect()
    }

    fn apply(&mut self, action: PinAction) -> ActionResult {
        let pin = match self.pins.check(action.pin) {
            Some(pin) => pin,
            None => {
                debug!("Skipping {:?} of illegal pin {}", action.kind, action.token);
                let pin = action.token.clone();
                return ActionResult::Failure(action, PinError::IllegalPin { pin });
            }
        };

        debug!("{:?} pin {}", action.kind, pin);
        let outcome = match action.kind {
            ActionKind::Export => self.driver.export(pin),
            ActionKind::Unexport => self.driver.unexport(pin),
            ActionKind::SetInput => self.driver.set_direction(pin, Direction::IN),
            ActionKind::SetOutput => self.driver.set_direction(pin, Direction::OUT),
        };

        match outcome {
            Ok(()) => ActionResult::Success(action),
            Err(e) => ActionResult::Failure(action, e),
        }
    }
}

/// Counts of what happened during a run.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub invalid: usize,
}

/// Writes one line per parse error and per result.
///
/// Successes go to `out`, parse errors and failures go to `err`.
pub fn report<O: Write, E: Write>(
    results: &[ActionResult],
    parse_errors: &[ParseError],
    out: &mut O,
    err: &mut E,
) -> std::io::Result<Summary> {
    let mut summary = Summary {
        invalid: parse_errors.len(),
        ..Summary::default()
    };

    for e in parse_errors {
        writeln!(err, "{}", e)?;
    }

    for result in results {
        if result.is_success() {
            summary.succeeded += 1;
            writeln!(out, "{}", result)?;
        } else {
            summary.failed += 1;
            writeln!(err, "{}", result)?;
        }
    }

    Ok(summary)
}

/// Interprets `cli`, applies the actions through `driver` and reports them.
pub fn run<D: PinDriver, O: Write, E: Write>(
    cli: &Cli,
    pins: &LegalPinSet,
    driver: D,
    out: &mut O,
    err: &mut E,
) -> std::io::Result<Summary> {
    let plan = interpret(cli);
    debug!(
        "{} actions queued, {} tokens rejected",
        plan.actions.len(),
        plan.errors.len()
    );

    let mut executor = Executor::new(pins, driver);
    let results = executor.execute(&plan.actions);
    report(&results, &plan.errors, out, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Default)]
    struct FailingDriver {
        calls: usize,
    }

    impl PinDriver for FailingDriver {
        fn export(&mut self, pin: u32) -> Result<(), PinError> {
            self.calls += 1;
            Err(PinError::WriteFailed {
                pin,
                operation: crate::gpio::Operation::Export,
                source: io::Error::new(io::ErrorKind::Other, "Device or resource busy"),
            })
        }

        fn unexport(&mut self, _pin: u32) -> Result<(), PinError> {
            self.calls += 1;
            Ok(())
        }

        fn set_direction(&mut self, _pin: u32, _direction: Direction) -> Result<(), PinError> {
            self.calls += 1;
            Ok(())
        }
    }

    #[test]
    fn test_illegal_pins_never_reach_driver() {
        let pins = LegalPinSet::from_iter([2, 3]);
        let mut executor = Executor::new(&pins, FailingDriver::default());

        let results = executor.execute(&[
            PinAction::new(ActionKind::Unexport, 99),
            PinAction::new(ActionKind::SetInput, -2),
            PinAction::new(ActionKind::Unexport, 0),
        ]);

        assert_eq!(executor.driver().calls, 0);
        assert_eq!(results.len(), 3);
        assert!(results
            .iter()
            .all(|r| matches!(r, ActionResult::Failure(_, PinError::IllegalPin { .. }))));
    }

    #[test]
    fn test_failure_does_not_stop_later_actions() {
        let pins = LegalPinSet::from_iter([2, 3]);
        let mut executor = Executor::new(&pins, FailingDriver::default());

        let results = executor.execute(&[
            PinAction::new(ActionKind::Export, 2),
            PinAction::new(ActionKind::Unexport, 3),
        ]);

        assert_eq!(executor.into_driver().calls, 2);
        assert!(!results[0].is_success());
        assert!(results[1].is_success());
        assert_eq!(results[1].action(), &PinAction::new(ActionKind::Unexport, 3));
    }

    #[test]
    fn test_report_one_line_per_outcome() {
        let results = vec![
            ActionResult::Success(PinAction::new(ActionKind::Export, 4)),
            ActionResult::Failure(
                PinAction::new(ActionKind::Export, 99),
                PinError::IllegalPin {
                    pin: "99".to_string(),
                },
            ),
            ActionResult::Success(PinAction::new(ActionKind::SetOutput, 4)),
        ];
        let parse_errors = vec![ParseError {
            token: "abc".to_string(),
            flag: "add",
        }];

        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = report(&results, &parse_errors, &mut out, &mut err).unwrap();

        assert_eq!(
            summary,
            Summary {
                succeeded: 2,
                failed: 1,
                invalid: 1
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Exported pin 4\nSet pin 4 as output\n"
        );
        assert_eq!(
            String::from_utf8(err).unwrap(),
            "Invalid pin number 'abc' given to --add\n\
             Warning, pin 99 does not exist on the board and will be ignored\n"
        );
    }
}
