//! A simple CLI tool for replaying scripted call sequences against a fresh
//! ledger. Each step names a caller, a time, a call and the expected outcome;
//! the tool reports every step and whether the expectations held.

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{info, LevelFilter};
use serde::Deserialize;

use election_ledger::error::{Error as LedgerError, ErrorKind};
use election_ledger::model::Address;
use election_ledger::{CallContext, LedgerCall, LedgerConfig, LedgerState, Receipt};

const PROGRAM_NAME: &str = "ledger-replay";

const ABOUT_TEXT: &str = "Replay a scripted sequence of calls against a fresh election ledger.

EXIT CODES:
     0: Every step behaved as expected.
   255: Ran successfully, but at least one step did not.
 Other: Error.";

const SCRIPT_PATH: &str = "SCRIPT_PATH";

const SCRIPT_PATH_HELP: &str = "The path to a JSON replay script: the ledger's `owner`,\n\
its `quorum` (`admins` and `required`), an optional `config`, and the `steps` to run";

const VERBOSE: &str = "verbose";

const QUIET: &str = "quiet";

const LOG_CONFIG: &str = "log4rs.yaml";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(SCRIPT_PATH)
                .help(SCRIPT_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(VERBOSE)
                .short('v')
                .long(VERBOSE)
                .help("Log every call the ledger handles")
                .action(ArgAction::SetTrue)
                .conflicts_with(QUIET),
        )
        .arg(
            Arg::new(QUIET)
                .short('q')
                .long(QUIET)
                .help("Turn ledger logging off")
                .action(ArgAction::SetTrue),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the script.
    Format(String),
    /// The script's initial ledger could not be created.
    Setup(LedgerError),
}

/// A replay script.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Script {
    owner: Address,
    quorum: QuorumSetup,
    /// Falls back to `Ledger.toml` and the environment if absent.
    #[serde(default)]
    config: Option<LedgerConfig>,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QuorumSetup {
    admins: Vec<Address>,
    required: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Step {
    caller: Address,
    at: DateTime<Utc>,
    call: LedgerCall,
    #[serde(default)]
    expect: Expectation,
}

/// What a step is expected to do.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Expectation {
    #[default]
    Ok,
    Rejected(ErrorKind),
}

impl Display for Expectation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "success"),
            Self::Rejected(kind) => write!(f, "{kind:?} rejection"),
        }
    }
}

/// The result of running one step.
#[derive(Debug, Eq, PartialEq)]
struct StepOutcome {
    /// 1-based position in the script.
    step: usize,
    operation: &'static str,
    result: Result<Receipt, LedgerError>,
    expected: Expectation,
}

impl StepOutcome {
    fn held(&self) -> bool {
        match (&self.result, self.expected) {
            (Ok(_), Expectation::Ok) => true,
            (Err(err), Expectation::Rejected(kind)) => err.kind() == kind,
            _ => false,
        }
    }
}

impl Display for StepOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Step {}: {} ", self.step, self.operation)?;
        match &self.result {
            Ok(receipt) => {
                write!(f, "ok")?;
                if let Some(id) = receipt.created {
                    write!(f, " (created {id})")?;
                }
                let events = receipt.events.len();
                write!(f, ", {} event{}", events, if events != 1 { "s" } else { "" })?;
            }
            Err(err) => write!(f, "rejected: {err}")?,
        }
        if !self.held() {
            write!(f, " [expected {}]", self.expected)?;
        }
        Ok(())
    }
}

/// Everything a replay produced.
struct Replay {
    outcomes: Vec<StepOutcome>,
    ledger: LedgerState,
}

impl Replay {
    fn all_held(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::held)
    }
}

/// Load a script and run it.
fn replay(path: &str) -> Result<Replay, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let script: Script =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    // Build the initial ledger.
    let config = match script.config {
        Some(config) => {
            config
                .validate()
                .map_err(|e| Error::Format(e.to_string()))?;
            config
        }
        None => LedgerConfig::load().map_err(|e| Error::Format(e.to_string()))?,
    };
    let mut ledger = LedgerState::new(
        script.owner,
        script.quorum.admins,
        script.quorum.required,
        config,
    )
    .map_err(Error::Setup)?;

    // Run every step, whatever happens to the ones before.
    let outcomes = script
        .steps
        .into_iter()
        .enumerate()
        .map(|(index, step)| {
            let ctx = CallContext::new(step.caller, step.at);
            let operation = step.call.operation();
            StepOutcome {
                step: index + 1,
                operation,
                result: ledger.dispatch(&ctx, step.call),
                expected: step.expect,
            }
        })
        .collect();

    Ok(Replay { outcomes, ledger })
}

/// Print the vote counters of every election.
fn print_tallies(ledger: &LedgerState) {
    for election in ledger.elections() {
        println!("Election {} \"{}\":", election.id, election.title);
        for position_id in &election.position_ids {
            let title = ledger
                .position(*position_id)
                .map_or("?", |position| position.title.as_str());
            println!("  {title}:");
            for candidate_id in election.candidates_for(*position_id) {
                if let Some(candidate) = ledger.candidate(*candidate_id) {
                    println!(
                        "    {}: {} vote{}",
                        candidate.name,
                        candidate.vote_count,
                        if candidate.vote_count != 1 { "s" } else { "" }
                    );
                }
            }
        }
    }
}

/// Run the replay, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(SCRIPT_PATH).unwrap(); // Required argument is guaranteed to be present.
    if args.get_flag(VERBOSE) {
        log4rs_dynamic_filters::DynamicLevelFilter::set("election_ledger", LevelFilter::Debug);
    } else if args.get_flag(QUIET) {
        log4rs_dynamic_filters::DynamicLevelFilter::set("election_ledger", LevelFilter::Off);
    }

    match replay(path) {
        Ok(replay) => {
            for outcome in &replay.outcomes {
                println!("{outcome}");
            }
            print_tallies(&replay.ledger);
            if replay.all_held() {
                println!("All {} steps behaved as expected.", replay.outcomes.len());
                0
            } else {
                let failed = replay.outcomes.iter().filter(|o| !o.held()).count();
                println!("{failed} step{} did not behave as expected.", if failed != 1 { "s" } else { "" });
                255
            }
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid script: {}", msg);
            1
        }
        Err(Error::Setup(err)) => {
            println!("Could not create the ledger: {}", err);
            1
        }
    }
}

fn main() {
    // Set up logging. The replay still works without it.
    if let Err(err) = log4rs::init_file(LOG_CONFIG, log4rs_dynamic_filters::default_deserializers())
    {
        eprintln!("Logging disabled: {err}");
    }
    info!("Initialised logging");

    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        // This test actually enters ledger code, so enable logging.
        log4rs_test_utils::test_logging::init_logging_once_for(["election_ledger"], None, None);
    }

    #[test]
    fn replay_scripts() {
        init_logging();

        let report = replay("example_scripts/election.json").unwrap();
        assert_eq!(report.outcomes.len(), 12);
        assert!(report.all_held());
        assert_eq!(report.outcomes[0].result.as_ref().unwrap().created, Some(1));
        assert_eq!(
            report.outcomes[8].result,
            Err(LedgerError::state("Already voted for this position"))
        );
        assert_eq!(
            report.outcomes[11].result,
            Err(LedgerError::state("Transaction already executed"))
        );
        assert_eq!(report.ledger.results(1, 1), Ok(vec![(1, 1), (2, 0)]));
        assert!(!report.ledger.election(1).unwrap().is_active);

        let report = replay("example_scripts/election_mismatch.json").unwrap();
        let failed: Vec<_> = report.outcomes.iter().filter(|o| !o.held()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].step, 7);
        assert!(failed[0].to_string().ends_with("[expected success]"));

        let report = replay("example_scripts/lockout.json").unwrap();
        assert!(report.all_held());
        assert_eq!(report.ledger.config().lockout_threshold(), 2);
        assert_eq!(
            report.outcomes[7].result,
            Err(LedgerError::state("Account temporarily locked"))
        );

        assert!(matches!(
            replay("example_scripts/malformed.json"),
            Err(Error::Format(_))
        ));
        assert!(matches!(replay("not a real file"), Err(Error::IO(_))));
    }

    #[test]
    fn correct_cli_usage() {
        init_logging();

        let command_line = [PROGRAM_NAME, "example_scripts/election.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, "-v", "example_scripts/election_mismatch.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 255);

        let command_line = [PROGRAM_NAME, "--quiet", "example_scripts/malformed.json"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);

        let command_line = [PROGRAM_NAME, "not a real file"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // Something very wrong.
        let command_line = [PROGRAM_NAME, "this", "invocation", "is", "incorrect"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // No options at all.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();

        // Both louder and quieter.
        let command_line = [PROGRAM_NAME, "-v", "-q", "example_scripts/election.json"];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
