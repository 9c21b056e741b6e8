//! A simple CLI tool for checking and counting a Ponta Firme election offline.
//! It reads the local store file, or the body of `GET /admin/state`, and uses the
//! server's own tally so the ranking always matches the results endpoints.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgAction, ArgMatches, Command};
use rocket::serde::json::serde_json;

use ponta_firme_backend::model::{
    election::{ElectionState, VotingStatus},
    roster::Roster,
    tally::tally,
};

const PROGRAM_NAME: &str = "ponta-firme-results";

const ABOUT_TEXT: &str = "Check and count the votes of a Ponta Firme election.

EXIT CODES:
     0: Check succeeded.
   255: Ran successfully, but the votes are inconsistent.
 Other: Error.";

const STATE_PATH: &str = "STATE_PATH";

const STATE_PATH_HELP: &str = "The path to a JSON dump of the election, either the\n\
local store file or the body of `GET /admin/state`";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME).about(ABOUT_TEXT).arg(
        Arg::new(STATE_PATH)
            .help(STATE_PATH_HELP)
            .action(ArgAction::Set)
            .required(true),
    )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// Failed to decode the JSON dump.
    Format(String),
    /// The votes break one of the election's rules.
    Inconsistent(Inconsistency),
}

#[derive(Debug, Eq, PartialEq)]
enum Inconsistency {
    DuplicateVoter { voter_id: String },
    UnknownVoter { voter_id: String },
    UnknownCandidate { candidate_id: String },
    SelfVote { voter_id: String },
}

impl Display for Inconsistency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateVoter { voter_id } => write!(f, "{voter_id} voted more than once."),
            Self::UnknownVoter { voter_id } => write!(f, "{voter_id} is not on the roster."),
            Self::UnknownCandidate { candidate_id } => {
                write!(f, "Vote for {candidate_id}, who is not on the roster.")
            }
            Self::SelfVote { voter_id } => write!(f, "{voter_id} voted for themselves."),
        }
    }
}

/// A friendly line of the results.
#[derive(Debug, Eq, PartialEq)]
struct FriendlyResult {
    pub candidate_name: String,
    pub count: u64,
}

impl Display for FriendlyResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} vote{}",
            self.candidate_name,
            self.count,
            if self.count != 1 { "s" } else { "" }
        )
    }
}

/// Everything the tool reports on success.
#[derive(Debug, Eq, PartialEq)]
struct Report {
    status: VotingStatus,
    results: Vec<FriendlyResult>,
}

/// Check every vote against the roster and the one-vote rule.
fn check(state: &ElectionState, roster: &Roster) -> Result<(), Inconsistency> {
    let mut seen = HashSet::with_capacity(state.votes.len());
    for vote in &state.votes {
        if !roster.contains(&vote.voter_id) {
            return Err(Inconsistency::UnknownVoter {
                voter_id: vote.voter_id.clone(),
            });
        }
        if !roster.contains(&vote.candidate_id) {
            return Err(Inconsistency::UnknownCandidate {
                candidate_id: vote.candidate_id.clone(),
            });
        }
        if vote.voter_id == vote.candidate_id {
            return Err(Inconsistency::SelfVote {
                voter_id: vote.voter_id.clone(),
            });
        }
        if !seen.insert(vote.voter_id.as_str()) {
            return Err(Inconsistency::DuplicateVoter {
                voter_id: vote.voter_id.clone(),
            });
        }
    }
    Ok(())
}

/// Load, check and count.
fn count(path: &str) -> Result<Report, Error> {
    // Load the file.
    let file = BufReader::new(File::open(path).map_err(|e| Error::IO(e.to_string()))?);
    let state: ElectionState =
        serde_json::from_reader(file).map_err(|e| Error::Format(e.to_string()))?;

    let roster = Roster::builtin();
    check(&state, &roster).map_err(Error::Inconsistent)?;

    let results = tally(&state.votes)
        .into_iter()
        .map(|t| FriendlyResult {
            candidate_name: roster.display_name(&t.candidate_id).to_string(),
            count: t.count,
        })
        .collect();

    Ok(Report {
        status: state.status,
        results,
    })
}

/// Count the votes, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    let path: &String = args.get_one(STATE_PATH).unwrap(); // Required argument is guaranteed to be present.
    match count(path) {
        Ok(report) => {
            println!("Check succeeded. Voting is {}.", report.status);
            if report.status != VotingStatus::Closed {
                println!("Voting has not closed; these results are not final.");
            }
            if report.results.is_empty() {
                println!("No votes have been cast.");
            }
            for (place, result) in report.results.iter().enumerate() {
                println!("{:>2}. {}", place + 1, result);
            }
            0
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {msg}");
            1
        }
        Err(Error::Format(msg)) => {
            println!("Invalid JSON: {msg}");
            1
        }
        Err(Error::Inconsistent(reason)) => {
            println!("Check failed: {reason}");
            255
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
