use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::Path,
};

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::gesture::SwipeDirection;
use super::round::{RoundController, Side, Verdict};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub at_ms: u64,
    pub direction: SwipeDirection,
}

/// Everything needed to play a finished round again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundLog {
    pub seed: u64,
    pub target: Side,
    pub started_at: DateTime<Utc>,
    pub swipes: Vec<SwipeRecord>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("seed picks {expected} but the log says {logged}")]
    TargetMismatch { expected: Side, logged: Side },
    #[error("replay ended {replayed:?} but the log says {logged:?}")]
    VerdictMismatch { replayed: Verdict, logged: Verdict },
    #[error("round never finished")]
    Unfinished,
}

impl RoundLog {
    /// Captures a finished round. Swipe times are taken relative to the round's creation at `origin_ms`.
    pub fn capture(seed: u64, origin_ms: u64, round: &RoundController) -> Option<Self> {
        let verdict = round.verdict()?;
        Some(Self {
            seed,
            target: round.target(),
            started_at: round.started_at(),
            swipes: round
                .swipes()
                .iter()
                .map(|&(at, direction)| SwipeRecord {
                    at_ms: at.saturating_sub(origin_ms),
                    direction,
                })
                .collect(),
            verdict,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Adds this round to the end of `path`, one JSON object per line.
    pub fn append(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", self.to_json()?)?;
        info!(path = %path.display(), seed = self.seed, "round log appended");
        Ok(())
    }

    /// Reads every round recorded in `path`, oldest first.
    pub fn load_all(path: &Path) -> Result<Vec<Self>> {
        fs::read_to_string(path)?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(Self::from_json)
            .collect()
    }
}

/// Plays the log's swipes against a fresh round and checks it ends the same way.
pub fn replay(log: &RoundLog) -> std::result::Result<Verdict, ReplayError> {
    let mut round = RoundController::new(&mut StdRng::seed_from_u64(log.seed), 0);
    if round.target() != log.target {
        return Err(ReplayError::TargetMismatch {
            expected: round.target(),
            logged: log.target,
        });
    }

    for swipe in &log.swipes {
        round.swipe(swipe.at_ms, swipe.direction);
    }

    let replayed = round.run_to_end().ok_or(ReplayError::Unfinished)?;
    if replayed != log.verdict {
        return Err(ReplayError::VerdictMismatch {
            replayed,
            logged: log.verdict,
        });
    }
    Ok(replayed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::swap_game::round::INSTRUCTION_MS;

    const SEED: u64 = 1234;

    fn played(origin: u64, swipes: &[u64]) -> RoundController {
        let mut round = RoundController::new(&mut StdRng::seed_from_u64(SEED), origin);
        for &at in swipes {
            round.swipe(origin + at, SwipeDirection::Right);
        }
        round.run_to_end();
        round
    }

    #[test]
    fn replay_reproduces_verdict() {
        let origin = 98_765;
        let start = INSTRUCTION_MS;
        let round = played(origin, &[start + 400, start + 1300, start + 2100, start + 7700]);
        let log = RoundLog::capture(SEED, origin, &round).expect("round finished");

        assert_eq!(log.swipes.len(), 4);
        assert_eq!(log.swipes[0].at_ms, start + 400);
        assert_eq!(replay(&log), Ok(round.verdict().unwrap()));
    }

    #[test]
    fn tampered_logs_are_rejected() {
        let round = played(0, &[INSTRUCTION_MS + 500]);
        let log = RoundLog::capture(SEED, 0, &round).unwrap();

        let mut wrong_target = log.clone();
        wrong_target.target = log.target.toggled();
        assert!(matches!(
            replay(&wrong_target),
            Err(ReplayError::TargetMismatch { .. })
        ));

        let mut wrong_verdict = log.clone();
        wrong_verdict.verdict = match log.verdict {
            Verdict::Won => Verdict::Lost,
            Verdict::Lost => Verdict::Won,
        };
        assert!(matches!(
            replay(&wrong_verdict),
            Err(ReplayError::VerdictMismatch { .. })
        ));
    }

    #[test]
    fn unfinished_round_has_no_log() {
        let round = RoundController::new(&mut StdRng::seed_from_u64(SEED), 0);
        assert!(RoundLog::capture(SEED, 0, &round).is_none());
    }

    #[test]
    fn every_recorded_round_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.jsonl");

        let first = RoundLog::capture(SEED, 0, &played(0, &[INSTRUCTION_MS + 250])).unwrap();
        let mut second_round = RoundController::new(&mut StdRng::seed_from_u64(SEED + 1), 0);
        second_round.swipe(INSTRUCTION_MS + 900, SwipeDirection::Left);
        second_round.run_to_end();
        let second = RoundLog::capture(SEED + 1, 0, &second_round).unwrap();

        first.append(&path).unwrap();
        second.append(&path).unwrap();

        let loaded = RoundLog::load_all(&path).unwrap();
        assert_eq!(loaded, vec![first, second]);
        for log in &loaded {
            assert!(replay(log).is_ok());
        }
    }

    #[test]
    fn started_at_is_taken_when_the_round_begins() {
        let before = Utc::now();
        let mut round = RoundController::new(&mut StdRng::seed_from_u64(SEED), 0);
        let created = Utc::now();
        round.run_to_end();

        let log = RoundLog::capture(SEED, 0, &round).unwrap();
        assert!(before <= log.started_at);
        assert!(log.started_at <= created);
    }
}
