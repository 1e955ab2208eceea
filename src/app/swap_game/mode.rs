use super::round::{Side, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Playing,
    Results {
        verdict: Verdict,
        target: Side,
        last: Side,
    },
}
