//! Elo-style rating adjustments.
//!
//! A self-contained rating scalar, independent of the ladder: it never reads
//! or writes ranking state, and nothing in the engine consumes it. Kept as
//! the statistical alternative to positional ranking for callers that want
//! score-based matchmaking.

/// The rating interval over which one player is ten times as likely to win.
const DEVIATION: f64 = 400.0;

/// Maximum rating movement per result.
const K_FACTOR: f64 = 32.0;

/// An Elo-style rating scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rating(f64);

impl Rating {
    /// Wraps a raw rating value.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    /// The raw rating value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// The transformed rating `10^(|r| / 400)`, the scale on which expected
    /// scores are computed.
    #[must_use]
    pub fn transformed(self) -> f64 {
        10f64.powf(self.0.abs() / DEVIATION)
    }

    /// Expected score against an opponent's transformed rating.
    #[must_use]
    pub fn expected(self, opponent_transformed: f64) -> f64 {
        let own = self.transformed();
        own / (own + opponent_transformed)
    }

    /// The rating after beating `opponent`: `r + K * (1 - E)`.
    #[must_use]
    pub fn won(self, opponent: Self) -> Self {
        Self(self.0 + K_FACTOR * (1.0 - self.expected(opponent.transformed())))
    }

    /// The rating after losing to `opponent`: `r + K * (0 - E)`.
    #[must_use]
    pub fn lost(self, opponent: Self) -> Self {
        Self(self.0 + K_FACTOR * (0.0 - self.expected(opponent.transformed())))
    }
}
