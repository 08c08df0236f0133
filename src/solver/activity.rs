//! Decaying literal activity used by the VSADS heuristic and for ranking
//! backbone candidates.

use crate::{
    datastructure::LitVec,
    literal::{Lit, Var},
};
use ordered_float::NotNan;

const BUMP_INITIAL: f64 = 1.0;
const RESCALE_LIMIT: f64 = 1e100;

#[derive(Debug, Clone)]
pub(crate) struct Activity {
    scores: LitVec<NotNan<f64>>,
    /// the value used for bumping activity values
    bump: NotNan<f64>,
    /// The decay factor
    decay: NotNan<f64>,
}

impl Default for Activity {
    fn default() -> Self {
        Self::new(0.95)
    }
}

impl Activity {
    pub(crate) fn new(decay: f64) -> Self {
        Self {
            scores: LitVec::default(),
            bump: NotNan::new(BUMP_INITIAL).expect("constant is a number"),
            decay: NotNan::new(decay)
                .unwrap_or_else(|_| NotNan::new(0.95).expect("constant is a number")),
        }
    }

    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.scores.set_var_count(count);
    }

    pub(crate) fn score(&self, lit: Lit) -> NotNan<f64> {
        self.scores[lit]
    }

    /// Activity of both literals of `var`.
    pub(crate) fn var_score(&self, var: Var) -> NotNan<f64> {
        self.scores[var.positive()] + self.scores[var.negative()]
    }

    /// Increase activity score for the provided literal.
    pub(crate) fn bump(&mut self, lit: Lit) {
        let score = &mut self.scores[lit];
        *score += self.bump;
        if **score >= RESCALE_LIMIT {
            self.rescale();
        }
    }

    /// Decay all literal activities.
    ///
    /// Instead of touching every score, future bumps grow.
    pub(crate) fn decay(&mut self) {
        self.bump /= self.decay;
        if *self.bump >= RESCALE_LIMIT {
            self.rescale();
        }
    }

    /// Rescale activities to prevent overflow
    fn rescale(&mut self) {
        let rescale_factor = RESCALE_LIMIT.recip();
        for score in self.scores.iter_mut() {
            *score *= rescale_factor;
        }
        self.bump *= rescale_factor;
    }

    /// Forgets every score.
    pub(crate) fn reset(&mut self) {
        for score in self.scores.iter_mut() {
            *score = NotNan::default();
        }
        self.bump = NotNan::new(BUMP_INITIAL).expect("constant is a number");
    }
}
