// ============================================================
// Layer 3 — TrainingState
// ============================================================
// The mutable scalars of a training run, threaded explicitly
// through the orchestrator:
//
//   learning_rate — changed only by the decay decision
//   best_loss     — lowest validation loss so far (starts at +inf)
//   best_count    — inner epochs since best_loss last improved
//   log           — (train_loss, valid_loss) per inner epoch
//
// The two per-inner-epoch decisions live here as plain methods:
//
//   checkpoint_decision  — strict improvement → save weights
//   lr_decay_decision    — plateau of `interval` steps → decay
//
// Order matters: the orchestrator records, then checks for a
// checkpoint, then checks for decay, exactly once per inner
// epoch.

use serde::{Deserialize, Serialize};

/// Learning-rate decay on validation plateaus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayPolicy {
    /// Multiplier applied on each decay
    pub lr_decay: f64,
    /// Floor the rate never drops below
    pub lr_min:   f64,
    /// Inner epochs without improvement before a decay
    pub interval: usize,
}

impl DecayPolicy {
    /// No decay happens during epochs 0 and 1.
    pub const FIRST_DECAY_EPOCH: usize = 2;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub learning_rate: f64,
    pub best_loss:     f64,
    pub best_count:    usize,
    pub log:           Vec<[f64; 2]>,
}

impl TrainingState {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            best_loss:  f64::INFINITY,
            best_count: 0,
            log:        Vec::new(),
        }
    }

    /// Append one inner epoch's losses to the log.
    pub fn record(&mut self, train_loss: f64, valid_loss: f64) {
        self.log.push([train_loss, valid_loss]);
    }

    /// Returns true when `valid_loss` strictly beats every earlier validation
    /// loss of the run; the caller must then persist the weights.
    pub fn checkpoint_decision(&mut self, valid_loss: f64) -> bool {
        if valid_loss < self.best_loss {
            self.best_loss  = valid_loss;
            self.best_count = 0;
            true
        } else {
            self.best_count += 1;
            false
        }
    }

    /// Applies a decay when the plateau counter has reached the policy's
    /// interval, returning the new learning rate.
    pub fn lr_decay_decision(&mut self, epoch: usize, policy: &DecayPolicy) -> Option<f64> {
        if epoch < DecayPolicy::FIRST_DECAY_EPOCH || self.best_count < policy.interval {
            return None;
        }
        self.best_count    = 0;
        self.learning_rate = (self.learning_rate * policy.lr_decay).max(policy.lr_min);
        Some(self.learning_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> DecayPolicy {
        DecayPolicy { lr_decay: 0.5, lr_min: 0.1, interval: 2 }
    }

    #[test]
    fn test_first_loss_always_checkpoints() {
        let mut state = TrainingState::new(1e-3);
        assert!(state.best_loss.is_infinite());
        assert!(state.checkpoint_decision(0.05));
        assert_eq!(state.best_loss, 0.05);
        assert_eq!(state.best_count, 0);
    }

    #[test]
    fn test_checkpoint_only_on_strict_improvement() {
        let mut state  = TrainingState::new(1e-3);
        let losses     = [0.5, 0.4, 0.4, 0.6, 0.39, 0.39, 0.1];
        let decisions: Vec<bool> = losses.iter().map(|&l| state.checkpoint_decision(l)).collect();
        assert_eq!(decisions, vec![true, true, false, false, true, false, true]);

        // Cross-check against "strictly below every prior loss"
        for (i, &l) in losses.iter().enumerate() {
            let prior_min = losses[..i].iter().cloned().fold(f64::INFINITY, f64::min);
            assert_eq!(decisions[i], l < prior_min);
        }
    }

    #[test]
    fn test_plateau_counter() {
        let mut state = TrainingState::new(1e-3);
        state.checkpoint_decision(1.0);
        state.checkpoint_decision(2.0);
        state.checkpoint_decision(3.0);
        assert_eq!(state.best_count, 2);
        state.checkpoint_decision(0.5);
        assert_eq!(state.best_count, 0);
    }

    #[test]
    fn test_no_decay_before_epoch_two() {
        let mut state = TrainingState::new(1.0);
        state.best_count = 100;
        assert_eq!(state.lr_decay_decision(0, &policy()), None);
        assert_eq!(state.lr_decay_decision(1, &policy()), None);
        assert_eq!(state.learning_rate, 1.0);
        assert_eq!(state.best_count, 100);

        assert_eq!(state.lr_decay_decision(2, &policy()), Some(0.5));
        assert_eq!(state.best_count, 0);
    }

    #[test]
    fn test_decay_waits_for_interval() {
        let mut state = TrainingState::new(1.0);
        state.best_count = 1;
        assert_eq!(state.lr_decay_decision(5, &policy()), None);
        state.best_count = 2;
        assert_eq!(state.lr_decay_decision(5, &policy()), Some(0.5));
    }

    #[test]
    fn test_decay_floors_at_lr_min() {
        let mut state = TrainingState::new(1.0);
        for _ in 0..20 {
            state.best_count = 2;
            state.lr_decay_decision(3, &policy());
            assert!(state.learning_rate >= policy().lr_min);
        }
        assert_eq!(state.learning_rate, 0.1);
    }

    #[test]
    fn test_record_appends_in_order() {
        let mut state = TrainingState::new(1e-3);
        state.record(0.3, 0.2);
        state.record(0.25, 0.21);
        assert_eq!(state.log, vec![[0.3, 0.2], [0.25, 0.21]]);
    }
}
