//! Random speaker picker
//!
//! The winner is a single uniform draw over the unspoken participants. The
//! reel around it is decoration: every other slot is an independent draw
//! from the same pool, repeats allowed, so the spin looks busy even with two
//! people left.

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::rng::PickRng;
use crate::roster::Participant;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One spin of the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickSession {
    pub winner: Participant,
    /// Decoys with the winner at `winner_slot_index`
    pub reel: Vec<Participant>,
    pub winner_slot_index: usize,
}

/// Builds pick sessions from a roster
pub struct PickerEngine {
    config: Arc<SessionConfig>,
}

impl PickerEngine {
    /// Create a picker using the configured reel geometry
    pub fn new(config: Arc<SessionConfig>) -> Self {
        Self { config }
    }

    /// Pick the next speaker among participants who have not spoken
    ///
    /// Reads `participants` only; committing the winner is up to the caller.
    pub fn pick(&self, participants: &[Participant], rng: &mut PickRng) -> Result<PickSession> {
        let pool: Vec<&Participant> = participants.iter().filter(|p| !p.spoken).collect();
        let winner = match rng.pick(&pool) {
            Some(winner) => (*winner).clone(),
            None => return Err(Error::EmptyPool),
        };

        let winner_slot_index =
            rng.range_inclusive(self.config.min_winner_slot, self.config.max_winner_slot());
        let reel_len = winner_slot_index + self.config.reel_tail;

        let mut reel = Vec::with_capacity(reel_len);
        for slot in 0..reel_len {
            if slot == winner_slot_index {
                reel.push(winner.clone());
            } else {
                // pool is non-empty here, so the draw always lands
                let decoy = pool[rng.below(pool.len())];
                reel.push(decoy.clone());
            }
        }

        tracing::info!(winner = %winner, winner_slot_index, pool = pool.len(), "speaker picked");
        Ok(PickSession {
            winner,
            reel,
            winner_slot_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn roster() -> Vec<Participant> {
        let mut a = Participant::new("A", "One");
        a.spoken = true;
        vec![a, Participant::new("B", "Two"), Participant::new("C", "Three")]
    }

    fn picker() -> PickerEngine {
        PickerEngine::new(Arc::new(SessionConfig::default()))
    }

    #[test]
    fn test_winner_is_unspoken_and_reel_shape_holds() {
        let picker = picker();
        let participants = roster();
        let mut rng = PickRng::new(2024);

        for _ in 0..500 {
            let pick = picker.pick(&participants, &mut rng).unwrap();
            assert!(pick.winner.first_name == "B" || pick.winner.first_name == "C");
            assert!((40..=49).contains(&pick.winner_slot_index));
            assert_eq!(pick.reel.len(), pick.winner_slot_index + 6);
            assert_eq!(pick.slot(pick.winner_slot_index), Some(&pick.winner));
            assert!(pick.reel.iter().all(|p| !p.spoken));
        }
    }

    #[test]
    fn test_empty_pool() {
        let picker = picker();
        let mut all_spoken = roster();
        for p in &mut all_spoken {
            p.spoken = true;
        }
        let mut rng = PickRng::new(1);
        assert_eq!(picker.pick(&all_spoken, &mut rng), Err(Error::EmptyPool));
        assert_eq!(picker.pick(&[], &mut rng), Err(Error::EmptyPool));
    }

    #[test]
    fn test_winner_distribution_is_uniform() {
        let picker = picker();
        let participants: Vec<Participant> = (0..4)
            .map(|i| Participant::new(format!("P{}", i), "X"))
            .collect();
        let mut rng = PickRng::new(77);
        let mut counts: HashMap<String, usize> = HashMap::new();

        for _ in 0..4000 {
            let pick = picker.pick(&participants, &mut rng).unwrap();
            *counts.entry(pick.winner.first_name).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            // expect 1000 each
            assert!(*count > 850 && *count < 1150, "count {}", count);
        }
    }

    #[test]
    fn test_every_winner_slot_occurs() {
        let picker = picker();
        let participants = roster();
        let mut rng = PickRng::new(5);
        let mut seen = [false; 10];
        for _ in 0..1000 {
            let pick = picker.pick(&participants, &mut rng).unwrap();
            seen[pick.winner_slot_index - 40] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_single_candidate_fills_reel() {
        let picker = picker();
        let mut participants = roster();
        participants[2].spoken = true;
        let mut rng = PickRng::new(9);

        let pick = picker.pick(&participants, &mut rng).unwrap();
        assert_eq!(pick.winner.first_name, "B");
        assert!(pick.reel.iter().all(|p| p.first_name == "B"));
    }

    #[test]
    fn test_does_not_touch_roster() {
        let picker = picker();
        let participants = roster();
        let before = participants.clone();
        picker.pick(&participants, &mut PickRng::new(3)).unwrap();
        assert_eq!(participants, before);
    }
}
