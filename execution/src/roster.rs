use dicepit_types::{game::Participant, UserId};
use thiserror::Error;

/// Registration rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("user {0:?} is already registered with that asset")]
    AlreadyRegistered(UserId),
}

/// In-memory participant registry scoped to one game instance.
///
/// Purely local state: no persistence, no network. Insertion order is
/// stable and survives asset swaps.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant.
    ///
    /// A new identity is appended. An existing identity fielding a different
    /// asset is replaced in place, keeping its index. Re-registering the
    /// same identity with the same asset is rejected.
    pub fn add(&mut self, participant: Participant) -> Result<(), RosterError> {
        if let Some(existing) = self
            .participants
            .iter_mut()
            .find(|p| p.user == participant.user)
        {
            if existing.asset == participant.asset {
                return Err(RosterError::AlreadyRegistered(participant.user));
            }
            *existing = participant;
            return Ok(());
        }
        self.participants.push(participant);
        Ok(())
    }

    /// Remove a participant, reporting whether one was present.
    pub fn remove(&mut self, user: UserId) -> bool {
        match self.index_of(user) {
            Some(index) => {
                self.participants.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, user: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user == user)
    }

    pub fn get_mut(&mut self, user: UserId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.user == user)
    }

    /// Stable insertion-order index of a participant.
    pub fn index_of(&self, user: UserId) -> Option<usize> {
        self.participants.iter().position(|p| p.user == user)
    }

    /// All participants in insertion order.
    pub fn all(&self) -> &[Participant] {
        &self.participants
    }

    pub fn all_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }

    /// Whether every seat is held by an NPC (the no-winner edge case).
    pub fn all_npc(&self) -> bool {
        !self.participants.is_empty() && self.participants.iter().all(|p| p.is_npc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicepit_types::{
        game::{Roll, Round, RoundSequence},
        AssetId, Wallet,
    };

    fn sequence() -> RoundSequence {
        RoundSequence {
            rounds: vec![Round {
                rolls: vec![Roll {
                    face: 1,
                    damage: 1,
                    total: 21,
                }],
            }],
            win_round: 0,
            win_roll: 0,
            zen: true,
        }
    }

    fn human(user: u64, asset: u64) -> Participant {
        Participant::human(
            UserId(user),
            Wallet(format!("0x{user:02x}")),
            AssetId(asset),
            sequence(),
        )
    }

    #[test]
    fn test_add_and_lookup() {
        let mut roster = Roster::new();
        roster.add(human(1, 10)).unwrap();
        roster.add(human(2, 20)).unwrap();

        assert_eq!(roster.count(), 2);
        assert_eq!(roster.index_of(UserId(1)), Some(0));
        assert_eq!(roster.index_of(UserId(2)), Some(1));
        assert_eq!(roster.index_of(UserId(3)), None);
        assert_eq!(roster.get(UserId(2)).unwrap().asset, AssetId(20));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut roster = Roster::new();
        roster.add(human(1, 10)).unwrap();
        assert_eq!(
            roster.add(human(1, 10)),
            Err(RosterError::AlreadyRegistered(UserId(1)))
        );
        assert_eq!(roster.count(), 1);
    }

    #[test]
    fn test_asset_swap_replaces_in_place() {
        let mut roster = Roster::new();
        roster.add(human(1, 10)).unwrap();
        roster.add(human(2, 20)).unwrap();

        roster.add(human(1, 11)).unwrap();
        assert_eq!(roster.count(), 2);
        // Index is preserved across the swap.
        assert_eq!(roster.index_of(UserId(1)), Some(0));
        assert_eq!(roster.get(UserId(1)).unwrap().asset, AssetId(11));
    }

    #[test]
    fn test_remove() {
        let mut roster = Roster::new();
        roster.add(human(1, 10)).unwrap();
        assert!(roster.remove(UserId(1)));
        assert!(!roster.remove(UserId(1)));
        assert_eq!(roster.count(), 0);
    }

    #[test]
    fn test_all_npc() {
        let mut roster = Roster::new();
        assert!(!roster.all_npc());

        roster
            .add(Participant::npc(UserId(1_000), AssetId(1), sequence()))
            .unwrap();
        assert!(roster.all_npc());

        roster.add(human(1, 10)).unwrap();
        assert!(!roster.all_npc());
    }
}
