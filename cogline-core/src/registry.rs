//! Line ownership registry
//!
//! One table per runtime records which claimant (if any) holds each line
//! and what the line's registers looked like right before it was claimed.
//! Every operation is a single short critical section, so claims,
//! releases and moves are atomic with respect to each other no matter
//! which flow of control issues them.
//!
//! The registry only tracks ownership. Putting a line back to input when
//! a generator lets go of it is the generator's job (see
//! [`ReleasePolicy`]).

use core::cell::RefCell;

use embassy_sync::blocking_mutex::CriticalSectionMutex;
use heapless::Vec;

use cogline_hal::{Direction, Level, Line, WorkerId, LINE_COUNT};

use crate::error::{Error, Result};

/// Identifier of a stream driver that bit-bangs from the caller's own
/// flow of control and therefore has no worker of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DriverId(pub u16);

/// Holder of a line claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Claimant {
    /// A background worker (generator or full-duplex receiver)
    Worker(WorkerId),
    /// A foreground stream driver
    Driver(DriverId),
}

/// How a component leaves a line when it lets go of it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReleasePolicy {
    /// Switch the line to input, so a level preset by the caller with the
    /// output register takes over again (generators, `freqout`)
    ResetToInput,
    /// Leave direction and output as last driven (timed I/O, streams)
    LeaveDriven,
}

/// Line registers captured when a claim was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineSnapshot {
    pub direction: Direction,
    pub output: Level,
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    owner: Option<Claimant>,
    prior: Option<LineSnapshot>,
}

impl Slot {
    const FREE: Slot = Slot {
        owner: None,
        prior: None,
    };
}

/// Process-wide line ownership table
pub struct LineRegistry {
    slots: CriticalSectionMutex<RefCell<[Slot; LINE_COUNT]>>,
}

impl Default for LineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LineRegistry {
    /// Create an empty registry
    pub const fn new() -> Self {
        Self {
            slots: CriticalSectionMutex::new(RefCell::new([Slot::FREE; LINE_COUNT])),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut [Slot; LINE_COUNT]) -> R) -> R {
        self.slots.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Claim `line` for `claimant`
    ///
    /// Claiming a line the claimant already holds succeeds and keeps the
    /// original snapshot.
    pub fn claim(&self, line: Line, claimant: Claimant, prior: LineSnapshot) -> Result<()> {
        self.with(|slots| {
            let slot = &mut slots[line.index()];
            match slot.owner {
                Some(owner) if owner == claimant => Ok(()),
                Some(owner) => {
                    debug!("line {} claim refused, held by {:?}", line.index(), owner);
                    Err(Error::AlreadyClaimed)
                }
                None => {
                    slot.owner = Some(claimant);
                    slot.prior = Some(prior);
                    trace!("line {} claimed by {:?}", line.index(), claimant);
                    Ok(())
                }
            }
        })
    }

    /// Claim several lines at once, all or nothing
    pub fn claim_all(&self, lines: &[(Line, LineSnapshot)], claimant: Claimant) -> Result<()> {
        self.with(|slots| {
            let blocked = lines.iter().any(|(line, _)| {
                matches!(slots[line.index()].owner, Some(owner) if owner != claimant)
            });
            if blocked {
                return Err(Error::AlreadyClaimed);
            }
            for (line, prior) in lines {
                let slot = &mut slots[line.index()];
                if slot.owner.is_none() {
                    slot.owner = Some(claimant);
                    slot.prior = Some(*prior);
                }
            }
            Ok(())
        })
    }

    /// Release `line`, returning who held it
    ///
    /// Idempotent. The line's registers are not touched.
    pub fn release(&self, line: Line) -> Option<Claimant> {
        self.with(|slots| {
            let slot = &mut slots[line.index()];
            let owner = slot.owner.take();
            slot.prior = None;
            owner
        })
    }

    /// Release `line` only if `claimant` holds it
    pub fn release_if(&self, line: Line, claimant: Claimant) -> bool {
        self.with(|slots| {
            let slot = &mut slots[line.index()];
            if slot.owner == Some(claimant) {
                *slot = Slot::FREE;
                true
            } else {
                false
            }
        })
    }

    /// Release every line held by `claimant`, returning them
    pub fn release_all_of(&self, claimant: Claimant) -> Vec<Line, LINE_COUNT> {
        self.with(|slots| {
            let mut released = Vec::new();
            for line in Line::all() {
                let slot = &mut slots[line.index()];
                if slot.owner == Some(claimant) {
                    *slot = Slot::FREE;
                    // Capacity equals the line count, so this cannot fail
                    let _ = released.push(line);
                }
            }
            released
        })
    }

    /// Hand `line` from one claimant to another
    ///
    /// Fails with `Conflict` unless `from` currently holds the line.
    pub fn transfer(&self, line: Line, from: Claimant, to: Claimant) -> Result<()> {
        self.with(|slots| {
            let slot = &mut slots[line.index()];
            if slot.owner != Some(from) {
                return Err(Error::Conflict);
            }
            slot.owner = Some(to);
            Ok(())
        })
    }

    /// Move a claim from `old` to `new` in one step
    ///
    /// Used when a running generator channel is pointed at another line.
    /// Fails with `Conflict` (and changes nothing) if `new` is held by a
    /// different claimant.
    pub fn rebind(
        &self,
        claimant: Claimant,
        old: Option<Line>,
        new: Line,
        prior: LineSnapshot,
    ) -> Result<()> {
        self.with(|slots| {
            let target = &mut slots[new.index()];
            match target.owner {
                Some(owner) if owner != claimant => return Err(Error::Conflict),
                Some(_) => {}
                None => {
                    target.owner = Some(claimant);
                    target.prior = Some(prior);
                }
            }
            if let Some(old) = old.filter(|old| *old != new) {
                let slot = &mut slots[old.index()];
                if slot.owner == Some(claimant) {
                    *slot = Slot::FREE;
                }
            }
            Ok(())
        })
    }

    /// Current holder of `line`
    pub fn owner_of(&self, line: Line) -> Option<Claimant> {
        self.with(|slots| slots[line.index()].owner)
    }

    pub fn is_claimed(&self, line: Line) -> bool {
        self.owner_of(line).is_some()
    }

    /// Registers of `line` at the time it was claimed
    pub fn prior_state(&self, line: Line) -> Option<LineSnapshot> {
        self.with(|slots| slots[line.index()].prior)
    }

    /// Lines currently held by `claimant`
    pub fn lines_of(&self, claimant: Claimant) -> Vec<Line, LINE_COUNT> {
        self.with(|slots| {
            Line::all()
                .filter(|line| slots[line.index()].owner == Some(claimant))
                .collect()
        })
    }

    /// Number of claimed lines
    pub fn claimed_count(&self) -> usize {
        self.with(|slots| slots.iter().filter(|slot| slot.owner.is_some()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(i: u8) -> Line {
        Line::new(i).unwrap()
    }

    fn worker(i: u8) -> Claimant {
        Claimant::Worker(WorkerId::new(i).unwrap())
    }

    const SNAP: LineSnapshot = LineSnapshot {
        direction: Direction::Input,
        output: Level::Low,
    };

    #[test]
    fn test_claim_and_release() {
        let reg = LineRegistry::new();
        assert_eq!(reg.claim(line(4), worker(1), SNAP), Ok(()));
        assert_eq!(reg.owner_of(line(4)), Some(worker(1)));

        // Same claimant again is fine, someone else is not
        assert_eq!(reg.claim(line(4), worker(1), SNAP), Ok(()));
        assert_eq!(reg.claim(line(4), worker(2), SNAP), Err(Error::AlreadyClaimed));

        assert_eq!(reg.release(line(4)), Some(worker(1)));
        assert_eq!(reg.release(line(4)), None);
        assert!(!reg.is_claimed(line(4)));
    }

    #[test]
    fn test_prior_state_recorded() {
        let reg = LineRegistry::new();
        let snap = LineSnapshot {
            direction: Direction::Output,
            output: Level::High,
        };
        reg.claim(line(2), worker(1), snap).unwrap();
        assert_eq!(reg.prior_state(line(2)), Some(snap));
        reg.release(line(2));
        assert_eq!(reg.prior_state(line(2)), None);
    }

    #[test]
    fn test_claim_all_rolls_back() {
        let reg = LineRegistry::new();
        reg.claim(line(6), worker(2), SNAP).unwrap();

        let lines = [(line(5), SNAP), (line(6), SNAP)];
        assert_eq!(reg.claim_all(&lines, worker(1)), Err(Error::AlreadyClaimed));
        assert!(!reg.is_claimed(line(5)));

        reg.release(line(6));
        assert_eq!(reg.claim_all(&lines, worker(1)), Ok(()));
        assert_eq!(reg.lines_of(worker(1)).len(), 2);
    }

    #[test]
    fn test_transfer() {
        let reg = LineRegistry::new();
        reg.claim(line(0), worker(1), SNAP).unwrap();
        assert_eq!(reg.transfer(line(0), worker(2), worker(3)), Err(Error::Conflict));
        assert_eq!(reg.transfer(line(0), worker(1), worker(3)), Ok(()));
        assert_eq!(reg.owner_of(line(0)), Some(worker(3)));
    }

    #[test]
    fn test_rebind_moves_claim() {
        let reg = LineRegistry::new();
        reg.claim(line(1), worker(1), SNAP).unwrap();
        reg.rebind(worker(1), Some(line(1)), line(2), SNAP).unwrap();
        assert!(!reg.is_claimed(line(1)));
        assert_eq!(reg.owner_of(line(2)), Some(worker(1)));
    }

    #[test]
    fn test_rebind_conflict_changes_nothing() {
        let reg = LineRegistry::new();
        reg.claim(line(1), worker(1), SNAP).unwrap();
        reg.claim(line(2), worker(2), SNAP).unwrap();
        assert_eq!(
            reg.rebind(worker(1), Some(line(1)), line(2), SNAP),
            Err(Error::Conflict)
        );
        assert_eq!(reg.owner_of(line(1)), Some(worker(1)));
        assert_eq!(reg.owner_of(line(2)), Some(worker(2)));
    }

    #[test]
    fn test_release_all_of() {
        let reg = LineRegistry::new();
        let driver = Claimant::Driver(DriverId(7));
        reg.claim(line(3), driver, SNAP).unwrap();
        reg.claim(line(9), driver, SNAP).unwrap();
        reg.claim(line(10), worker(1), SNAP).unwrap();

        let released = reg.release_all_of(driver);
        assert_eq!(released.as_slice(), &[line(3), line(9)]);
        assert_eq!(reg.claimed_count(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Claim(u8, u8),
        Release(u8),
        Transfer(u8, u8, u8),
        Rebind(u8, u8, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        let l = 0u8..8;
        let w = 1u8..4;
        prop_oneof![
            (l.clone(), w.clone()).prop_map(|(l, w)| Op::Claim(l, w)),
            l.clone().prop_map(Op::Release),
            (l.clone(), w.clone(), w.clone()).prop_map(|(l, a, b)| Op::Transfer(l, a, b)),
            (w, l.clone(), l).prop_map(|(w, a, b)| Op::Rebind(w, a, b)),
        ]
    }

    proptest! {
        /// The registry agrees with a plain owner table after any sequence
        #[test]
        fn prop_matches_model(ops in proptest::collection::vec(op(), 1..200)) {
            let reg = LineRegistry::new();
            let mut model: [Option<u8>; 8] = [None; 8];

            for op in ops {
                match op {
                    Op::Claim(l, w) => {
                        let ok = reg.claim(line(l), worker(w), SNAP).is_ok();
                        let expect = model[l as usize].map_or(true, |o| o == w);
                        prop_assert_eq!(ok, expect);
                        if ok {
                            model[l as usize] = Some(w);
                        }
                    }
                    Op::Release(l) => {
                        reg.release(line(l));
                        model[l as usize] = None;
                    }
                    Op::Transfer(l, a, b) => {
                        let ok = reg.transfer(line(l), worker(a), worker(b)).is_ok();
                        prop_assert_eq!(ok, model[l as usize] == Some(a));
                        if ok {
                            model[l as usize] = Some(b);
                        }
                    }
                    Op::Rebind(w, a, b) => {
                        let ok = reg.rebind(worker(w), Some(line(a)), line(b), SNAP).is_ok();
                        let expect = model[b as usize].map_or(true, |o| o == w);
                        prop_assert_eq!(ok, expect);
                        if ok {
                            model[b as usize] = Some(w);
                            if a != b && model[a as usize] == Some(w) {
                                model[a as usize] = None;
                            }
                        }
                    }
                }

                for l in 0..8u8 {
                    let owner = reg.owner_of(line(l));
                    let expected = model[l as usize].map(worker);
                    prop_assert_eq!(owner, expected);
                }
            }
        }
    }
}
