//! Combat state of a flying avatar.
//!
//! Transitions are a table of `(state, event) -> Transition`. A transition
//! carries the entry actions the controller must run and, for `Attacked`,
//! the delayed `Recovered` event armed on entry.

use engine_core::Debounce;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightState {
    /// Free to steer.
    #[default]
    Idle,
    /// Tumbling after a hit; steering is locked until recovery.
    Attacked,
    /// Terminal.
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightEvent {
    Attacked,
    /// Fired by the stun timer.
    Recovered,
}

/// Side effects run when a state is entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryAction {
    MinusHealth,
    Tumble,
    Die,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: FlightState,
    pub target: FlightState,
    pub entry: &'static [EntryAction],
    /// Delay before `Recovered` is sent automatically.
    pub after: Option<Duration>,
}

const ATTACKED_ENTRY: &[EntryAction] = &[EntryAction::MinusHealth, EntryAction::Tumble];
const DEAD_ENTRY: &[EntryAction] = &[EntryAction::Tumble, EntryAction::Die];
const IDLE_ENTRY: &[EntryAction] = &[];

#[derive(Debug, Clone)]
pub struct FlightMachine {
    state: FlightState,
    health: u32,
    /// Freezes health without blocking the hit reaction.
    pub health_lock: bool,
    stun: Duration,
    recovery: Debounce,
}

impl FlightMachine {
    pub fn new(health: u32, stun: Duration) -> Self {
        Self {
            state: FlightState::Idle,
            health,
            health_lock: false,
            stun,
            recovery: Debounce::new(stun),
        }
    }

    pub fn state(&self) -> FlightState {
        self.state
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    /// Whether the machine reached its final state.
    pub fn is_done(&self) -> bool {
        self.state == FlightState::Dead
    }

    /// Health the `MinusHealth` entry action would leave.
    fn health_after_hit(&self) -> u32 {
        if self.health_lock {
            self.health
        } else {
            self.health.saturating_sub(1)
        }
    }

    /// Look up the transition for `event` in the current state.
    pub fn transition(&self, event: FlightEvent) -> Option<Transition> {
        use FlightEvent as E;
        use FlightState as S;

        let target = match (self.state, event) {
            (S::Dead, _) => return None,
            (S::Idle | S::Attacked, E::Attacked) => {
                if self.health_after_hit() >= 1 {
                    S::Attacked
                } else {
                    S::Dead
                }
            }
            (S::Attacked, E::Recovered) => S::Idle,
            (S::Idle, E::Recovered) => return None,
        };

        let (entry, after) = match target {
            S::Attacked => (ATTACKED_ENTRY, Some(self.stun)),
            S::Dead => (DEAD_ENTRY, None),
            S::Idle => (IDLE_ENTRY, None),
        };
        Some(Transition {
            from: self.state,
            target,
            entry,
            after,
        })
    }

    /// Apply `event`. Context actions (health) run here; the returned
    /// transition lists the entry actions left for the caller.
    pub fn send(&mut self, event: FlightEvent, now: Duration) -> Option<Transition> {
        let transition = self.transition(event)?;

        if transition.entry.contains(&EntryAction::MinusHealth) && !self.health_lock {
            self.health = self.health.saturating_sub(1);
        }
        self.state = transition.target;

        match transition.after {
            Some(_) => self.recovery.call(now),
            None => self.recovery.cancel(),
        }

        log::debug!(
            "flight {:?} --{:?}--> {:?} (health {})",
            transition.from,
            event,
            transition.target,
            self.health
        );
        Some(transition)
    }

    /// Fire the delayed recovery once its deadline has passed.
    pub fn update(&mut self, now: Duration) -> Option<Transition> {
        if self.recovery.poll(now) {
            self.send(FlightEvent::Recovered, now)
        } else {
            None
        }
    }

    pub fn recovery_deadline(&self) -> Option<Duration> {
        self.recovery.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn machine() -> FlightMachine {
        FlightMachine::new(3, ms(2000))
    }

    #[test]
    fn hit_decrements_and_stuns() {
        let mut m = machine();
        let t = m.send(FlightEvent::Attacked, ms(0)).unwrap();
        assert_eq!(t.target, FlightState::Attacked);
        assert_eq!(t.entry, ATTACKED_ENTRY);
        assert_eq!(m.health(), 2);
        assert_eq!(m.recovery_deadline(), Some(ms(2000)));
    }

    #[test]
    fn recovers_exactly_after_stun() {
        let mut m = machine();
        m.send(FlightEvent::Attacked, ms(100));
        assert!(m.update(ms(2099)).is_none());
        assert_eq!(m.state(), FlightState::Attacked);
        let t = m.update(ms(2100)).unwrap();
        assert_eq!(t.target, FlightState::Idle);
        assert_eq!(m.state(), FlightState::Idle);
    }

    #[test]
    fn last_hit_from_attacked_is_fatal() {
        let mut m = machine();
        m.send(FlightEvent::Attacked, ms(0));
        m.send(FlightEvent::Attacked, ms(10));
        assert_eq!(m.health(), 1);
        assert_eq!(m.state(), FlightState::Attacked);

        let t = m.send(FlightEvent::Attacked, ms(20)).unwrap();
        assert_eq!(t.target, FlightState::Dead);
        assert_eq!(t.entry, DEAD_ENTRY);
        assert!(m.is_done());
        assert!(m.recovery_deadline().is_none());
    }

    #[test]
    fn dead_ignores_everything() {
        let mut m = FlightMachine::new(1, ms(2000));
        m.send(FlightEvent::Attacked, ms(0));
        assert!(m.is_done());
        assert!(m.send(FlightEvent::Attacked, ms(5)).is_none());
        assert!(m.send(FlightEvent::Recovered, ms(5)).is_none());
        assert!(m.update(ms(10_000)).is_none());
        assert_eq!(m.state(), FlightState::Dead);
    }

    #[test]
    fn health_lock_keeps_health_but_still_stuns() {
        let mut m = FlightMachine::new(1, ms(2000));
        m.health_lock = true;
        for i in 0..5 {
            let t = m.send(FlightEvent::Attacked, ms(i * 10)).unwrap();
            assert_eq!(t.target, FlightState::Attacked);
        }
        assert_eq!(m.health(), 1);
    }

    #[test]
    fn recovered_in_idle_is_ignored() {
        let m = machine();
        assert!(m.transition(FlightEvent::Recovered).is_none());
    }
}
