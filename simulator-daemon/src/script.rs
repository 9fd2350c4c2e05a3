//! Hard-coded event scripts replayed by the [`Engine`](crate::engine::Engine).
//!
//! Each step waits `delay` after the previous one, then moves the core to
//! `state`, adds `progress` bytes to the transfer, optionally announces a
//! synced item, and optionally marks the quota as received.

use std::time::Duration;

use simulator_core::{DaemonState, TriggerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptStep {
    pub delay: Duration,
    pub state: DaemonState,
    pub progress: u64,
    pub item: Option<&'static str>,
    pub quota_received: bool,
}

impl ScriptStep {
    const fn enter(delay_ms: u64, state: DaemonState) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            state,
            progress: 0,
            item: None,
            quota_received: false,
        }
    }

    const fn transfer(delay_ms: u64, progress: u64) -> Self {
        Self {
            progress,
            ..Self::enter(delay_ms, DaemonState::Busy)
        }
    }

    /// Item announcement during a transfer, applied right after the previous step.
    const fn announce(item: &'static str) -> Self {
        Self {
            item: Some(item),
            ..Self::enter(0, DaemonState::Busy)
        }
    }

    const fn with_item(self, item: &'static str) -> Self {
        Self {
            item: Some(item),
            ..self
        }
    }

    const fn with_quota(self) -> Self {
        Self {
            quota_received: true,
            ..self
        }
    }
}

#[derive(Debug)]
pub struct Script {
    pub name: &'static str,
    /// Size of the simulated transfer; `0` means unknown.
    pub total_bytes: u64,
    pub steps: &'static [ScriptStep],
}

impl Script {
    pub fn for_event(event: TriggerEvent) -> &'static Script {
        match event {
            TriggerEvent::Start => &START,
            TriggerEvent::Sync => &SYNC,
            TriggerEvent::Error => &ERROR,
        }
    }

    /// Splits off the leading zero-delay steps, which apply as soon as the
    /// script is triggered.
    pub fn split_immediate(&self) -> (&'static [ScriptStep], &'static [ScriptStep]) {
        let steps = self.steps;
        let first_timed = steps
            .iter()
            .position(|step| !step.delay.is_zero())
            .unwrap_or(steps.len());
        steps.split_at(first_timed)
    }

    /// Sum of every step delay.
    pub fn duration(&self) -> Duration {
        self.steps.iter().map(|step| step.delay).sum()
    }
}

/// 139.38 MB.
pub const SYNC_TOTAL_BYTES: u64 = 146_150_523;

/// Daemon start-up: index, first transfer with the initial item list, then
/// idle once the quota arrives.
pub static START: Script = Script {
    name: "Start",
    total_bytes: 0,
    steps: &[
        ScriptStep::enter(1000, DaemonState::Index),
        ScriptStep::enter(1000, DaemonState::Busy),
        ScriptStep::announce("n"),
        ScriptStep::announce("w"),
        ScriptStep::announce("o"),
        ScriptStep::announce("d"),
        ScriptStep::announce("do"),
        ScriptStep::announce("down"),
        ScriptStep::announce("download"),
        ScriptStep::announce("downloads/setup"),
        ScriptStep::announce("downloads/file.deb"),
        ScriptStep::announce("File.ods"),
        ScriptStep::enter(1000, DaemonState::Index),
        ScriptStep::enter(2000, DaemonState::Idle).with_quota(),
    ],
};

pub static SYNC: Script = Script {
    name: "Synchronization",
    total_bytes: SYNC_TOTAL_BYTES,
    steps: &[
        ScriptStep::enter(0, DaemonState::Index),
        ScriptStep::transfer(1000, 0),
        ScriptStep::transfer(1000, 68_513_956),
        ScriptStep::transfer(1000, 77_636_567).with_item("NewFile"),
        ScriptStep::enter(1000, DaemonState::Index),
        ScriptStep::enter(1000, DaemonState::Idle),
    ],
};

pub static ERROR: Script = Script {
    name: "Error",
    total_bytes: 0,
    steps: &[
        ScriptStep::enter(0, DaemonState::Error),
        ScriptStep::enter(500, DaemonState::Idle),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_transfers_add_up_to_total() {
        let transferred: u64 = SYNC.steps.iter().map(|step| step.progress).sum();
        assert_eq!(transferred, SYNC.total_bytes);
    }

    #[test]
    fn every_script_ends_idle() {
        for script in [&START, &SYNC, &ERROR] {
            let last = script.steps.last().expect("non-empty script");
            assert_eq!(last.state, DaemonState::Idle, "{} must end idle", script.name);
        }
    }

    #[test]
    fn start_announces_ten_items_and_receives_quota() {
        let items = START.steps.iter().filter(|step| step.item.is_some()).count();
        assert_eq!(items, 10);
        assert!(START.steps.iter().any(|step| step.quota_received));
        assert!(!SYNC.steps.iter().any(|step| step.quota_received));
    }

    #[test]
    fn split_immediate_takes_only_leading_zero_delays() {
        let (now, later) = SYNC.split_immediate();
        assert_eq!(now.len(), 1);
        assert_eq!(now[0].state, DaemonState::Index);
        assert_eq!(later.len(), SYNC.steps.len() - 1);

        let (now, later) = START.split_immediate();
        assert!(now.is_empty(), "start waits before its first step");
        assert_eq!(later.len(), START.steps.len());
    }

    #[test]
    fn error_excursion_lasts_half_a_second() {
        assert_eq!(ERROR.duration(), Duration::from_millis(500));
        assert_eq!(
            Script::for_event(TriggerEvent::Error).steps[0].state,
            DaemonState::Error
        );
    }
}
