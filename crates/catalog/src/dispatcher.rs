//! Filter evaluation and display-target notification
//!
//! [`NotificationDispatcher::apply`] decides, per address, which targets
//! should show a network. Removes are delivered immediately; adds are
//! queued and flushed by [`NotificationDispatcher::drain_step`] in bounded
//! time slices so a bulk import never blocks the host for long.

use crate::filter::NetworkFilter;
use crate::scheduler::DrainScheduler;
use records::{MacAddress, NetworkRecord, ShowMode};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default drain slice (900ms)
pub const DEFAULT_SLICE: Duration = Duration::from_millis(900);

/// A named consumer of add/remove notifications
pub trait DisplayTarget: Send {
    /// Show or refresh a network
    fn add(&mut self, mac: &MacAddress, network: &NetworkRecord);
    /// Stop showing a network
    fn remove(&mut self, mac: &MacAddress);
    /// A batch of adds is about to start
    fn suspend_refresh(&mut self) {}
    /// The batch finished
    fn resume_refresh(&mut self) {}
}

/// Outcome of one drain slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// The drain was not running; nothing was dispatched
    Idle,
    /// The slice ran out; a continuation was scheduled
    Yielded { dispatched: usize, remaining: usize },
    /// The queue is empty and the drain stopped
    Finished { dispatched: usize },
}

/// Dispatcher state
pub struct NotificationDispatcher {
    filter: NetworkFilter,
    /// Inclusion mode per configured target name
    modes: BTreeMap<String, ShowMode>,
    targets: BTreeMap<String, Box<dyn DisplayTarget>>,
    /// Pending adds keyed by address, with the targets still owed one
    pending: HashMap<MacAddress, BTreeSet<String>>,
    /// Order addresses were first queued in
    pending_order: VecDeque<MacAddress>,
    running: bool,
    start_blocked: bool,
    refresh_suspended: bool,
    slice: Duration,
    scheduler: Box<dyn DrainScheduler>,
}

impl NotificationDispatcher {
    pub fn new(
        filter: NetworkFilter,
        modes: BTreeMap<String, ShowMode>,
        slice: Duration,
        scheduler: Box<dyn DrainScheduler>,
    ) -> Self {
        Self {
            filter,
            modes,
            targets: BTreeMap::new(),
            pending: HashMap::new(),
            pending_order: VecDeque::new(),
            running: false,
            start_blocked: false,
            refresh_suspended: false,
            slice,
            scheduler,
        }
    }

    pub fn register_target(&mut self, name: impl Into<String>, target: Box<dyn DisplayTarget>) {
        self.targets.insert(name.into(), target);
    }

    pub fn unregister_target(&mut self, name: &str) -> Option<Box<dyn DisplayTarget>> {
        self.pending.retain(|_, targets| {
            targets.remove(name);
            !targets.is_empty()
        });
        let pending = &self.pending;
        self.pending_order.retain(|mac| pending.contains_key(mac));
        self.targets.remove(name)
    }

    pub fn set_mode(&mut self, name: impl Into<String>, mode: ShowMode) {
        self.modes.insert(name.into(), mode);
    }

    pub fn mode(&self, name: &str) -> Option<ShowMode> {
        self.modes.get(name).copied()
    }

    pub fn set_filter(&mut self, filter: NetworkFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> &NetworkFilter {
        &self.filter
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of addresses with queued adds
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Block or unblock drain starts; queued adds wait for the next start
    pub fn set_start_blocked(&mut self, blocked: bool) {
        self.start_blocked = blocked;
    }

    fn enqueue(&mut self, mac: MacAddress, target: &str) {
        let targets = self.pending.entry(mac).or_insert_with(|| {
            self.pending_order.push_back(mac);
            BTreeSet::new()
        });
        targets.insert(target.to_string());
    }

    /// Evaluate the filter for every address in `scope`
    ///
    /// Addresses missing from `networks` are ignored.
    pub fn apply<'a, I>(
        &mut self,
        scope: I,
        networks: &BTreeMap<MacAddress, NetworkRecord>,
        recent: &HashSet<MacAddress>,
    ) where
        I: IntoIterator<Item = &'a MacAddress>,
    {
        let active: Vec<(String, ShowMode)> = self
            .modes
            .iter()
            .filter(|(name, _)| self.targets.contains_key(*name))
            .map(|(name, mode)| (name.clone(), *mode))
            .collect();

        for mac in scope {
            let Some(network) = networks.get(mac) else {
                continue;
            };
            if self.filter.check(mac, network).is_some() {
                let is_recent = recent.contains(mac);
                for (name, mode) in &active {
                    if mode.includes(is_recent) {
                        self.enqueue(*mac, name);
                    } else if let Some(target) = self.targets.get_mut(name) {
                        target.remove(mac);
                    }
                }
            } else {
                for target in self.targets.values_mut() {
                    target.remove(mac);
                }
            }
        }
    }

    /// Addresses that pass the filter and the named target's mode
    pub fn matching(
        &self,
        target: &str,
        networks: &BTreeMap<MacAddress, NetworkRecord>,
        recent: &HashSet<MacAddress>,
    ) -> Vec<MacAddress> {
        let mode = self.mode(target).unwrap_or_default();
        networks
            .iter()
            .filter(|(mac, network)| {
                self.filter.check(mac, network).is_some() && mode.includes(recent.contains(*mac))
            })
            .map(|(mac, _)| *mac)
            .collect()
    }

    /// Suspend refresh on every target until the next drain completes
    pub fn suspend_refresh(&mut self) {
        if self.refresh_suspended {
            return;
        }
        self.refresh_suspended = true;
        for target in self.targets.values_mut() {
            target.suspend_refresh();
        }
    }

    /// Start draining; returns whether a new drain was started
    pub fn start(&mut self) -> bool {
        if self.running || self.start_blocked {
            return false;
        }
        self.running = true;
        self.scheduler.schedule();
        true
    }

    /// Stop draining and drop every queued add
    pub fn stop(&mut self) {
        self.running = false;
        self.scheduler.cancel();
        self.pending.clear();
        self.pending_order.clear();
    }

    /// Dispatch queued adds until the queue empties or the slice runs out
    pub fn drain_step(&mut self, networks: &BTreeMap<MacAddress, NetworkRecord>) -> DrainStatus {
        if !self.running {
            return DrainStatus::Idle;
        }

        let started = Instant::now();
        let mut dispatched = 0;
        while let Some(mac) = self.pending_order.pop_front() {
            let Some(names) = self.pending.remove(&mac) else {
                continue;
            };
            if let Some(network) = networks.get(&mac) {
                for name in &names {
                    if let Some(target) = self.targets.get_mut(name) {
                        target.add(&mac, network);
                    }
                }
            }
            dispatched += 1;

            if started.elapsed() > self.slice && !self.pending_order.is_empty() {
                let remaining = self.pending.len();
                info!(
                    "{} networks added in {:.1}s, {} networks left",
                    dispatched,
                    started.elapsed().as_secs_f64(),
                    remaining
                );
                self.scheduler.schedule();
                return DrainStatus::Yielded {
                    dispatched,
                    remaining,
                };
            }
        }

        self.finish();
        debug!("Drain finished after {} networks", dispatched);
        DrainStatus::Finished { dispatched }
    }

    fn finish(&mut self) {
        self.running = false;
        if self.refresh_suspended {
            for target in self.targets.values_mut() {
                target.resume_refresh();
            }
            self.refresh_suspended = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSettings;
    use crate::scheduler::ManualScheduler;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Log {
        adds: Vec<MacAddress>,
        removes: Vec<MacAddress>,
    }

    struct Recorder(Arc<Mutex<Log>>);

    impl DisplayTarget for Recorder {
        fn add(&mut self, mac: &MacAddress, _network: &NetworkRecord) {
            self.0.lock().unwrap().adds.push(*mac);
        }

        fn remove(&mut self, mac: &MacAddress) {
            self.0.lock().unwrap().removes.push(*mac);
        }
    }

    fn dispatcher(modes: &[(&str, ShowMode)]) -> (NotificationDispatcher, ManualScheduler) {
        let handle = ManualScheduler::new();
        let filter = NetworkFilter::new(&FilterSettings::default()).unwrap();
        let modes = modes.iter().map(|(n, m)| (n.to_string(), *m)).collect();
        let dispatcher = NotificationDispatcher::new(filter, modes, DEFAULT_SLICE, Box::new(handle.clone()));
        (dispatcher, handle)
    }

    fn catalog(n: u8) -> BTreeMap<MacAddress, NetworkRecord> {
        (1..=n)
            .map(|i| {
                let mac = MacAddress::from_octets([0, 0, 0, 0, 0, i]).unwrap();
                (mac, NetworkRecord::default())
            })
            .collect()
    }

    #[test]
    fn test_current_mode_removes_stale() {
        let (mut d, _) = dispatcher(&[("map", ShowMode::Current)]);
        let log = Arc::new(Mutex::new(Log::default()));
        d.register_target("map", Box::new(Recorder(log.clone())));
        let networks = catalog(2);
        let first = *networks.keys().next().unwrap();
        let recent = HashSet::from([first]);

        d.apply(networks.keys(), &networks, &recent);

        assert_eq!(d.pending_len(), 1);
        assert_eq!(log.lock().unwrap().removes.len(), 1);
    }

    #[test]
    fn test_unconfigured_target_gets_no_adds() {
        let (mut d, _) = dispatcher(&[]);
        let log = Arc::new(Mutex::new(Log::default()));
        d.register_target("list", Box::new(Recorder(log)));
        let networks = catalog(3);
        d.apply(networks.keys(), &networks, &HashSet::new());
        assert_eq!(d.pending_len(), 0);
    }

    #[test]
    fn test_start_is_noop_while_running() {
        let (mut d, handle) = dispatcher(&[]);
        assert!(d.start());
        assert!(!d.start());
        assert_eq!(handle.scheduled(), 1);
    }

    #[test]
    fn test_blocked_start() {
        let (mut d, handle) = dispatcher(&[]);
        d.set_start_blocked(true);
        assert!(!d.start());
        assert!(!handle.is_armed());
        d.set_start_blocked(false);
        assert!(d.start());
    }

    #[test]
    fn test_zero_slice_yields_after_every_address() {
        let handle = ManualScheduler::new();
        let filter = NetworkFilter::new(&FilterSettings::default()).unwrap();
        let modes = BTreeMap::from([("map".to_string(), ShowMode::All)]);
        let mut d = NotificationDispatcher::new(filter, modes, Duration::ZERO, Box::new(handle.clone()));
        let log = Arc::new(Mutex::new(Log::default()));
        d.register_target("map", Box::new(Recorder(log.clone())));
        let networks = catalog(5);

        d.apply(networks.keys(), &networks, &HashSet::new());
        assert!(d.start());
        assert_eq!(handle.scheduled(), 1);

        let mut steps = Vec::new();
        loop {
            let status = d.drain_step(&networks);
            steps.push(status);
            if let DrainStatus::Yielded { .. } = status {
                assert_eq!(handle.scheduled(), steps.len() + 1);
            } else {
                break;
            }
        }

        assert_eq!(
            steps,
            vec![
                DrainStatus::Yielded { dispatched: 1, remaining: 4 },
                DrainStatus::Yielded { dispatched: 1, remaining: 3 },
                DrainStatus::Yielded { dispatched: 1, remaining: 2 },
                DrainStatus::Yielded { dispatched: 1, remaining: 1 },
                DrainStatus::Finished { dispatched: 1 },
            ]
        );
        assert_eq!(handle.scheduled(), 5);
        assert_eq!(log.lock().unwrap().adds.len(), 5);
        assert!(!d.is_running());
    }

    #[test]
    fn test_unregister_drops_orphaned_pending() {
        let (mut d, _) = dispatcher(&[("map", ShowMode::All), ("list", ShowMode::Current)]);
        let map = Arc::new(Mutex::new(Log::default()));
        let list = Arc::new(Mutex::new(Log::default()));
        d.register_target("map", Box::new(Recorder(map)));
        d.register_target("list", Box::new(Recorder(list)));
        let networks = catalog(3);
        let first = *networks.keys().next().unwrap();
        let recent = HashSet::from([first]);

        d.apply(networks.keys(), &networks, &recent);
        assert_eq!(d.pending_len(), 3);

        d.unregister_target("map");
        assert_eq!(d.pending_len(), 1);

        d.unregister_target("list");
        assert_eq!(d.pending_len(), 0);
    }

    #[test]
    fn test_drain_when_stopped_is_idle() {
        let (mut d, _) = dispatcher(&[]);
        assert_eq!(d.drain_step(&BTreeMap::new()), DrainStatus::Idle);
    }
}
