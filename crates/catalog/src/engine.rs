//! The aggregation engine
//!
//! [`NetworkCatalog`] owns the canonical address -> record map. Records enter
//! through [`NetworkCatalog::ingest_live`] or [`NetworkCatalog::ingest_imported`]
//! (or in bulk through [`NetworkCatalog::import_file`]); every touched address
//! is marked recent and handed to the notification dispatcher.

use crate::config::{CatalogConfig, EXPORT_TARGET};
use crate::dispatcher::{DisplayTarget, DrainStatus, NotificationDispatcher};
use crate::error::Result;
use crate::filter::{FilterSettings, NetworkFilter};
use crate::merge::{MergePolicy, merge_imported, merge_live, new_record_from_observation};
use crate::scheduler::{DrainScheduler, DrainTicks, ManualScheduler};
use formats::native::{read_catalog, save_with_backups};
use formats::{
    ExportEntry, ExportFormat, ImportFormat, KmzExporter, KmzOptions, NativeFormat,
    NetworkExporter, NetxmlExporter, ParsedNetworks, TabularExporter, TrackSource,
};
use records::{CryptCategory, DeviceSnapshot, ImportedNetwork, MacAddress, NetworkRecord, ShowMode};
use std::collections::{BTreeMap, HashSet};
use std::iter;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Which records an export covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportScope {
    /// The whole catalog
    All,
    /// Only these addresses; unknown ones are ignored
    Subset(Vec<MacAddress>),
    /// Records passing the filter and the `export` target's mode
    Filtered,
}

/// Result of [`NetworkCatalog::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// A drain was active and the save was not forced
    Skipped,
}

/// Record counts per network type and crypt category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    pub recent: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_category: BTreeMap<CryptCategory, usize>,
}

pub struct NetworkCatalog {
    networks: BTreeMap<MacAddress, NetworkRecord>,
    recent: HashSet<MacAddress>,
    dispatcher: NotificationDispatcher,
    policy: MergePolicy,
    num_backups: u32,
    kmz: KmzOptions,
}

impl NetworkCatalog {
    /// Empty catalog whose drain is driven with [`NetworkCatalog::run_drain`]
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        Self::with_scheduler(config, Box::new(ManualScheduler::new()))
    }

    /// Empty catalog with an injected drain scheduler
    pub fn with_scheduler(
        config: &CatalogConfig,
        scheduler: Box<dyn DrainScheduler>,
    ) -> Result<Self> {
        let filter = NetworkFilter::new(&config.filter)?;
        let dispatcher = NotificationDispatcher::new(
            filter,
            config.targets.clone(),
            config.drain.slice(),
            scheduler,
        );

        Ok(Self {
            networks: BTreeMap::new(),
            recent: HashSet::new(),
            dispatcher,
            policy: config.merge,
            num_backups: config.persistence.num_backups,
            kmz: config.kmz.clone(),
        })
    }

    pub fn networks(&self) -> &BTreeMap<MacAddress, NetworkRecord> {
        &self.networks
    }

    pub fn get(&self, mac: &MacAddress) -> Option<&NetworkRecord> {
        self.networks.get(mac)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn is_recent(&self, mac: &MacAddress) -> bool {
        self.recent.contains(mac)
    }

    pub fn recent(&self) -> &HashSet<MacAddress> {
        &self.recent
    }

    /// Merge one device snapshot reported by `source`
    ///
    /// Returns the device address, or `None` when the snapshot carried an
    /// invalid address.
    pub fn ingest_live(&mut self, snapshot: &DeviceSnapshot, source: &str) -> Option<MacAddress> {
        let obs = match snapshot.observe() {
            Ok(obs) => obs,
            Err(e) => {
                warn!("Ignoring snapshot from {}: {}", source, e);
                return None;
            }
        };

        let mac = obs.address;
        match self.networks.get_mut(&mac) {
            Some(network) => merge_live(network, &obs, source, self.policy),
            None => {
                debug!("New network {} from {}", mac, source);
                self.networks
                    .insert(mac, new_record_from_observation(&obs, source));
            }
        }

        self.recent.insert(mac);
        self.notify_one(&mac);
        Some(mac)
    }

    /// Merge one parsed legacy record
    ///
    /// Invalid addresses are skipped and leave the catalog unchanged.
    pub fn ingest_imported(&mut self, address: &str, data: ImportedNetwork) -> bool {
        match self.merge_imported_entry(address, data) {
            Some(mac) => {
                self.notify_one(&mac);
                true
            }
            None => false,
        }
    }

    fn merge_imported_entry(&mut self, address: &str, data: ImportedNetwork) -> Option<MacAddress> {
        let mac = match address.parse::<MacAddress>() {
            Ok(mac) => mac,
            Err(e) => {
                debug!("Skipping imported record {:?}: {}", address, e);
                return None;
            }
        };

        match self.networks.get_mut(&mac) {
            Some(network) => merge_imported(network, &data, self.policy),
            None => {
                self.networks.insert(mac, data.into_record());
            }
        }
        self.recent.insert(mac);
        Some(mac)
    }

    fn notify_one(&mut self, mac: &MacAddress) {
        self.dispatcher
            .apply(iter::once(mac), &self.networks, &self.recent);
        self.dispatcher.start();
    }

    /// Merge a whole parser result, notifying once after all merges
    ///
    /// Returns the number of records accepted.
    pub fn import_networks(&mut self, parsed: ParsedNetworks) -> usize {
        let accepted: Vec<MacAddress> = parsed
            .into_iter()
            .filter_map(|(address, data)| self.merge_imported_entry(&address, data))
            .collect();

        if !accepted.is_empty() {
            self.dispatcher
                .apply(accepted.iter(), &self.networks, &self.recent);
            self.dispatcher.start();
        }
        accepted.len()
    }

    /// Parse `path` with the named import format and merge the result
    ///
    /// An unknown format name is logged and imports nothing.
    pub fn import_file(&mut self, format: &str, path: &Path) -> usize {
        let format = match format.parse::<ImportFormat>() {
            Ok(format) => format,
            Err(e) => {
                error!("Cannot import {:?}: {}", path, e);
                return 0;
            }
        };

        let parsed = format.parser().parse(path);
        let count = self.import_networks(parsed);
        info!("Imported {} networks from {:?} ({})", count, path, format);
        count
    }

    fn export_entries(&self, scope: &ExportScope) -> Vec<ExportEntry<'_>> {
        match scope {
            ExportScope::All => self.networks.iter().collect(),
            ExportScope::Subset(macs) => macs
                .iter()
                .filter_map(|mac| self.networks.get_key_value(mac))
                .collect(),
            ExportScope::Filtered => self
                .dispatcher
                .matching(EXPORT_TARGET, &self.networks, &self.recent)
                .iter()
                .filter_map(|mac| self.networks.get_key_value(mac))
                .collect(),
        }
    }

    /// Write the records in `scope` to `path`
    ///
    /// Returns the number of records handed to the exporter.
    pub fn export_networks(
        &self,
        format: ExportFormat,
        path: &Path,
        scope: &ExportScope,
        tracks: Option<&dyn TrackSource>,
    ) -> Result<usize> {
        let entries = self.export_entries(scope);

        match format {
            ExportFormat::Native => NativeFormat.export(path, &entries)?,
            ExportFormat::Netxml => NetxmlExporter.export(path, &entries)?,
            ExportFormat::Csv => TabularExporter.export(path, &entries)?,
            ExportFormat::Kmz => {
                let mut exporter = KmzExporter::new(self.kmz.clone());
                if let Some(tracks) = tracks {
                    let mode = match scope {
                        ExportScope::Filtered => {
                            Some(self.dispatcher.mode(EXPORT_TARGET).unwrap_or_default())
                        }
                        _ => None,
                    };
                    exporter = exporter.with_tracks(tracks, mode);
                }
                exporter.export(path, &entries)?;
            }
        }

        info!("Exported {} networks to {:?} ({})", entries.len(), path, format);
        Ok(entries.len())
    }

    /// Like [`NetworkCatalog::export_networks`] with a format name
    ///
    /// An unknown format name is logged and exports nothing.
    pub fn export_file(
        &self,
        format: &str,
        path: &Path,
        scope: &ExportScope,
        tracks: Option<&dyn TrackSource>,
    ) -> Result<usize> {
        match format.parse::<ExportFormat>() {
            Ok(format) => self.export_networks(format, path, scope, tracks),
            Err(e) => {
                error!("Cannot export {:?}: {}", path, e);
                Ok(0)
            }
        }
    }

    /// Persist the catalog with backup rotation
    pub fn save(&self, path: &Path, force: bool) -> Result<SaveOutcome> {
        if self.dispatcher.is_running() && !force {
            warn!("Not saving {:?} while notifications are draining", path);
            return Ok(SaveOutcome::Skipped);
        }

        save_with_backups(path, self.networks.iter(), self.num_backups)?;
        info!("Saved {} networks to {:?}", self.networks.len(), path);
        Ok(SaveOutcome::Saved)
    }

    /// Replace the catalog with the contents of `path`
    ///
    /// Stops any active drain and clears the recent-set. Callers re-run
    /// [`NetworkCatalog::apply_filters`] to repopulate their targets.
    pub fn load(&mut self, path: &Path) -> Result<usize> {
        let networks = read_catalog(path)?;
        self.dispatcher.stop();
        self.networks = networks;
        self.recent.clear();
        Ok(self.networks.len())
    }

    /// Re-evaluate the filter over the whole catalog
    pub fn apply_filters(&mut self) {
        self.dispatcher.stop();
        self.dispatcher
            .apply(self.networks.keys(), &self.networks, &self.recent);
        self.dispatcher.suspend_refresh();
        self.dispatcher.start();
    }

    /// Run one drain slice
    pub fn drain_step(&mut self) -> DrainStatus {
        self.dispatcher.drain_step(&self.networks)
    }

    /// Drain synchronously until the queue is empty
    ///
    /// Returns the number of addresses dispatched.
    pub fn run_drain(&mut self) -> usize {
        let mut total = 0;
        loop {
            match self.drain_step() {
                DrainStatus::Yielded { dispatched, .. } => total += dispatched,
                DrainStatus::Finished { dispatched } => return total + dispatched,
                DrainStatus::Idle => return total,
            }
        }
    }

    /// Drain on the ticks of a [`crate::scheduler::ChannelScheduler`]
    pub async fn drive_drain(&mut self, ticks: &mut DrainTicks) -> usize {
        let mut total = 0;
        while self.dispatcher.is_running() {
            if ticks.next().await.is_none() {
                break;
            }
            match self.drain_step() {
                DrainStatus::Yielded { dispatched, .. } | DrainStatus::Finished { dispatched } => {
                    total += dispatched
                }
                DrainStatus::Idle => break,
            }
        }
        total
    }

    /// Stop draining and drop queued notifications
    pub fn stop_drain(&mut self) {
        self.dispatcher.stop();
    }

    pub fn set_drain_blocked(&mut self, blocked: bool) {
        self.dispatcher.set_start_blocked(blocked);
    }

    pub fn is_draining(&self) -> bool {
        self.dispatcher.is_running()
    }

    pub fn pending_notifications(&self) -> usize {
        self.dispatcher.pending_len()
    }

    pub fn register_target(&mut self, name: impl Into<String>, target: Box<dyn DisplayTarget>) {
        self.dispatcher.register_target(name, target);
    }

    pub fn unregister_target(&mut self, name: &str) -> Option<Box<dyn DisplayTarget>> {
        self.dispatcher.unregister_target(name)
    }

    pub fn set_target_mode(&mut self, name: impl Into<String>, mode: ShowMode) {
        self.dispatcher.set_mode(name, mode);
    }

    /// Replace the filter and re-evaluate the catalog
    pub fn set_filter(&mut self, settings: &FilterSettings) -> Result<()> {
        let filter = NetworkFilter::new(settings)?;
        self.dispatcher.set_filter(filter);
        self.apply_filters();
        Ok(())
    }

    /// Addresses a target shows under the current filter
    pub fn filtered_networks(&self, target: &str) -> Vec<MacAddress> {
        self.dispatcher
            .matching(target, &self.networks, &self.recent)
    }

    /// Edit the user annotations of a record
    pub fn set_annotation(
        &mut self,
        mac: &MacAddress,
        comment: Option<&str>,
        codename: Option<&str>,
    ) -> bool {
        let Some(network) = self.networks.get_mut(mac) else {
            return false;
        };
        if let Some(comment) = comment {
            network.comment = comment.to_string();
        }
        if let Some(codename) = codename {
            network.codename = codename.to_string();
        }
        true
    }

    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total: self.networks.len(),
            recent: self.recent.len(),
            ..Default::default()
        };
        for network in self.networks.values() {
            *stats
                .by_type
                .entry(network.network_type.as_str().to_string())
                .or_default() += 1;
            *stats.by_category.entry(network.category()).or_default() += 1;
        }
        stats
    }
}
