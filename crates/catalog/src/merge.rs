//! Record reconciliation rules
//!
//! [`merge_live`] folds a live observation into a stored record and
//! [`merge_imported`] folds a parsed legacy record into one. Both only ever
//! widen the time range; which other fields move depends on recency.
//!
//! Two historical quirks are kept by default and can be switched off through
//! [`MergePolicy`]: the live merge folds the signal maximum with `min`, and
//! the imported merge never touches signal data.

use records::{ImportedNetwork, LiveObservation, NetworkRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Merge behaviour switches (`[merge]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Fold the live signal maximum with `max` instead of `min`
    #[serde(default)]
    pub fold_signal_max_with_max: bool,
    /// Merge signal data carried by imported records
    #[serde(default)]
    pub merge_imported_signal: bool,
}

/// Build a new record from a first sighting
pub fn new_record_from_observation(obs: &LiveObservation, source: &str) -> NetworkRecord {
    let (latitude, longitude) = obs.position.unwrap_or((0.0, 0.0));
    NetworkRecord {
        channel: obs.channel,
        codename: String::new(),
        comment: String::new(),
        crypt: obs.crypt.clone(),
        crypt_set: obs.crypt_set,
        first_seen: obs.first_seen,
        last_seen: obs.last_seen,
        latitude,
        longitude,
        manufacturer: obs.manufacturer.clone(),
        servers: BTreeSet::from([source.to_string()]),
        signal_dbm: obs.signal,
        ssid: obs.ssid.clone(),
        network_type: obs.network_type.clone(),
    }
}

/// Fold a live observation into an existing record
pub fn merge_live(
    network: &mut NetworkRecord,
    obs: &LiveObservation,
    source: &str,
    policy: MergePolicy,
) {
    if !network.signal_dbm.has_data() {
        network.signal_dbm = obs.signal;
    }

    if obs.last_seen > network.last_seen {
        if let Some((latitude, longitude)) = obs.position {
            let stronger = network.signal_dbm.max < obs.signal.max && obs.signal.max != 0;
            if stronger || !network.has_fix() {
                network.latitude = latitude;
                network.longitude = longitude;
            }
        }

        network.channel = obs.channel;
        network.last_seen = obs.last_seen;
        network.crypt_set = obs.crypt_set;
        network.crypt = obs.crypt.clone();
        network.signal_dbm.last = obs.signal.last;
        network.ssid = obs.ssid.clone();
    }

    network.first_seen = network.first_seen.min(obs.first_seen);
    if policy.fold_signal_max_with_max {
        if obs.signal.has_data() {
            network.signal_dbm.min = network.signal_dbm.min.min(obs.signal.min);
            network.signal_dbm.max = network.signal_dbm.max.max(obs.signal.max);
        }
    } else {
        network.signal_dbm.min = network.signal_dbm.min.min(obs.signal.min);
        network.signal_dbm.max = network.signal_dbm.max.min(obs.signal.max);
    }
    network.network_type = obs.network_type.clone();

    if !network.servers.contains(source) {
        network.servers.insert(source.to_string());
    }
}

/// Fold a parsed legacy record into an existing record
pub fn merge_imported(network: &mut NetworkRecord, data: &ImportedNetwork, policy: MergePolicy) {
    let stored_signal = policy.merge_imported_signal && network.signal_dbm.has_data();
    let incoming_signal = if policy.merge_imported_signal {
        data.signal_dbm.filter(|s| s.has_data())
    } else {
        None
    };

    let newer = data.last_seen > network.last_seen;
    if newer {
        network.channel = data.channel;
        network.last_seen = data.last_seen;
        network.crypt_set = data.crypt_set;
        network.crypt = data.crypt.clone();
        if let (true, Some(signal)) = (stored_signal, incoming_signal) {
            network.signal_dbm.last = signal.last;
        }
    }

    let sharper = match incoming_signal {
        Some(signal) if stored_signal => network.signal_dbm.max < signal.max,
        Some(_) => true,
        None => false,
    };
    if data.has_fix() && (!network.has_fix() || sharper) {
        network.latitude = data.latitude;
        network.longitude = data.longitude;
    }

    if newer || network.ssid.is_empty() {
        network.ssid = data.ssid.clone();
    }
    if network.manufacturer.is_empty() {
        network.manufacturer = data.manufacturer.clone();
    }
    network.first_seen = network.first_seen.min(data.first_seen);

    match incoming_signal {
        Some(signal) if stored_signal => {
            network.signal_dbm.min = network.signal_dbm.min.min(signal.min);
            network.signal_dbm.max = if policy.fold_signal_max_with_max {
                network.signal_dbm.max.max(signal.max)
            } else {
                network.signal_dbm.max.min(signal.max)
            };
        }
        Some(signal) => network.signal_dbm = signal,
        None => {}
    }
}
