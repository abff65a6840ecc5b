//! Legacy XML capture format
//!
//! A `detection-run` document holds one `wireless-network` element per
//! device. The parser walks the event stream with an explicit stack of open
//! elements; each frame carries the context it opened so text is routed by
//! `(enclosing context, element name)` alone.

use crate::error::{FormatError, Result};
use crate::{ExportEntry, NetworkExporter, NetworkParser, ParsedNetworks, format_coordinate};
use quick_xml::Reader;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesStart, Event};
use records::crypt::{Crypt, encode_cryptset, normalize_token};
use records::timestamp::{from_legacy_string, to_legacy_string};
use records::{ImportedNetwork, NetworkType, SignalDbm};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Document prologue written by the exporter
pub const HEADER: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n",
    "<!DOCTYPE detection-run SYSTEM \"http://kismetwireless.net/kismet-3.1.0.dtd\">\n",
    "<detection-run kismet-version=\"2009.06.R1\" start-time=\"Sat Oct 24 09:05:35 2009\">\n\n",
);

/// Encryption lines in the fixed output order
///
/// TLS is listed twice and the second line reads `Fortress`; `fortress`
/// itself is written as `Keyguard`. Consumers of this layout expect it.
const ENCRYPTION_LINES: [(Crypt, &str); 17] = [
    (Crypt::Wep, "WEP"),
    (Crypt::Layer3, "Layer3"),
    (Crypt::WpaMigMode, "WPA Migration Mode"),
    (Crypt::Wep40, "WEP40"),
    (Crypt::Wep104, "WEP104"),
    (Crypt::Tkip, "WPA+TKIP"),
    (Crypt::Psk, "WPA+PSK"),
    (Crypt::AesOcb, "WPA+AES-OCB"),
    (Crypt::AesCcm, "WPA+AES-CCM"),
    (Crypt::Leap, "WPA+LEAP"),
    (Crypt::Ttls, "WPA+TTLS"),
    (Crypt::Tls, "WPA+TLS"),
    (Crypt::Peap, "WPA+PEAP"),
    (Crypt::Isakmp, "ISAKMP"),
    (Crypt::Pptp, "PPTP"),
    (Crypt::Tls, "Fortress"),
    (Crypt::Fortress, "Keyguard"),
];

/// What an open element means to the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Root,
    Network,
    Ssid,
    GpsInfo,
    SnrInfo,
    Leaf,
}

#[derive(Debug)]
struct Frame {
    name: String,
    context: Context,
}

/// Network under construction
#[derive(Debug, Default)]
struct PendingNetwork {
    bssid: Option<String>,
    network: ImportedNetwork,
    signal: Option<SignalDbm>,
}

#[derive(Debug, Default)]
struct ParseState {
    stack: Vec<Frame>,
    current: Option<PendingNetwork>,
    /// Encryption labels of the open SSID block, first occurrence order
    encryption: Vec<String>,
    networks: ParsedNetworks,
}

/// Convert encryption labels into mechanism tokens
///
/// Any `WPA...` label contributes `wpa` once, plus the submode after a `+`.
pub fn encryption_tokens<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for label in labels {
        let label = label.as_ref();
        if label.starts_with("WPA") {
            if !tokens.iter().any(|t| t == "wpa") {
                tokens.push("wpa".to_string());
            }
            if let Some((_, submode)) = label.split_once('+') {
                tokens.push(normalize_token(submode));
            }
        } else {
            tokens.push(normalize_token(label));
        }
    }
    tokens
}

fn parse_number<T: FromStr>(field: &str, text: &str) -> Result<T> {
    text.trim().parse().map_err(|_| FormatError::InvalidValue {
        field: field.to_string(),
        value: text.to_string(),
    })
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<String> {
    let attr = element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
        .ok_or_else(|| FormatError::MissingField(name.to_string()))?;
    Ok(attr.unescape_value()?.into_owned())
}

impl ParseState {
    fn parent_context(&self) -> Context {
        self.stack.last().map(|f| f.context).unwrap_or(Context::Root)
    }

    fn open(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let context = match (self.parent_context(), name.as_str()) {
            (_, "wireless-network") => {
                let network = ImportedNetwork {
                    network_type: NetworkType::parse(&attribute(element, "type")?),
                    first_seen: from_legacy_string(&attribute(element, "first-time")?)?,
                    last_seen: from_legacy_string(&attribute(element, "last-time")?)?,
                    ..Default::default()
                };
                self.current = Some(PendingNetwork {
                    network,
                    ..Default::default()
                });
                Context::Network
            }
            (Context::Network, "SSID") => {
                self.encryption.clear();
                Context::Ssid
            }
            (Context::Network, "gps-info") => Context::GpsInfo,
            (Context::Network, "snr-info") => Context::SnrInfo,
            _ => Context::Leaf,
        };
        self.stack.push(Frame { name, context });
        Ok(())
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame.context {
            Context::Ssid => self.close_ssid(),
            Context::Network => self.close_network(),
            _ => {}
        }
    }

    fn close_ssid(&mut self) {
        if self.encryption.is_empty() {
            return;
        }
        let tokens = encryption_tokens(&self.encryption);
        if let Some(pending) = self.current.as_mut() {
            pending.network.crypt_set = encode_cryptset(&tokens).into();
            pending.network.crypt = tokens.join(",");
        }
        self.encryption.clear();
    }

    fn close_network(&mut self) {
        let Some(pending) = self.current.take() else {
            return;
        };
        let PendingNetwork {
            bssid,
            mut network,
            signal,
        } = pending;
        network.signal_dbm = signal;
        match bssid {
            Some(bssid) => {
                self.networks.insert(bssid, network);
            }
            None => warn!("Skipping wireless-network without BSSID"),
        }
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let depth = self.stack.len();
        let (Some(leaf), Some(parent)) = (
            self.stack.last(),
            depth.checked_sub(2).and_then(|i| self.stack.get(i)),
        ) else {
            return Ok(());
        };
        if leaf.context != Context::Leaf {
            return Ok(());
        }
        let Some(pending) = self.current.as_mut() else {
            return Ok(());
        };

        match (parent.context, leaf.name.as_str()) {
            (Context::Ssid, "encryption") => {
                if !self.encryption.iter().any(|e| e == text) {
                    self.encryption.push(text.to_string());
                }
            }
            (Context::Ssid, "essid") => pending.network.ssid = text.to_string(),
            (Context::GpsInfo, "peak-lat") => {
                pending.network.latitude = parse_number("peak-lat", text)?;
            }
            (Context::GpsInfo, "peak-lon") => {
                pending.network.longitude = parse_number("peak-lon", text)?;
            }
            (Context::SnrInfo, "min_signal_dbm") => {
                pending.signal.get_or_insert_with(SignalDbm::default).min =
                    parse_number("min_signal_dbm", text)?;
            }
            (Context::SnrInfo, "max_signal_dbm") => {
                pending.signal.get_or_insert_with(SignalDbm::default).max =
                    parse_number("max_signal_dbm", text)?;
            }
            (Context::SnrInfo, "last_signal_dbm") => {
                pending.signal.get_or_insert_with(SignalDbm::default).last =
                    parse_number("last_signal_dbm", text)?;
            }
            (Context::Network, "BSSID") => pending.bssid = Some(text.trim().to_string()),
            (Context::Network, "channel") => {
                pending.network.channel = parse_number("channel", text)?;
            }
            (Context::Network, "manuf") => pending.network.manufacturer = text.to_string(),
            _ => {}
        }
        Ok(())
    }
}

/// Read every network from a legacy XML file
pub fn read_netxml(path: &Path) -> Result<ParsedNetworks> {
    let mut reader = Reader::from_file(path)?;

    let mut state = ParseState::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => state.open(&e)?,
            Event::Empty(e) => {
                state.open(&e)?;
                state.close();
            }
            Event::End(_) => state.close(),
            Event::Text(t) => state.text(&t.unescape()?)?,
            Event::CData(c) => state.text(&String::from_utf8_lossy(&c.into_inner()))?,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(state.networks)
}

/// Legacy XML parser
#[derive(Debug, Clone, Copy, Default)]
pub struct NetxmlParser;

impl NetworkParser for NetxmlParser {
    fn parse(&self, path: &Path) -> ParsedNetworks {
        if !path.is_file() {
            error!("Not a file: {:?}", path);
            return ParsedNetworks::new();
        }
        match read_netxml(path) {
            Ok(networks) => {
                info!("Parsed {} networks from {:?}", networks.len(), path);
                networks
            }
            Err(e) => {
                error!("Failed to parse {:?}: {}", path, e);
                ParsedNetworks::new()
            }
        }
    }
}

/// Legacy XML exporter
#[derive(Debug, Clone, Copy, Default)]
pub struct NetxmlExporter;

impl NetxmlExporter {
    fn write_network<W: Write>(out: &mut W, number: usize, entry: ExportEntry<'_>) -> Result<()> {
        let (mac, network) = entry;
        let first = to_legacy_string(network.first_seen);
        let last = to_legacy_string(network.last_seen);
        let ssid = partial_escape(&network.ssid);
        let manuf = if network.manufacturer.is_empty() {
            "Unknown".into()
        } else {
            partial_escape(&network.manufacturer)
        };

        writeln!(
            out,
            "<wireless-network number=\"{}\" type=\"{}\" first-time=\"{}\" last-time=\"{}\">",
            number, network.network_type, first, last
        )?;
        writeln!(out, " <SSID first-time=\"{}\" last-time=\"{}\">", first, last)?;
        if network.crypt_set.is_empty() {
            writeln!(out, "  <encryption>None</encryption>")?;
        }
        for (crypt, label) in ENCRYPTION_LINES {
            if network.crypt_set.contains(crypt) {
                writeln!(out, "  <encryption>{}</encryption>", label)?;
            }
        }
        writeln!(
            out,
            "  <essid cloaked=\"{}\">{}</essid>",
            network.is_cloaked(),
            ssid
        )?;
        writeln!(out, " </SSID>")?;
        writeln!(out, " <BSSID>{}</BSSID>", mac)?;
        writeln!(out, " <manuf>{}</manuf>", manuf)?;
        writeln!(out, " <channel>{}</channel>", network.channel)?;

        let signal = &network.signal_dbm;
        writeln!(out, " <snr-info>")?;
        writeln!(out, "  <last_signal_dbm>{}</last_signal_dbm>", signal.last)?;
        writeln!(out, "  <min_signal_dbm>{}</min_signal_dbm>", signal.min)?;
        writeln!(out, "  <max_signal_dbm>{}</max_signal_dbm>", signal.max)?;
        writeln!(out, " </snr-info>")?;

        if network.latitude != 0.0 && network.longitude != 0.0 {
            let (lat, lon) = (
                format_coordinate(network.latitude),
                format_coordinate(network.longitude),
            );
            writeln!(out, " <gps-info>")?;
            for prefix in ["min", "max", "peak", "avg"] {
                writeln!(out, "  <{p}-lat>{}</{p}-lat>", lat, p = prefix)?;
                writeln!(out, "  <{p}-lon>{}</{p}-lon>", lon, p = prefix)?;
            }
            writeln!(out, " </gps-info>")?;
        }
        writeln!(out, "</wireless-network>")?;
        Ok(())
    }
}

impl NetworkExporter for NetxmlExporter {
    fn export(&self, path: &Path, networks: &[ExportEntry<'_>]) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(HEADER.as_bytes())?;
        for (number, entry) in networks.iter().enumerate() {
            Self::write_network(&mut out, number, *entry)?;
        }
        out.write_all(b"</detection-run>")?;
        out.flush()?;
        info!("Exported {} networks to {:?}", networks.len(), path);
        Ok(())
    }
}
