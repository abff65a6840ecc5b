//! Geo-package (KMZ) exporter
//!
//! Produces a zip archive holding a single deflate-compressed KML document.
//! Records are grouped into one folder per crypt category; records without a
//! position fix are left out.

use crate::error::Result;
use crate::{ExportEntry, NetworkExporter, format_coordinate};
use quick_xml::escape::partial_escape;
use records::timestamp::to_display_string;
use records::{CryptCategory, ShowMode, decode_cryptset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// KMZ output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmzOptions {
    /// Document title; also names the archive entry `<name>.kml`
    #[serde(default = "KmzOptions::default_document_name")]
    pub document_name: String,

    /// Base URL of the folder icons
    #[serde(default = "KmzOptions::default_icon_base_url")]
    pub icon_base_url: String,
}

impl KmzOptions {
    fn default_document_name() -> String {
        "airlog".to_string()
    }

    fn default_icon_base_url() -> String {
        "icons".to_string()
    }

    /// Name of the KML entry inside the archive
    pub fn entry_name(&self) -> String {
        format!("{}.kml", self.document_name)
    }
}

impl Default for KmzOptions {
    fn default() -> Self {
        Self {
            document_name: Self::default_document_name(),
            icon_base_url: Self::default_icon_base_url(),
        }
    }
}

/// External provider of recorded GPS tracks
pub trait TrackSource {
    /// Render tracks as KML fragments
    ///
    /// `mode` is set for filtered exports and carries the export target's
    /// inclusion mode.
    fn export_kml(&self, mode: Option<ShowMode>) -> String;
}

fn color(category: CryptCategory) -> &'static str {
    match category {
        CryptCategory::Wpa2 => "red",
        CryptCategory::Wpa => "orange",
        CryptCategory::Wep => "yellow",
        CryptCategory::None => "green",
        CryptCategory::Other => "grey",
    }
}

fn icon(category: CryptCategory) -> &'static str {
    match category {
        CryptCategory::Wpa2 | CryptCategory::Wpa => "WPA",
        CryptCategory::Wep => "WEP",
        CryptCategory::None | CryptCategory::Other => "Open",
    }
}

/// KMZ exporter
pub struct KmzExporter<'a> {
    options: KmzOptions,
    tracks: Option<(&'a dyn TrackSource, Option<ShowMode>)>,
}

impl<'a> KmzExporter<'a> {
    pub fn new(options: KmzOptions) -> Self {
        Self {
            options,
            tracks: None,
        }
    }

    /// Append track data after the network folders
    pub fn with_tracks(mut self, tracks: &'a dyn TrackSource, mode: Option<ShowMode>) -> Self {
        self.tracks = Some((tracks, mode));
        self
    }

    fn placemark(out: &mut String, entry: ExportEntry<'_>, category: CryptCategory) {
        let (mac, network) = entry;
        let ssid = partial_escape(&network.ssid);
        let crypts = decode_cryptset(network.crypt_set.0).join(",").to_uppercase();
        let _ = write!(
            out,
            "<Placemark><styleUrl>#{label}</styleUrl><name>{ssid}</name>\n\
             <Point><coordinates>{lon},{lat}</coordinates></Point>\n\
             <description><![CDATA[\n\
             SSID: {ssid}<br />\n\
             MAC: {mac}<br />\n\
             Manuf: {manuf}<br />\n\
             Type: {kind}<br />\n\
             Channel: {channel}<br />\n\
             Encryption: <FONT color={color}>{crypts}</FONT><br />\n\
             Last time: {last}<br />\n\
             GPS: {lon},{lat}]]></description></Placemark>",
            label = category.label(),
            ssid = ssid,
            lon = format_coordinate(network.longitude),
            lat = format_coordinate(network.latitude),
            mac = mac,
            manuf = network.manufacturer,
            kind = network.network_type,
            channel = network.channel,
            color = color(category),
            crypts = crypts,
            last = to_display_string(network.last_seen),
        );
    }

    /// Render the KML document
    pub fn render(&self, networks: &[ExportEntry<'_>]) -> String {
        let mut folders: BTreeMap<CryptCategory, (usize, String)> = BTreeMap::new();
        for entry in networks {
            if !entry.1.has_fix() {
                continue;
            }
            let category = entry.1.category();
            let (count, body) = folders.entry(category).or_default();
            Self::placemark(body, *entry, category);
            *count += 1;
        }

        let mut doc = String::new();
        doc.push_str("<?xml version='1.0' encoding='UTF-8'?>\r\n");
        doc.push_str("<kml xmlns='http://earth.google.com/kml/2.1'>\r\n");
        doc.push_str("<Document>\r\n");
        let _ = write!(
            doc,
            "<name>{}</name>\r\n",
            partial_escape(&self.options.document_name)
        );
        doc.push_str("<open>1</open>");

        for category in CryptCategory::BUCKET_ORDER {
            let (count, body) = folders.remove(&category).unwrap_or_default();
            let label = category.label();
            let _ = write!(
                doc,
                "\n<Folder>\n\
                 <name>{label}: {count} APs</name>\n\
                 <Style id=\"{label}\"><IconStyle><scale>0.5</scale>\n\
                 <Icon>\n\
                 <href>{base}/{icon}.gif</href>\n\
                 </Icon></IconStyle></Style>\n\
                 {body}\n\
                 </Folder>",
                label = label,
                count = count,
                base = self.options.icon_base_url.trim_end_matches('/'),
                icon = icon(category),
                body = body,
            );
        }

        if let Some((tracks, mode)) = self.tracks {
            doc.push_str(&tracks.export_kml(mode));
        }

        doc.push_str("\r\n</Document>\r\n</kml>");
        doc
    }
}

impl NetworkExporter for KmzExporter<'_> {
    fn export(&self, path: &Path, networks: &[ExportEntry<'_>]) -> Result<()> {
        let document = self.render(networks);

        let mut zip = ZipWriter::new(File::create(path)?);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(self.options.entry_name(), options)?;
        zip.write_all(document.as_bytes())?;
        zip.finish()?;

        info!("Exported KMZ {:?}", path);
        Ok(())
    }
}
