//! Semicolon-delimited tabular format
//!
//! Import accepts any header-defined column set as long as the columns
//! below are present. Export writes the fixed map-point layout, with decimal
//! commas in the coordinates.

use crate::error::{FormatError, Result};
use crate::{ExportEntry, NetworkExporter, NetworkParser, ParsedNetworks, format_coordinate};
use csv::{ReaderBuilder, StringRecord};
use records::crypt::{encode_cryptset, normalize_token};
use records::timestamp::{from_legacy_string, to_display_string};
use records::{ImportedNetwork, NetworkType};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info, warn};

/// Header line written by the exporter
pub const EXPORT_HEADER: &str = "Latitude;Longitude;SSID;BSSID;Encryption;Channel;Last Seen;";

/// One data row zipped against the header
struct Row<'a> {
    columns: HashMap<&'a str, &'a str>,
}

impl<'a> Row<'a> {
    fn new(header: &'a [String], record: &'a StringRecord) -> Self {
        let columns = header
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();
        Self { columns }
    }

    fn get(&self, column: &str) -> Result<&'a str> {
        self.columns
            .get(column)
            .copied()
            .ok_or_else(|| FormatError::MissingField(column.to_string()))
    }

    fn number<T: FromStr>(&self, column: &str) -> Result<T> {
        let text = self.get(column)?;
        text.trim().parse().map_err(|_| FormatError::InvalidValue {
            field: column.to_string(),
            value: text.to_string(),
        })
    }

    fn into_network(self) -> Result<(String, ImportedNetwork)> {
        let tokens: Vec<String> = self
            .get("Encryption")?
            .split(',')
            .map(normalize_token)
            .collect();

        let network = ImportedNetwork {
            network_type: NetworkType::parse(self.get("NetType")?),
            channel: self.number("Channel")?,
            first_seen: from_legacy_string(self.get("FirstTime")?)?,
            last_seen: from_legacy_string(self.get("LastTime")?)?,
            latitude: self.number("GPSBestLat")?,
            longitude: self.number("GPSBestLon")?,
            ssid: self.get("ESSID")?.to_string(),
            crypt_set: encode_cryptset(&tokens).into(),
            crypt: tokens.join(","),
            ..Default::default()
        };
        Ok((self.get("BSSID")?.trim().to_string(), network))
    }
}

/// Read every row of a tabular capture file
///
/// Rows that fail to convert are logged and skipped.
pub fn read_tabular(path: &Path) -> Result<ParsedNetworks> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)?;

    let mut records = reader.records();
    let mut header: Vec<String> = match records.next() {
        Some(first) => first?.iter().map(str::to_string).collect(),
        None => return Ok(ParsedNetworks::new()),
    };
    // The trailing delimiter leaves an empty last column
    if header.last().is_some_and(|h| h.is_empty()) {
        header.pop();
    }

    let mut networks = ParsedNetworks::new();
    for (line, record) in records.enumerate() {
        let record = record?;
        match Row::new(&header, &record).into_network() {
            Ok((bssid, network)) => {
                networks.insert(bssid, network);
            }
            Err(e) => warn!("Skipping row {} of {:?}: {}", line + 2, path, e),
        }
    }
    Ok(networks)
}

/// Tabular parser
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularParser;

impl NetworkParser for TabularParser {
    fn parse(&self, path: &Path) -> ParsedNetworks {
        match read_tabular(path) {
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

/// Map-point tabular exporter
///
/// Records without a position fix are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TabularExporter;

impl TabularExporter {
    fn sanitize_ssid(ssid: &str) -> String {
        ssid.replace([';', '"'], " ")
    }
}

impl NetworkExporter for TabularExporter {
    fn export(&self, path: &Path, networks: &[ExportEntry<'_>]) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "{}", EXPORT_HEADER)?;

        let mut written = 0;
        for (mac, network) in networks {
            if !network.has_fix() {
                continue;
            }
            let position = format!(
                "{};{}",
                format_coordinate(network.latitude),
                format_coordinate(network.longitude)
            );
            writeln!(
                out,
                "{};\"{}\";{};{};{};{};",
                position.replace('.', ","),
                Self::sanitize_ssid(&network.ssid),
                mac,
                network.category().label(),
                network.channel,
                to_display_string(network.last_seen),
            )?;
            written += 1;
        }
        out.flush()?;
        info!("Exported {} networks to {:?}", written, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use records::{MacAddress, NetworkRecord};
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "Network;NetType;ESSID;BSSID;Info;Channel;Encryption;FirstTime;LastTime;GPSBestLat;GPSBestLon;\n\
1;infrastructure;lab;AA:BB:CC:DD:EE:FF;;6;WPA,AES-CCM;Sat Oct 24 09:05:35 2009;Sat Oct 24 09:06:00 2009;52.5;13.4;\n\
2;probe;;11:22:33:44:55:66;;0;None;Sat Oct 24 09:05:35 2009;Sat Oct 24 09:05:35 2009;0.0;0.0;\n";

    #[test]
    fn test_parse_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.csv");
        fs::write(&path, SAMPLE).unwrap();

        let parsed = TabularParser.parse(&path);
        assert_eq!(parsed.len(), 2);

        let lab = &parsed["AA:BB:CC:DD:EE:FF"];
        assert_eq!(lab.network_type, NetworkType::Infrastructure);
        assert_eq!(lab.channel, 6);
        assert_eq!(lab.crypt, "wpa,aes_ccm");
        assert_eq!(lab.latitude, 52.5);
        assert_eq!(lab.last_seen - lab.first_seen, 25);

        let probe = &parsed["11:22:33:44:55:66"];
        assert_eq!(probe.network_type, NetworkType::Unknown);
        assert!(probe.crypt_set.is_empty());
    }

    #[test]
    fn test_bad_row_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("capture.csv");
        let text = SAMPLE.replace(";6;WPA", ";six;WPA");
        fs::write(&path, text).unwrap();

        let parsed = TabularParser.parse(&path);
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key("11:22:33:44:55:66"));
    }

    #[test]
    fn test_export_decimal_commas() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let record = NetworkRecord {
            latitude: 52.5,
            longitude: 13.4,
            ssid: "my;\"net\"".to_string(),
            channel: 11,
            last_seen: 1_256_375_135,
            ..Default::default()
        };

        TabularExporter.export(&path, &[(&mac, &record)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(EXPORT_HEADER));
        assert_eq!(
            lines.next(),
            Some("52,5;13,4;\"my  net \";AA:BB:CC:DD:EE:FF;None;11;2009/10/24 09:05:35;")
        );
    }

    #[test]
    fn test_export_skips_no_fix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let record = NetworkRecord::default();

        TabularExporter.export(&path, &[(&mac, &record)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
