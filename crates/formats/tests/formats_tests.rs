//! Integration tests for the capture file codecs
//!
//! Each codec is driven through the `NetworkParser` / `NetworkExporter`
//! traits against real files in a temporary directory.

use formats::{
    ExportFormat, ImportFormat, KmzExporter, KmzOptions, NativeFormat, NetworkExporter,
    NetworkParser, NetxmlExporter, NetxmlParser, TabularExporter, format_coordinate,
};
use records::crypt::Crypt;
use records::{CryptSet, MacAddress, NetworkRecord, NetworkType, SignalDbm};
use std::fs;
use std::io::Read;
use tempfile::TempDir;

fn sample_record() -> NetworkRecord {
    NetworkRecord {
        network_type: NetworkType::Infrastructure,
        channel: 6,
        first_seen: 1_256_375_135,
        last_seen: 1_256_375_160,
        latitude: 52.5,
        longitude: 13.4,
        manufacturer: "Acme & Sons".to_string(),
        ssid: "lab".to_string(),
        crypt_set: CryptSet::from_mechanisms([Crypt::Wpa, Crypt::Psk, Crypt::AesCcm]),
        crypt: "WPA,PSK,AES_CCM".to_string(),
        signal_dbm: SignalDbm::new(-80, -40, -55),
        ..Default::default()
    }
}

mod netxml {
    use super::*;

    const SCENARIO: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<!DOCTYPE detection-run SYSTEM "http://kismetwireless.net/kismet-3.1.0.dtd">
<detection-run kismet-version="2009.06.R1" start-time="Sat Oct 24 09:05:35 2009">
<wireless-network number="1" type="infrastructure" first-time="Sat Oct 24 09:05:35 2009" last-time="Sat Oct 24 09:06:00 2009">
 <SSID first-time="Sat Oct 24 09:05:35 2009" last-time="Sat Oct 24 09:06:00 2009">
  <essid cloaked="false">lab</essid>
 </SSID>
 <BSSID>AA:BB:CC:DD:EE:FF</BSSID>
 <manuf>Acme</manuf>
 <channel>11</channel>
 <wireless-client number="1" type="fromds">
  <client-mac>00:11:22:33:44:55</client-mac>
  <channel>3</channel>
 </wireless-client>
</wireless-network>
</detection-run>"#;

    #[test]
    fn test_network_without_encryption_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.netxml");
        fs::write(&path, SCENARIO).unwrap();

        let parsed = NetxmlParser.parse(&path);
        let network = &parsed["AA:BB:CC:DD:EE:FF"];
        assert_eq!(network.crypt_set, CryptSet(0));
        assert_eq!(network.crypt, "");
        assert_eq!(network.ssid, "lab");
        assert_eq!(network.channel, 11);
        assert_eq!(network.manufacturer, "Acme");
        assert_eq!(network.network_type, NetworkType::Infrastructure);
        assert_eq!(network.last_seen - network.first_seen, 25);
        assert_eq!(network.signal_dbm, None);
        assert!(!network.has_fix());
    }

    #[test]
    fn test_missing_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        assert!(NetxmlParser.parse(&dir.path().join("absent.netxml")).is_empty());
    }

    #[test]
    fn test_malformed_file_yields_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.netxml");
        fs::write(&path, "<detection-run><wireless-network type=\"client\" first-time=\"never\"").unwrap();
        assert!(NetxmlParser.parse(&path).is_empty());
    }

    #[test]
    fn test_export_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.netxml");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let mut record = sample_record();
        record.ssid = String::new();
        record.crypt_set = CryptSet::from_mechanisms([Crypt::Tls, Crypt::Fortress]);

        NetxmlExporter.export(&path, &[(&mac, &record)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(
            "<wireless-network number=\"0\" type=\"infrastructure\" first-time=\"Sat Oct 24 09:05:35 2009\" last-time=\"Sat Oct 24 09:06:00 2009\">"
        ));
        let tls = text.find("<encryption>WPA+TLS</encryption>").unwrap();
        let fortress = text.find("<encryption>Fortress</encryption>").unwrap();
        let keyguard = text.find("<encryption>Keyguard</encryption>").unwrap();
        assert!(tls < fortress && fortress < keyguard);
        assert!(text.contains("<essid cloaked=\"true\"></essid>"));
        assert!(text.contains(" <manuf>Acme &amp; Sons</manuf>"));
        assert!(text.contains("  <peak-lat>52.5</peak-lat>"));
        assert!(text.ends_with("</wireless-network>\n</detection-run>"));
    }

    #[test]
    fn test_export_then_parse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.netxml");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let record = sample_record();

        NetxmlExporter.export(&path, &[(&mac, &record)]).unwrap();
        let parsed = NetxmlParser.parse(&path);

        let network = &parsed["AA:BB:CC:DD:EE:FF"];
        assert_eq!(network.crypt_set, record.crypt_set);
        assert_eq!(network.crypt, "wpa,psk,aes_ccm");
        assert_eq!(network.first_seen, record.first_seen);
        assert_eq!(network.last_seen, record.last_seen);
        assert_eq!(network.latitude, 52.5);
        assert_eq!(network.longitude, 13.4);
        assert_eq!(network.signal_dbm, Some(record.signal_dbm));
        assert_eq!(network.manufacturer, "Acme & Sons");
    }

    #[test]
    fn test_padded_text_survives_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.netxml");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let mut record = sample_record();
        record.ssid = " cafe ".to_string();
        record.manufacturer = "  Acme ".to_string();

        NetxmlExporter.export(&path, &[(&mac, &record)]).unwrap();
        let parsed = NetxmlParser.parse(&path);

        let network = &parsed["AA:BB:CC:DD:EE:FF"];
        assert_eq!(network.ssid, " cafe ");
        assert_eq!(network.manufacturer, "  Acme ");
        assert_eq!(network.channel, 6);
    }

    #[test]
    fn test_tiny_coordinates_are_plain_decimals() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.netxml");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let mut record = sample_record();
        record.latitude = 0.0000001;
        record.longitude = -0.0000002;

        NetxmlExporter.export(&path, &[(&mac, &record)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("<peak-lat>0.0000001</peak-lat>"));
        assert!(text.contains("<peak-lon>-0.0000002</peak-lon>"));
        assert!(!text.contains("e-"));
        let network = &NetxmlParser.parse(&path)["AA:BB:CC:DD:EE:FF"];
        assert_eq!(network.latitude, 0.0000001);
        assert_eq!(network.longitude, -0.0000002);
    }
}

mod tabular {
    use super::*;

    #[test]
    fn test_tiny_coordinates_use_decimal_commas() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let mut record = sample_record();
        record.latitude = 0.0000001;

        TabularExporter.export(&path, &[(&mac, &record)]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n0,0000001;13,4;"));
        assert!(!text.contains("e-"));
    }
}

mod coordinates {
    use super::*;

    #[test]
    fn test_format_coordinate() {
        assert_eq!(format_coordinate(52.5), "52.5");
        assert_eq!(format_coordinate(13.0), "13.0");
        assert_eq!(format_coordinate(1e-7), "0.0000001");
        assert_eq!(format_coordinate(-122.4194155), "-122.4194155");
        assert_eq!(format_coordinate(-0.0), "0.0");
    }
}

mod native {
    use super::*;

    #[test]
    fn test_export_then_parse_defaults_annotations() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("networks.json");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let record = sample_record();

        NativeFormat.export(&path, &[(&mac, &record)]).unwrap();
        let parsed = NativeFormat.parse(&path);

        let imported = parsed["AA:BB:CC:DD:EE:FF"].clone();
        assert_eq!(imported.comment.as_deref(), Some(""));
        assert_eq!(imported.into_record(), record);
    }
}

mod kmz {
    use super::*;

    #[test]
    fn test_archive_holds_one_deflated_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.kmz");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let record = sample_record();
        let options = KmzOptions {
            document_name: "survey".to_string(),
            ..Default::default()
        };

        KmzExporter::new(options).export(&path, &[(&mac, &record)]).unwrap();

        let mut archive = zip::ZipArchive::new(fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "survey.kml");
        assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);

        let mut kml = String::new();
        entry.read_to_string(&mut kml).unwrap();
        assert!(kml.contains("<name>survey</name>"));
        assert!(kml.contains("WPA2: 1 APs"));
        assert!(kml.contains("MAC: AA:BB:CC:DD:EE:FF"));
    }
}

mod registry {
    use super::*;

    #[test]
    fn test_import_format_builds_parser() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("networks.json");
        let mac: MacAddress = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let record = sample_record();
        NativeFormat.export(&path, &[(&mac, &record)]).unwrap();

        let parser = "networks".parse::<ImportFormat>().unwrap().parser();
        assert_eq!(parser.parse(&path).len(), 1);
    }

    #[test]
    fn test_export_format_display() {
        let format: ExportFormat = "Google Earth KMZ".parse().unwrap();
        assert_eq!(format.to_string(), "kmz");
    }
}
