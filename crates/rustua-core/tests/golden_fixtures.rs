use rustua_core::catalog::{self, DatagramDataSetReaderTransportDataType, NetworkAddressUrlDataType};
use rustua_core::encoding::{
    decode_binary, decode_json, decode_xml, encode_binary, encode_json, encode_xml,
};
use rustua_core::types::{StructValue, UaString, Value};
use rustua_core::EncodingContext;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("workspace root should be resolvable")
}

fn fixture(name: &str) -> PathBuf {
    workspace_root().join("fixtures/golden").join(name)
}

fn parse_hex_fixture(path: &Path) -> Vec<u8> {
    let content = fs::read_to_string(path).expect("fixture must be readable");
    let mut out = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for token in trimmed.split_whitespace() {
            let byte = u8::from_str_radix(token, 16)
                .unwrap_or_else(|_| panic!("invalid hex token '{token}' in {}", path.display()));
            out.push(byte);
        }
    }
    out
}

fn ctx() -> EncodingContext {
    EncodingContext::for_registry(Arc::new(catalog::pubsub().unwrap()))
}

fn expected_url() -> StructValue {
    let address = StructValue::builder(NetworkAddressUrlDataType::IDENTITY.type_id.clone())
        .field("NetworkInterface", "eth0")
        .field("Url", "opc.udp://239.0.0.1:4840")
        .build();
    StructValue::builder(DatagramDataSetReaderTransportDataType::IDENTITY.type_id.clone())
        .field("Address", address)
        .field("QosCategory", "")
        .field("DatagramQos", Value::Array(Some(Vec::new())))
        .field("Topic", "plant/line1")
        .build()
}

fn expected_null() -> StructValue {
    StructValue::builder(DatagramDataSetReaderTransportDataType::IDENTITY.type_id.clone())
        .field("Address", Value::Null)
        .field("QosCategory", UaString::null())
        .field("DatagramQos", Value::Array(None))
        .field("Topic", UaString::null())
        .build()
}

fn check_fixture_set(stem: &str, expected: &StructValue) {
    let ctx = ctx();
    let type_id = expected.type_id();

    let hex_path = fixture(&format!("{stem}.hex"));
    let bytes = parse_hex_fixture(&hex_path);
    let from_binary = decode_binary(&ctx, &bytes, type_id)
        .unwrap_or_else(|e| panic!("{} failed binary decode: {e:?}", hex_path.display()));
    assert_eq!(&from_binary, expected, "{}", hex_path.display());

    let json_path = fixture(&format!("{stem}.json"));
    let json = fs::read_to_string(&json_path).expect("fixture must be readable");
    let from_json = decode_json(&ctx, &json, type_id)
        .unwrap_or_else(|e| panic!("{} failed JSON decode: {e:?}", json_path.display()));
    assert_eq!(&from_json, expected, "{}", json_path.display());

    let xml_path = fixture(&format!("{stem}.xml"));
    let xml = fs::read_to_string(&xml_path).expect("fixture must be readable");
    let from_xml = decode_xml(&ctx, &xml, type_id)
        .unwrap_or_else(|e| panic!("{} failed XML decode: {e:?}", xml_path.display()));
    assert_eq!(&from_xml, expected, "{}", xml_path.display());

    // binary and JSON re-encode to the fixture itself
    let mut buf = vec![0u8; bytes.len() + 16];
    let n = encode_binary(&ctx, expected, &mut buf).unwrap();
    assert_eq!(&buf[..n], bytes.as_slice(), "{}", hex_path.display());

    let reencoded: serde_json::Value =
        serde_json::from_str(&encode_json(&ctx, expected).unwrap()).unwrap();
    let original: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(reencoded, original, "{}", json_path.display());

    let reencoded_xml = encode_xml(&ctx, expected).unwrap();
    assert_eq!(&decode_xml(&ctx, &reencoded_xml, type_id).unwrap(), expected);
}

#[test]
fn datagram_reader_with_url_address() {
    check_fixture_set("datagram_reader_url", &expected_url());
}

#[test]
fn datagram_reader_with_null_members() {
    check_fixture_set("datagram_reader_null", &expected_null());
}

#[test]
fn every_hex_fixture_decodes() {
    let fixture_dir = workspace_root().join("fixtures/golden");
    let mut fixture_files = fs::read_dir(&fixture_dir)
        .expect("fixtures directory should exist")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "hex"))
        .collect::<Vec<_>>();
    fixture_files.sort();
    assert!(
        !fixture_files.is_empty(),
        "expected at least one corpus fixture in {}",
        fixture_dir.display()
    );

    let ctx = ctx();
    let type_id = DatagramDataSetReaderTransportDataType::IDENTITY.type_id;
    for path in fixture_files {
        let bytes = parse_hex_fixture(&path);
        decode_binary(&ctx, &bytes, &type_id)
            .unwrap_or_else(|e| panic!("fixture {} failed decode: {e:?}", path.display()));
    }
}
