use rustua_core::catalog::{self, NetworkAddressUrlDataType};
use rustua_core::encoding::{
    decode_binary, decode_json, decode_xml, encode_binary, encode_json, encode_xml,
};
use rustua_core::schema::{StructureDefinition, StructureField, StructureType};
use rustua_core::types::{
    BuiltinType, ExpandedNodeId, NamespaceTable, NodeId, StructValue, TypeIdentity, Value,
};
use rustua_core::{DataTypeRegistry, DecodeError, EncodeError, EncodingContext, EncodingLimits};
use std::sync::Arc;

const APP: &str = "urn:rustua:limits";

fn tree_id() -> ExpandedNodeId {
    ExpandedNodeId::numeric(1, 100)
}

/// A self-referential `Tree { Value: Int32, Items: Int32[], Children: Tree[] }`.
fn ctx(limits: EncodingLimits) -> EncodingContext {
    let namespaces = NamespaceTable::with_uris([APP]).unwrap();
    let definition = StructureDefinition::new(
        NodeId::numeric(1, 101),
        NodeId::numeric(0, 22),
        StructureType::Structure,
        vec![
            StructureField::scalar("Value", BuiltinType::Int32.node_id()),
            StructureField::array("Items", BuiltinType::Int32.node_id()),
            StructureField::array("Children", NodeId::numeric(1, 100)),
        ],
    );
    let identity = TypeIdentity::new(
        tree_id(),
        ExpandedNodeId::numeric(1, 101),
        ExpandedNodeId::numeric(1, 102),
        ExpandedNodeId::numeric(1, 103),
    );
    let registry = DataTypeRegistry::builder(namespaces)
        .register_structure("Tree", identity, definition)
        .build()
        .unwrap();
    EncodingContext::for_registry(Arc::new(registry)).with_limits(limits)
}

fn tree(depth: usize, items: usize) -> StructValue {
    let children = if depth > 1 {
        vec![Value::from(tree(depth - 1, items))]
    } else {
        Vec::new()
    };
    StructValue::builder(tree_id())
        .field("Value", i32::try_from(depth).unwrap())
        .field("Items", (0..items as i32).map(Value::Int32).collect::<Vec<_>>())
        .field("Children", children)
        .build()
}

struct Encoded {
    binary: Vec<u8>,
    json: String,
    xml: String,
}

fn encode_unbounded(value: &StructValue) -> Encoded {
    let ctx = ctx(EncodingLimits::unbounded());
    let mut buf = vec![0u8; 1 << 16];
    let n = encode_binary(&ctx, value, &mut buf).unwrap();
    buf.truncate(n);
    Encoded {
        binary: buf,
        json: encode_json(&ctx, value).unwrap(),
        xml: encode_xml(&ctx, value).unwrap(),
    }
}

fn assert_all_exceed(limits: EncodingLimits, encoded: &Encoded) {
    let ctx = ctx(limits);
    let id = tree_id();
    assert!(matches!(
        decode_binary(&ctx, &encoded.binary, &id),
        Err(DecodeError::LimitExceeded { .. })
    ));
    assert!(matches!(
        decode_json(&ctx, &encoded.json, &id),
        Err(DecodeError::LimitExceeded { .. })
    ));
    assert!(matches!(
        decode_xml(&ctx, &encoded.xml, &id),
        Err(DecodeError::LimitExceeded { .. })
    ));
}

#[test]
fn nesting_depth_is_bounded() {
    // three trees and the arrays below each: six levels
    let value = tree(3, 0);
    let encoded = encode_unbounded(&value);
    assert_all_exceed(EncodingLimits::default().with_max_depth(4), &encoded);

    let ctx = ctx(EncodingLimits::default().with_max_depth(6));
    assert_eq!(decode_json(&ctx, &encoded.json, &tree_id()).unwrap(), value);
    assert_eq!(decode_xml(&ctx, &encoded.xml, &tree_id()).unwrap(), value);
    assert_eq!(decode_binary(&ctx, &encoded.binary, &tree_id()).unwrap(), value);

    let strict = self::ctx(EncodingLimits::default().with_max_depth(4));
    let mut buf = vec![0u8; 1024];
    assert!(matches!(
        encode_binary(&strict, &value, &mut buf),
        Err(EncodeError::LimitExceeded { .. })
    ));
    assert!(matches!(
        encode_json(&strict, &value),
        Err(EncodeError::LimitExceeded { .. })
    ));
    assert!(matches!(
        encode_xml(&strict, &value),
        Err(EncodeError::LimitExceeded { .. })
    ));
}

#[test]
fn array_length_is_bounded() {
    let value = tree(1, 10);
    let encoded = encode_unbounded(&value);
    assert_all_exceed(EncodingLimits::default().with_max_array_length(4), &encoded);

    let strict = ctx(EncodingLimits::default().with_max_array_length(4));
    assert!(matches!(
        encode_json(&strict, &value),
        Err(EncodeError::LimitExceeded { .. })
    ));
}

#[test]
fn message_size_is_bounded() {
    let value = tree(2, 8);
    let encoded = encode_unbounded(&value);
    let limit = encoded.binary.len().min(encoded.json.len()).min(encoded.xml.len()) - 1;
    assert_all_exceed(EncodingLimits::default().with_max_message_size(limit), &encoded);
}

#[test]
fn declared_array_length_beyond_input_is_rejected() {
    // Value = 1, Items claims 1_000_000 elements with four bytes following
    let mut bytes = vec![1, 0, 0, 0];
    bytes.extend_from_slice(&1_000_000i32.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    let ctx = ctx(EncodingLimits::unbounded());
    assert!(decode_binary(&ctx, &bytes, &tree_id()).is_err());
}

#[test]
fn string_length_is_bounded_in_every_format() {
    let value = StructValue::builder(NetworkAddressUrlDataType::IDENTITY.type_id)
        .field("NetworkInterface", "eth0")
        .field("Url", "opc.udp://239.0.0.1:4840")
        .build();
    let open = EncodingContext::for_registry(Arc::new(catalog::pubsub().unwrap()));
    let mut buf = vec![0u8; 256];
    let n = encode_binary(&open, &value, &mut buf).unwrap();
    let json = encode_json(&open, &value).unwrap();
    let xml = encode_xml(&open, &value).unwrap();

    let strict = open.with_limits(EncodingLimits::default().with_max_string_length(2));
    let id = value.type_id();
    assert!(matches!(
        decode_binary(&strict, &buf[..n], id),
        Err(DecodeError::LimitExceeded { .. })
    ));
    assert!(matches!(
        decode_json(&strict, &json, id),
        Err(DecodeError::LimitExceeded { .. })
    ));
    assert!(matches!(
        decode_xml(&strict, &xml, id),
        Err(DecodeError::LimitExceeded { .. })
    ));
}
