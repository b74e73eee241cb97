use clap::ValueEnum;
use rustua_core::catalog::{DatagramDataSetReaderTransportDataType, NetworkAddressUrlDataType};
use rustua_core::encoding::{
    decode_binary, decode_json, decode_xml, encode_binary, encode_json, encode_xml,
};
use rustua_core::types::{ExpandedNodeId, WireFormat};
use rustua_core::EncodingContext;
use std::error::Error;

/// CLI-friendly names for the three wire encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WireFormatArg {
    /// Binary, read and written as hex text.
    Binary,
    Json,
    Xml,
}

impl WireFormatArg {
    pub const fn into_wire_format(self) -> WireFormat {
        match self {
            Self::Binary => WireFormat::Binary,
            Self::Json => WireFormat::Json,
            Self::Xml => WireFormat::Xml,
        }
    }
}

/// CLI-friendly enum for selecting a shipped catalog type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CatalogTypeArg {
    DatagramReaderTransport,
    NetworkAddressUrl,
}

impl CatalogTypeArg {
    pub fn type_id(self) -> ExpandedNodeId {
        match self {
            Self::DatagramReaderTransport => {
                DatagramDataSetReaderTransportDataType::IDENTITY.type_id
            }
            Self::NetworkAddressUrl => NetworkAddressUrlDataType::IDENTITY.type_id,
        }
    }
}

/// Parses whitespace-separated hex bytes; `#` starts a comment line.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        for token in trimmed.split_whitespace() {
            let byte = u8::from_str_radix(token, 16)
                .map_err(|_| format!("invalid hex token '{token}'"))?;
            out.push(byte);
        }
    }
    Ok(out)
}

/// Formats bytes as upper-case hex, sixteen per line.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .chunks(16)
        .map(|line| {
            line.iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decodes `input` as `from` and re-encodes it as `to`.
pub fn convert(
    ctx: &EncodingContext,
    type_id: &ExpandedNodeId,
    from: WireFormatArg,
    to: WireFormatArg,
    input: &str,
) -> Result<String, Box<dyn Error>> {
    let value = match from {
        WireFormatArg::Binary => decode_binary(ctx, &parse_hex(input)?, type_id)?,
        WireFormatArg::Json => decode_json(ctx, input, type_id)?,
        WireFormatArg::Xml => decode_xml(ctx, input, type_id)?,
    };
    log::debug!("decoded {type_id} from {}", from.into_wire_format());
    Ok(match to {
        WireFormatArg::Binary => {
            let mut buf = vec![0u8; ctx.limits().max_message_size.min(1 << 24)];
            let n = encode_binary(ctx, &value, &mut buf)?;
            to_hex(&buf[..n])
        }
        WireFormatArg::Json => encode_json(ctx, &value)?,
        WireFormatArg::Xml => encode_xml(ctx, &value)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{convert, parse_hex, to_hex, CatalogTypeArg, WireFormatArg};
    use rustua_core::catalog;
    use rustua_core::EncodingContext;
    use std::sync::Arc;

    #[test]
    fn hex_roundtrip_skips_comments() {
        let bytes = parse_hex("# header\n01 0a\n\nFF\n").unwrap();
        assert_eq!(bytes, [0x01, 0x0A, 0xFF]);
        assert_eq!(to_hex(&bytes), "01 0A FF");
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn converts_json_to_binary_and_back() {
        let ctx = EncodingContext::for_registry(Arc::new(catalog::pubsub().unwrap()));
        let json = r#"{"NetworkInterface":"eth0","Url":"opc.udp://239.0.0.1:4840"}"#;
        let type_id = CatalogTypeArg::NetworkAddressUrl.type_id();
        let hex = convert(&ctx, &type_id, WireFormatArg::Json, WireFormatArg::Binary, json).unwrap();
        assert!(hex.starts_with("04 00 00 00 65 74 68 30"));
        let back = convert(&ctx, &type_id, WireFormatArg::Binary, WireFormatArg::Json, &hex).unwrap();
        assert_eq!(back, json);
    }
}
