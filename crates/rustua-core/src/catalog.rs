//! Namespace-0 structured types shipped with the crate: the PubSub datagram
//! reader transport settings and the network address types they reference.

use crate::registry::{DataTypeRegistry, DataTypeRegistryBuilder};
use crate::schema::{StructureDefinition, StructureField, StructureType};
use crate::types::{
    BuiltinType, ExpandedNodeId, NamespaceTable, NodeId, TypeIdentity, OPC_UA_NAMESPACE_URI,
};
use crate::RegistryError;

/// Abstract base of every network address structure.
pub const NETWORK_ADDRESS_DATA_TYPE: u32 = 15502;
/// Abstract base of datagram receive QoS settings.
pub const RECEIVE_QOS_DATA_TYPE: u32 = 23608;
/// Abstract base of data set reader transport settings.
pub const DATA_SET_READER_TRANSPORT_DATA_TYPE: u32 = 15628;

fn ns0(namespaces: &NamespaceTable, id: u32) -> NodeId {
    NodeId::numeric(namespaces.index_of(OPC_UA_NAMESPACE_URI).unwrap_or(0), id)
}

fn string(namespaces: &NamespaceTable) -> NodeId {
    ns0(namespaces, BuiltinType::String.to_u32())
}

/// Datagram transport settings of a PubSub data set reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatagramDataSetReaderTransportDataType;

impl DatagramDataSetReaderTransportDataType {
    pub const NAME: &'static str = "DatagramDataSetReaderTransportDataType";
    pub const IDENTITY: TypeIdentity = TypeIdentity::ns0(23614, 23866, 23934, 24002);

    /// Field list expressed in the indices of `namespaces`.
    pub fn definition(namespaces: &NamespaceTable) -> StructureDefinition {
        StructureDefinition::new(
            ns0(namespaces, 23866),
            ns0(namespaces, DATA_SET_READER_TRANSPORT_DATA_TYPE),
            StructureType::Structure,
            vec![
                StructureField::scalar("Address", ns0(namespaces, NETWORK_ADDRESS_DATA_TYPE)),
                StructureField::scalar("QosCategory", string(namespaces)),
                StructureField::array("DatagramQos", ns0(namespaces, RECEIVE_QOS_DATA_TYPE)),
                StructureField::scalar("Topic", string(namespaces)),
            ],
        )
    }
}

/// A network interface name plus a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkAddressUrlDataType;

impl NetworkAddressUrlDataType {
    pub const NAME: &'static str = "NetworkAddressUrlDataType";
    pub const IDENTITY: TypeIdentity = TypeIdentity::ns0(15510, 21152, 21176, 21200);

    pub fn definition(namespaces: &NamespaceTable) -> StructureDefinition {
        StructureDefinition::new(
            ns0(namespaces, 21152),
            ns0(namespaces, NETWORK_ADDRESS_DATA_TYPE),
            StructureType::Structure,
            vec![
                StructureField::scalar("NetworkInterface", string(namespaces)),
                StructureField::scalar("Url", string(namespaces)),
            ],
        )
    }
}

/// Adds the catalog types to `builder`, using its namespace table for the
/// field data types.
pub fn register(builder: DataTypeRegistryBuilder) -> DataTypeRegistryBuilder {
    let datagram = DatagramDataSetReaderTransportDataType::definition(builder.namespaces());
    let url = NetworkAddressUrlDataType::definition(builder.namespaces());
    builder
        .register_abstract(
            "NetworkAddressDataType",
            ExpandedNodeId::numeric(0, NETWORK_ADDRESS_DATA_TYPE),
        )
        .register_abstract(
            "ReceiveQosDataType",
            ExpandedNodeId::numeric(0, RECEIVE_QOS_DATA_TYPE),
        )
        .register_abstract(
            "DataSetReaderTransportDataType",
            ExpandedNodeId::numeric(0, DATA_SET_READER_TRANSPORT_DATA_TYPE),
        )
        .register_structure(
            NetworkAddressUrlDataType::NAME,
            NetworkAddressUrlDataType::IDENTITY,
            url,
        )
        .register_structure(
            DatagramDataSetReaderTransportDataType::NAME,
            DatagramDataSetReaderTransportDataType::IDENTITY,
            datagram,
        )
}

/// A registry holding only the catalog types, over a namespace table with
/// just namespace 0.
pub fn pubsub() -> Result<DataTypeRegistry, RegistryError> {
    register(DataTypeRegistry::builder(NamespaceTable::new())).build()
}

#[cfg(test)]
mod tests {
    use super::{pubsub, DatagramDataSetReaderTransportDataType, NetworkAddressUrlDataType};
    use crate::schema::FieldKind;
    use crate::types::{BuiltinType, ExpandedNodeId, NamespaceTable, WireFormat};

    #[test]
    fn identities_resolve_to_codecs() {
        let registry = pubsub().unwrap();
        assert_eq!(registry.len(), 2);
        let (codec, format) = registry
            .lookup(&ExpandedNodeId::numeric(0, 24002))
            .unwrap();
        assert_eq!(codec.name(), DatagramDataSetReaderTransportDataType::NAME);
        assert_eq!(format, WireFormat::Json);
        let (codec, format) = registry
            .lookup(&ExpandedNodeId::numeric(0, 21152))
            .unwrap();
        assert_eq!(codec.name(), NetworkAddressUrlDataType::NAME);
        assert_eq!(format, WireFormat::Binary);
    }

    #[test]
    fn datagram_layout() {
        let registry = pubsub().unwrap();
        assert_eq!(
            registry.field_kind(&ExpandedNodeId::numeric(0, 15502)),
            Some(FieldKind::ExtensionObject(
                ExpandedNodeId::numeric(0, 15502)
                    .canonical(registry.namespaces())
                    .unwrap()
            ))
        );
        let definition = DatagramDataSetReaderTransportDataType::definition(&NamespaceTable::new());
        let names: Vec<_> = definition.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Address", "QosCategory", "DatagramQos", "Topic"]);
        assert!(definition.fields[2].is_array());
        assert_eq!(
            definition.field("Topic").unwrap().data_type,
            BuiltinType::String.node_id()
        );
    }
}
