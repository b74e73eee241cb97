use crate::DecodeError;
use core::fmt;
use core::str::FromStr;
use uuid::Uuid;

/// A 16-byte globally unique identifier.
///
/// Text input is accepted in either letter case; [`Display`](fmt::Display)
/// always produces the upper-case hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid(Uuid);

impl Guid {
    pub const NULL: Self = Self(Uuid::nil());

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Builds a GUID from the `Data1..Data4` fields of the OPC UA binary layout.
    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self(Uuid::from_fields(data1, data2, data3, &data4))
    }

    pub fn as_fields(&self) -> (u32, u16, u16, &[u8; 8]) {
        self.0.as_fields()
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_nil()
    }

    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        Uuid::parse_str(text.trim())
            .map(Self)
            .map_err(|e| DecodeError::malformed("Guid", e.to_string()))
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for Guid {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::Guid;

    #[test]
    fn parse_ignores_case() {
        let lower = Guid::parse("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
        let upper = Guid::parse("72962B91-FA75-4AE6-8D28-B404DC7DAF63").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_string(), "72962B91-FA75-4AE6-8D28-B404DC7DAF63");
    }

    #[test]
    fn fields_roundtrip() {
        let g = Guid::from_fields(0x7296_2B91, 0xFA75, 0x4AE6, [0x8D, 0x28, 0xB4, 0x04, 0xDC, 0x7D, 0xAF, 0x63]);
        let (d1, d2, d3, d4) = g.as_fields();
        assert_eq!(Guid::from_fields(d1, d2, d3, *d4), g);
        assert_eq!(g.to_string(), "72962B91-FA75-4AE6-8D28-B404DC7DAF63");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Guid::parse("not-a-guid").is_err());
    }
}
