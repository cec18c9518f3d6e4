use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Actions an operator may perform on classifications.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ActionSet: u32 {
        const FIND = 1 << 0;
        const CREATE = 1 << 1;
        const UPDATE = 1 << 2;
        const DELETE = 1 << 3;

        const WRITE = Self::CREATE.bits() | Self::UPDATE.bits() | Self::DELETE.bits();
        const ALL = Self::FIND.bits() | Self::WRITE.bits();
    }
}

impl ActionSet {
    /// Parses one grant entry; unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "find" | "read" => Some(Self::FIND),
            "create" => Some(Self::CREATE),
            "update" => Some(Self::UPDATE),
            "delete" => Some(Self::DELETE),
            "write" => Some(Self::WRITE),
            "all" | "*" => Some(Self::ALL),
            _ => None,
        }
    }
}

impl Serialize for ActionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for ActionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}
