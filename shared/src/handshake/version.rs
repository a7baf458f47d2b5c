use std::fmt;

use log::error;
use wraith_serde::{BitReader, BitWrite, Serde, SerdeErr};

/// The four-field version tuple exchanged during the handshake. Every field
/// must match exactly; there is no negotiation, only validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolVersionInfo {
    pub protocol_version: u32,
    pub game_version: u32,
    pub rpc_schema_hash: u32,
    pub component_schema_hash: u32,
}

impl Serde for ProtocolVersionInfo {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.protocol_version.ser(writer);
        self.game_version.ser(writer);
        self.rpc_schema_hash.ser(writer);
        self.component_schema_hash.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            protocol_version: u32::de(reader)?,
            game_version: u32::de(reader)?,
            rpc_schema_hash: u32::de(reader)?,
            component_schema_hash: u32::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        128
    }
}

/// One named schema item and its layout hash, exchanged so that a hash
/// mismatch can be itemized on both ends, not just the end that noticed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashItem {
    pub name: String,
    pub hash: u32,
}

impl Serde for HashItem {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.name.ser(writer);
        self.hash.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            name: String::de(reader)?,
            hash: u32::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.name.bit_length() + 32
    }
}

/// Everything one peer states about its protocol during the handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionPayload {
    pub info: ProtocolVersionInfo,
    pub component_items: Vec<HashItem>,
    pub rpc_items: Vec<HashItem>,
}

impl Serde for VersionPayload {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.info.ser(writer);
        self.component_items.ser(writer);
        self.rpc_items.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            info: ProtocolVersionInfo::de(reader)?,
            component_items: Vec::de(reader)?,
            rpc_items: Vec::de(reader)?,
        })
    }

    fn bit_length(&self) -> u32 {
        self.info.bit_length() + self.component_items.bit_length() + self.rpc_items.bit_length()
    }
}

/// Field-by-field validation result: every differing field of the version
/// tuple, with (local, remote) values. Always fatal; never retried.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct VersionMismatch {
    pub protocol_version: Option<(u32, u32)>,
    pub game_version: Option<(u32, u32)>,
    pub rpc_schema_hash: Option<(u32, u32)>,
    pub component_schema_hash: Option<(u32, u32)>,
}

impl VersionMismatch {
    /// Compares local and remote tuples. `Ok(())` when every field matches.
    pub fn validate(
        local: &ProtocolVersionInfo,
        remote: &ProtocolVersionInfo,
    ) -> Result<(), VersionMismatch> {
        let mut mismatch = VersionMismatch::default();
        if local.protocol_version != remote.protocol_version {
            mismatch.protocol_version = Some((local.protocol_version, remote.protocol_version));
        }
        if local.game_version != remote.game_version {
            mismatch.game_version = Some((local.game_version, remote.game_version));
        }
        if local.rpc_schema_hash != remote.rpc_schema_hash {
            mismatch.rpc_schema_hash = Some((local.rpc_schema_hash, remote.rpc_schema_hash));
        }
        if local.component_schema_hash != remote.component_schema_hash {
            mismatch.component_schema_hash =
                Some((local.component_schema_hash, remote.component_schema_hash));
        }

        if mismatch == VersionMismatch::default() {
            Ok(())
        } else {
            Err(mismatch)
        }
    }
}

impl fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Protocol version mismatch:")?;
        if let Some((local, remote)) = self.protocol_version {
            write!(f, " [protocol-version: local {} != remote {}]", local, remote)?;
        }
        if let Some((local, remote)) = self.game_version {
            write!(f, " [game-version: local {} != remote {}]", local, remote)?;
        }
        if let Some((local, remote)) = self.rpc_schema_hash {
            write!(
                f,
                " [rpc-schema-hash: local {:#010x} != remote {:#010x}]",
                local, remote
            )?;
        }
        if let Some((local, remote)) = self.component_schema_hash {
            write!(
                f,
                " [component-schema-hash: local {:#010x} != remote {:#010x}]",
                local, remote
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for VersionMismatch {}

/// One itemized difference between two peers' schema item lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HashItemDiff {
    Mismatched { name: String, local: u32, remote: u32 },
    MissingLocal { name: String },
    MissingRemote { name: String },
}

impl fmt::Display for HashItemDiff {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HashItemDiff::Mismatched {
                name,
                local,
                remote,
            } => write!(
                f,
                "'{}' differs (local {:#010x}, remote {:#010x})",
                name, local, remote
            ),
            HashItemDiff::MissingLocal { name } => {
                write!(f, "'{}' registered only on the remote peer", name)
            }
            HashItemDiff::MissingRemote { name } => {
                write!(f, "'{}' registered only on this peer", name)
            }
        }
    }
}

/// Names every item that contributes to a combined-hash mismatch.
pub fn diff_hash_items(local: &[HashItem], remote: &[HashItem]) -> Vec<HashItemDiff> {
    let mut diffs = Vec::new();

    for local_item in local {
        match remote.iter().find(|item| item.name == local_item.name) {
            Some(remote_item) if remote_item.hash != local_item.hash => {
                diffs.push(HashItemDiff::Mismatched {
                    name: local_item.name.clone(),
                    local: local_item.hash,
                    remote: remote_item.hash,
                });
            }
            Some(_) => {}
            None => diffs.push(HashItemDiff::MissingRemote {
                name: local_item.name.clone(),
            }),
        }
    }
    for remote_item in remote {
        if !local.iter().any(|item| item.name == remote_item.name) {
            diffs.push(HashItemDiff::MissingLocal {
                name: remote_item.name.clone(),
            });
        }
    }

    diffs
}

/// Logs the full itemized diff for one mismatched collection. Both peers
/// call this, each against its own registry, so the diagnostics appear on
/// both ends.
pub fn log_collection_mismatch(collection: &str, local: &[HashItem], remote: &[HashItem]) {
    error!("{} Collection mismatched:", collection);
    for diff in diff_hash_items(local, remote) {
        error!("  {}", diff);
    }
}
