//! Restore-point object record and its `.info` framing.
//!
//! Layout of a `.info` file:
//!   [magic "VKRPINF1" (8)]
//!   [body: ObjectRecord, fields in declared order]
//!   [crc32 u32 LE over body]

use byteorder::{ByteOrder, LittleEndian};

use crate::codec::{record_struct, ByteReader, Decode, Encode, ByteWriter};
use crate::error::{Error, Result};
use crate::object::{Binding, CreateInfo, Identity, ObjectState, Status};
use crate::state::ControlBlock;

pub const INFO_MAGIC: &[u8; 8] = b"VKRPINF1";

record_struct! {
    /// Capture-agnostic projection of a control block.
    pub struct ObjectRecord {
        pub identity: Identity,
        pub status: Status,
        pub parent: Option<Identity>,
        pub name: Option<String>,
        pub create_info: CreateInfo,
        pub bindings: Vec<Binding>,
        pub state: ObjectState,
        /// Construction dependencies, restored before this object.
        pub dependencies: Vec<Identity>,
    }
}

impl ObjectRecord {
    pub fn from_control_block(cb: &ControlBlock) -> Self {
        Self {
            identity: cb.identity(),
            status: cb.status(),
            parent: cb.parent(),
            name: cb.name(),
            create_info: cb.create_info().clone(),
            bindings: cb.bindings(),
            state: cb.state(),
            dependencies: cb.construction_dependencies(),
        }
    }

    /// Frame the record for a `.info` file.
    pub fn to_info_bytes(&self) -> Vec<u8> {
        let mut body = ByteWriter::new();
        self.encode(&mut body);
        let crc = crc32fast::hash(body.as_slice());

        let mut out = Vec::with_capacity(INFO_MAGIC.len() + body.len() + 4);
        out.extend_from_slice(INFO_MAGIC);
        out.extend_from_slice(body.as_slice());
        let mut tail = [0u8; 4];
        LittleEndian::write_u32(&mut tail, crc);
        out.extend_from_slice(&tail);
        out
    }

    /// Parse a `.info` file. Bad magic, bad checksum or trailing bytes are `CorruptStream`.
    pub fn from_info_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < INFO_MAGIC.len() + 4 {
            return Err(Error::corrupt(format!("record too short ({} bytes)", bytes.len())));
        }
        if &bytes[..INFO_MAGIC.len()] != INFO_MAGIC {
            return Err(Error::corrupt("bad record magic"));
        }
        let body = &bytes[INFO_MAGIC.len()..bytes.len() - 4];
        let stored = LittleEndian::read_u32(&bytes[bytes.len() - 4..]);
        let actual = crc32fast::hash(body);
        if stored != actual {
            return Err(Error::corrupt(format!(
                "record checksum mismatch (stored {:#010x}, computed {:#010x})",
                stored, actual
            )));
        }
        let mut r = ByteReader::new(body);
        let rec = ObjectRecord::decode(&mut r)?;
        if !r.is_empty() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after record body",
                r.remaining()
            )));
        }
        Ok(rec)
    }
}
