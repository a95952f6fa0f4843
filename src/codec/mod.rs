//! codec: field-by-field binary encoding of native structures.
//!
//! Every captured structure implements four capabilities, uniformly:
//! - `Encode` / `Decode`: little-endian, fields in declared order. Arrays are prefixed with
//!   a u32 length, optionals with a bool `present` byte.
//! - `Describe`: JSON projection used for the human-readable sidecars (enums and flags by name).
//! - `Handles`: walk every embedded `Identity` (dependency discovery, identity remapping).
//!
//! Leaf types are implemented here; compound structures get all four from `record_struct!`,
//! and tag-discriminated unions from `tagged_enum!`.

use ash::vk;
use byteorder::{ByteOrder, LittleEndian};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::object::Identity;

// -------------------- Writer / Reader --------------------

/// Append-only little-endian byte sink.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn put_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn put_i32(&mut self, v: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn put_u64(&mut self, v: u64) {
        let mut b = [0u8; 8];
        LittleEndian::write_u64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn put_f32(&mut self, v: f32) {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn put_len(&mut self, len: usize) {
        self.put_u32(len as u32);
    }

    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked little-endian cursor. Running out of bytes is a `CorruptStream`.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn raw(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::corrupt(format!(
                "unexpected end of data at offset {} (need {} bytes, have {})",
                self.pos,
                n,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.raw(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool> {
        let at = self.pos;
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(Error::corrupt(format!("bad bool byte {} at offset {}", v, at))),
        }
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.raw(4)?))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.raw(4)?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.raw(8)?))
    }

    pub fn f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.raw(4)?))
    }

    /// Array length prefix. Rejects lengths that cannot fit in what is left.
    pub fn len(&mut self) -> Result<usize> {
        let at = self.pos;
        let n = self.u32()? as usize;
        if n > self.remaining() {
            return Err(Error::corrupt(format!(
                "array length {} at offset {} exceeds remaining {} bytes",
                n,
                at,
                self.remaining()
            )));
        }
        Ok(n)
    }
}

// -------------------- Capabilities --------------------

pub trait Encode {
    fn encode(&self, w: &mut ByteWriter);
}

pub trait Decode: Sized {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self>;
}

pub trait Describe {
    fn describe(&self) -> Value;
}

/// Walk the identities embedded in a structure.
pub trait Handles {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity));
    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()>;
}

/// Encode a value into a fresh buffer.
pub fn to_bytes<T: Encode + ?Sized>(v: &T) -> Vec<u8> {
    let mut w = ByteWriter::new();
    v.encode(&mut w);
    w.into_inner()
}

/// Decode exactly one value; trailing bytes are corruption.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T> {
    let mut r = ByteReader::new(bytes);
    let v = T::decode(&mut r)?;
    if !r.is_empty() {
        return Err(Error::corrupt(format!(
            "{} trailing bytes after value",
            r.remaining()
        )));
    }
    Ok(v)
}

/// Identities embedded in `v`, in field order.
pub fn collect_handles<T: Handles + ?Sized>(v: &T) -> Vec<Identity> {
    let mut out = Vec::new();
    v.visit_handles(&mut |id| out.push(*id));
    out
}

// -------------------- Leaf types --------------------

macro_rules! leaf_without_handles {
    ($($t:ty),* $(,)?) => {
        $(
            impl Handles for $t {
                fn visit_handles(&self, _f: &mut dyn FnMut(&Identity)) {}
                fn remap_handles(
                    &mut self,
                    _f: &mut dyn FnMut(&mut Identity) -> Result<()>,
                ) -> Result<()> {
                    Ok(())
                }
            }
        )*
    };
}

leaf_without_handles!(u8, u32, i32, u64, f32, bool, String);

impl Encode for u8 {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u8(*self)
    }
}
impl Decode for u8 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.u8()
    }
}
impl Describe for u8 {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl Encode for u32 {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u32(*self)
    }
}
impl Decode for u32 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.u32()
    }
}
impl Describe for u32 {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl Encode for i32 {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_i32(*self)
    }
}
impl Decode for i32 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.i32()
    }
}
impl Describe for i32 {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl Encode for u64 {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_u64(*self)
    }
}
impl Decode for u64 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.u64()
    }
}
impl Describe for u64 {
    fn describe(&self) -> Value {
        Value::from(*self)
    }
}

impl Encode for f32 {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_f32(*self)
    }
}
impl Decode for f32 {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.f32()
    }
}
impl Describe for f32 {
    fn describe(&self) -> Value {
        Value::from(*self as f64)
    }
}

impl Encode for bool {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_bool(*self)
    }
}
impl Decode for bool {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        r.bool()
    }
}
impl Describe for bool {
    fn describe(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Encode for String {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_len(self.len());
        w.put_raw(self.as_bytes());
    }
}
impl Decode for String {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let n = r.len()?;
        let bytes = r.raw(n)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::corrupt(format!("bad utf-8: {}", e)))
    }
}
impl Describe for String {
    fn describe(&self) -> Value {
        Value::String(self.clone())
    }
}

// -------------------- Containers --------------------

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, w: &mut ByteWriter) {
        w.put_len(self.len());
        for v in self {
            v.encode(w);
        }
    }
}
impl<T: Decode> Decode for Vec<T> {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let n = r.len()?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(T::decode(r)?);
        }
        Ok(out)
    }
}
impl<T: Describe> Describe for Vec<T> {
    fn describe(&self) -> Value {
        Value::Array(self.iter().map(Describe::describe).collect())
    }
}
impl<T: Handles> Handles for Vec<T> {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity)) {
        for v in self {
            v.visit_handles(f);
        }
    }
    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        for v in self.iter_mut() {
            v.remap_handles(f)?;
        }
        Ok(())
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, w: &mut ByteWriter) {
        for v in self {
            v.encode(w);
        }
    }
}
impl<T: Decode + Copy + Default, const N: usize> Decode for [T; N] {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        let mut out = [T::default(); N];
        for slot in out.iter_mut() {
            *slot = T::decode(r)?;
        }
        Ok(out)
    }
}
impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe(&self) -> Value {
        Value::Array(self.iter().map(Describe::describe).collect())
    }
}
impl<T: Handles, const N: usize> Handles for [T; N] {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity)) {
        for v in self {
            v.visit_handles(f);
        }
    }
    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        for v in self.iter_mut() {
            v.remap_handles(f)?;
        }
        Ok(())
    }
}

// Optional fields and extension-chain links: {present: bool, value if present}.
impl<T: Encode> Encode for Option<T> {
    fn encode(&self, w: &mut ByteWriter) {
        match self {
            Some(v) => {
                w.put_bool(true);
                v.encode(w);
            }
            None => w.put_bool(false),
        }
    }
}
impl<T: Decode> Decode for Option<T> {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        if r.bool()? {
            Ok(Some(T::decode(r)?))
        } else {
            Ok(None)
        }
    }
}
impl<T: Describe> Describe for Option<T> {
    fn describe(&self) -> Value {
        match self {
            Some(v) => v.describe(),
            None => Value::Null,
        }
    }
}
impl<T: Handles> Handles for Option<T> {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity)) {
        if let Some(v) = self {
            v.visit_handles(f);
        }
    }
    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        match self {
            Some(v) => v.remap_handles(f),
            None => Ok(()),
        }
    }
}

impl<T: Encode> Encode for Box<T> {
    fn encode(&self, w: &mut ByteWriter) {
        (**self).encode(w)
    }
}
impl<T: Decode> Decode for Box<T> {
    fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Box::new(T::decode(r)?))
    }
}
impl<T: Describe> Describe for Box<T> {
    fn describe(&self) -> Value {
        (**self).describe()
    }
}
impl<T: Handles> Handles for Box<T> {
    fn visit_handles(&self, f: &mut dyn FnMut(&Identity)) {
        (**self).visit_handles(f)
    }
    fn remap_handles(&mut self, f: &mut dyn FnMut(&mut Identity) -> Result<()>) -> Result<()> {
        (**self).remap_handles(f)
    }
}

// -------------------- ash::vk enums and flags --------------------

macro_rules! vk_enum_leaf {
    ($($t:ty),* $(,)?) => {
        $(
            impl Encode for $t {
                fn encode(&self, w: &mut ByteWriter) {
                    w.put_i32(self.as_raw())
                }
            }
            impl Decode for $t {
                fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
                    Ok(<$t>::from_raw(r.i32()?))
                }
            }
            impl Describe for $t {
                fn describe(&self) -> Value {
                    Value::String(format!("{:?}", self))
                }
            }
            leaf_without_handles!($t);
        )*
    };
}

macro_rules! vk_flags_leaf {
    ($($t:ty),* $(,)?) => {
        $(
            impl Encode for $t {
                fn encode(&self, w: &mut ByteWriter) {
                    w.put_u32(self.as_raw())
                }
            }
            impl Decode for $t {
                fn decode(r: &mut ByteReader<'_>) -> Result<Self> {
                    Ok(<$t>::from_raw(r.u32()?))
                }
            }
            impl Describe for $t {
                fn describe(&self) -> Value {
                    Value::String(format!("{:?}", self))
                }
            }
            leaf_without_handles!($t);
        )*
    };
}

vk_enum_leaf!(
    vk::AttachmentLoadOp,
    vk::AttachmentStoreOp,
    vk::BorderColor,
    vk::ColorSpaceKHR,
    vk::CommandBufferLevel,
    vk::CompareOp,
    vk::ComponentSwizzle,
    vk::DescriptorType,
    vk::DynamicState,
    vk::Filter,
    vk::Format,
    vk::FrontFace,
    vk::ImageLayout,
    vk::ImageTiling,
    vk::ImageType,
    vk::ImageViewType,
    vk::IndexType,
    vk::PipelineBindPoint,
    vk::PolygonMode,
    vk::PresentModeKHR,
    vk::PrimitiveTopology,
    vk::QueryType,
    vk::SamplerAddressMode,
    vk::SamplerMipmapMode,
    vk::SemaphoreType,
    vk::SharingMode,
    vk::SubpassContents,
    vk::VertexInputRate,
);

vk_flags_leaf!(
    vk::AccessFlags,
    vk::BufferCreateFlags,
    vk::BufferUsageFlags,
    vk::ColorComponentFlags,
    vk::CommandBufferUsageFlags,
    vk::CommandPoolCreateFlags,
    vk::CullModeFlags,
    vk::DependencyFlags,
    vk::DescriptorPoolCreateFlags,
    vk::DescriptorSetLayoutCreateFlags,
    vk::EventCreateFlags,
    vk::ExternalMemoryHandleTypeFlags,
    vk::FenceCreateFlags,
    vk::ImageAspectFlags,
    vk::ImageCreateFlags,
    vk::ImageUsageFlags,
    vk::PipelineStageFlags,
    vk::QueryPipelineStatisticFlags,
    vk::SampleCountFlags,
    vk::SemaphoreCreateFlags,
    vk::ShaderStageFlags,
);

// -------------------- Compound structures --------------------

/// Declare a plain structure and derive Encode / Decode / Describe / Handles for it,
/// walking the fields in declared order.
macro_rules! record_struct {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $( $(#[$fmeta:meta])* pub $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            $( $(#[$fmeta])* pub $field: $ty ),*
        }

        impl $crate::codec::Encode for $name {
            #[allow(unused_variables)]
            fn encode(&self, w: &mut $crate::codec::ByteWriter) {
                $( $crate::codec::Encode::encode(&self.$field, w); )*
            }
        }

        impl $crate::codec::Decode for $name {
            #[allow(unused_variables)]
            fn decode(r: &mut $crate::codec::ByteReader<'_>) -> $crate::error::Result<Self> {
                Ok(Self {
                    $( $field: <$ty as $crate::codec::Decode>::decode(r)?, )*
                })
            }
        }

        impl $crate::codec::Describe for $name {
            fn describe(&self) -> serde_json::Value {
                #[allow(unused_mut)]
                let mut m = serde_json::Map::new();
                $(
                    m.insert(
                        stringify!($field).to_string(),
                        $crate::codec::Describe::describe(&self.$field),
                    );
                )*
                serde_json::Value::Object(m)
            }
        }

        impl $crate::codec::Handles for $name {
            #[allow(unused_variables)]
            fn visit_handles(&self, f: &mut dyn FnMut(&$crate::object::Identity)) {
                $( $crate::codec::Handles::visit_handles(&self.$field, f); )*
            }

            #[allow(unused_variables)]
            fn remap_handles(
                &mut self,
                f: &mut dyn FnMut(&mut $crate::object::Identity) -> $crate::error::Result<()>,
            ) -> $crate::error::Result<()> {
                $( $crate::codec::Handles::remap_handles(&mut self.$field, f)?; )*
                Ok(())
            }
        }
    };
}

/// Declare a union of payload structures discriminated by a u32 tag.
/// Encoded as `[tag u32][payload]`; an unknown tag is a `CorruptStream`.
macro_rules! tagged_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident ( $payload:ty ) = $tag:expr ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $name {
            $( $variant($payload) ),*
        }

        impl $name {
            pub fn tag(&self) -> u32 {
                match self {
                    $( $name::$variant(_) => $tag ),*
                }
            }

            pub fn variant_name(&self) -> &'static str {
                match self {
                    $( $name::$variant(_) => stringify!($variant) ),*
                }
            }

            /// Decode the payload that follows `tag`. `Ok(None)` for a tag this build does not know.
            pub fn decode_payload(
                tag: u32,
                r: &mut $crate::codec::ByteReader<'_>,
            ) -> $crate::error::Result<Option<Self>> {
                $(
                    if tag == $tag {
                        let payload = <$payload as $crate::codec::Decode>::decode(r)?;
                        return Ok(Some($name::$variant(payload)));
                    }
                )*
                Ok(None)
            }
        }

        impl $crate::codec::Encode for $name {
            fn encode(&self, w: &mut $crate::codec::ByteWriter) {
                w.put_u32(self.tag());
                match self {
                    $( $name::$variant(p) => $crate::codec::Encode::encode(p, w) ),*
                }
            }
        }

        impl $crate::codec::Decode for $name {
            fn decode(r: &mut $crate::codec::ByteReader<'_>) -> $crate::error::Result<Self> {
                let at = r.position();
                let tag = r.u32()?;
                match Self::decode_payload(tag, r)? {
                    Some(v) => Ok(v),
                    None => Err($crate::error::Error::corrupt(format!(
                        "unknown {} tag {} at offset {}",
                        stringify!($name),
                        tag,
                        at
                    ))),
                }
            }
        }

        impl $crate::codec::Describe for $name {
            fn describe(&self) -> serde_json::Value {
                let payload = match self {
                    $( $name::$variant(p) => $crate::codec::Describe::describe(p) ),*
                };
                serde_json::json!({ "type": self.variant_name(), "payload": payload })
            }
        }

        impl $crate::codec::Handles for $name {
            fn visit_handles(&self, f: &mut dyn FnMut(&$crate::object::Identity)) {
                match self {
                    $( $name::$variant(p) => $crate::codec::Handles::visit_handles(p, f) ),*
                }
            }

            fn remap_handles(
                &mut self,
                f: &mut dyn FnMut(&mut $crate::object::Identity) -> $crate::error::Result<()>,
            ) -> $crate::error::Result<()> {
                match self {
                    $( $name::$variant(p) => $crate::codec::Handles::remap_handles(p, f) ),*
                }
            }
        }
    };
}

pub(crate) use record_struct;
pub(crate) use tagged_enum;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_little_endian() {
        let mut w = ByteWriter::new();
        w.put_u32(0x0403_0201);
        w.put_bool(true);
        assert_eq!(w.as_slice(), &[1, 2, 3, 4, 1]);
    }

    #[test]
    fn short_read_is_corruption() {
        let mut r = ByteReader::new(&[1, 2]);
        assert!(matches!(r.u32(), Err(Error::CorruptStream(_))));
    }

    #[test]
    fn bad_bool_is_corruption() {
        let mut r = ByteReader::new(&[7]);
        assert!(matches!(r.bool(), Err(Error::CorruptStream(_))));
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let bytes = to_bytes(&1_000_000u32);
        assert!(from_bytes::<Vec<u8>>(&bytes).is_err());
    }

    #[test]
    fn optional_and_vec_layout() {
        let v: Option<Vec<u32>> = Some(vec![5, 6]);
        let bytes = to_bytes(&v);
        // present + len + 2 * u32
        assert_eq!(bytes.len(), 1 + 4 + 8);
        assert_eq!(from_bytes::<Option<Vec<u32>>>(&bytes).unwrap(), v);
        assert_eq!(to_bytes(&None::<u64>), vec![0]);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = to_bytes(&String::from("abc"));
        bytes.push(0);
        assert!(matches!(
            from_bytes::<String>(&bytes),
            Err(Error::CorruptStream(_))
        ));
    }

    #[test]
    fn vk_enums_describe_by_name() {
        let v = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
        assert_eq!(v.describe(), Value::String("TRANSFER_DST_OPTIMAL".into()));
        let bytes = to_bytes(&v);
        assert_eq!(from_bytes::<vk::ImageLayout>(&bytes).unwrap(), v);
    }
}
