//! In-memory metadata image.
//!
//! Lays out a user-string heap and method tables the way a PE image does,
//! which is enough to drive the interpreter without a real metadata reader.
use std::sync::Arc;

use crate::{MetadataError, MetadataResolver, MethodBody, MethodSignature, MethodTarget};

/// Table id in the top byte of a `MethodDef` token.
pub const METHOD_DEF_TABLE: u8 = 0x06;
/// Table id in the top byte of a `MemberRef` token.
pub const MEMBER_REF_TABLE: u8 = 0x0A;

const ROW_MASK: u32 = 0x00FF_FFFF;
const MAX_BLOB_LEN: usize = 0x7F;

fn token(table: u8, row: usize) -> u32 {
    (u32::from(table) << 24) | (row as u32 & ROW_MASK)
}

/// Whether a user string needs the terminal byte set: some UTF-16 unit has
/// a non-zero high byte, or a low byte that needs special handling.
fn needs_terminal_flag(units: &[u16]) -> bool {
    units.iter().any(|&unit| {
        let [low, high] = unit.to_le_bytes();
        high != 0 || matches!(low, 0x01..=0x08 | 0x0E..=0x1F | 0x27 | 0x2D | 0x7F)
    })
}

#[derive(Debug, Clone)]
pub struct MetadataImage {
    user_strings: Vec<u8>,
    string_offsets: Vec<u16>,
    member_refs: Vec<Arc<MethodSignature>>,
    method_defs: Vec<MethodBody>,
}

impl Default for MetadataImage {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataImage {
    pub fn new() -> Self {
        Self {
            // offset 0 is never a valid token
            user_strings: vec![0],
            string_offsets: Vec::new(),
            member_refs: Vec::new(),
            method_defs: Vec::new(),
        }
    }

    /// Encode `text` onto the user-string heap and return its token.
    pub fn add_user_string(&mut self, text: &str) -> Result<u16, MetadataError> {
        let units: Vec<u16> = text.encode_utf16().collect();
        let len = units.len() * 2 + 1;
        if len > MAX_BLOB_LEN {
            return Err(MetadataError::StringTooLong { len: units.len() });
        }

        let mut blob = Vec::with_capacity(len + 1);
        blob.push(len as u8);
        blob.extend(units.iter().flat_map(|unit| unit.to_le_bytes()));
        blob.push(u8::from(needs_terminal_flag(&units)));
        self.add_user_string_blob(&blob)
    }

    /// Append raw blob bytes, starting at the length byte, without checking
    /// them.
    pub fn add_user_string_blob(&mut self, blob: &[u8]) -> Result<u16, MetadataError> {
        let offset =
            u16::try_from(self.user_strings.len()).map_err(|_| MetadataError::HeapFull)?;
        self.user_strings.extend_from_slice(blob);
        self.string_offsets.push(offset);
        Ok(offset)
    }

    /// Declare an external method and return its `MemberRef` token.
    pub fn add_method_ref(&mut self, signature: MethodSignature) -> u32 {
        self.member_refs.push(Arc::new(signature));
        token(MEMBER_REF_TABLE, self.member_refs.len())
    }

    /// Declare a method body and return its `MethodDef` token.
    pub fn add_method_def(&mut self, body: MethodBody) -> u32 {
        self.method_defs.push(body);
        token(METHOD_DEF_TABLE, self.method_defs.len())
    }

    pub fn user_string_heap(&self) -> &[u8] {
        &self.user_strings
    }
}

impl MetadataResolver for MetadataImage {
    fn user_string_blob(&self, token: u16) -> Option<&[u8]> {
        self.string_offsets.binary_search(&token).ok()?;
        self.user_strings.get(usize::from(token)..)
    }

    fn resolve_method(&self, token: u32) -> Option<MethodTarget> {
        let row = (token & ROW_MASK) as usize;
        let index = row.checked_sub(1)?;
        match (token >> 24) as u8 {
            METHOD_DEF_TABLE => self.method_defs.get(index).cloned().map(MethodTarget::Body),
            MEMBER_REF_TABLE => self
                .member_refs
                .get(index)
                .map(|signature| MethodTarget::External(Arc::clone(signature))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ValueKind, decode_user_string};

    #[test]
    fn user_string_layout() {
        let mut image = MetadataImage::new();
        let token = image.add_user_string("hi").unwrap();
        assert_eq!(token, 1);
        assert_eq!(image.user_string_heap(), &[0, 5, b'h', 0, b'i', 0, 0]);

        let next = image.add_user_string("").unwrap();
        assert_eq!(next, 7);
        assert_eq!(image.user_string_blob(next), Some(&[1u8, 0][..]));
    }

    #[test]
    fn terminal_flag() {
        let mut image = MetadataImage::new();
        let plain = image.add_user_string("ab").unwrap();
        let quoted = image.add_user_string("it's").unwrap();
        let wide = image.add_user_string("é").unwrap();
        let blob = |token| image.user_string_blob(token).unwrap().to_vec();
        assert_eq!(*blob(plain).get(5).unwrap(), 0);
        assert_eq!(*blob(quoted).get(9).unwrap(), 1);
        assert_eq!(blob(wide), vec![3, 0xE9, 0x00, 0]);
    }

    #[test]
    fn encoded_strings_decode() {
        let mut image = MetadataImage::new();
        for text in ["hello", "", "λ", "line\nbreak"] {
            let token = image.add_user_string(text).unwrap();
            let blob = image.user_string_blob(token).unwrap();
            assert_eq!(decode_user_string(token, blob).as_deref(), Ok(text));
        }
    }

    #[test]
    fn long_strings_are_rejected() {
        let mut image = MetadataImage::new();
        assert!(image.add_user_string(&"x".repeat(63)).is_ok());
        assert_eq!(
            image.add_user_string(&"x".repeat(64)),
            Err(MetadataError::StringTooLong { len: 64 })
        );
    }

    #[test]
    fn unknown_string_tokens() {
        let mut image = MetadataImage::new();
        let token = image.add_user_string("abc").unwrap();
        assert!(image.user_string_blob(0).is_none());
        assert!(image.user_string_blob(token + 1).is_none());
        assert!(image.user_string_blob(500).is_none());
    }

    #[test]
    fn method_tokens() {
        let mut image = MetadataImage::new();
        let signature =
            MethodSignature::new("System.Console", "WriteLine", None, &[ValueKind::Int32]);
        let member_ref = image.add_method_ref(signature.clone());
        let body = MethodBody::new(vec![0x2A], 1, 0);
        let method_def = image.add_method_def(body.clone());

        assert_eq!(member_ref, 0x0A00_0001);
        assert_eq!(method_def, 0x0600_0001);
        assert_eq!(
            image.resolve_method(member_ref),
            Some(MethodTarget::External(Arc::new(signature)))
        );
        assert_eq!(image.resolve_method(method_def), Some(MethodTarget::Body(body)));
        assert_eq!(image.resolve_method(0x0A00_0000), None);
        assert_eq!(image.resolve_method(0x0A00_0002), None);
        assert_eq!(image.resolve_method(0x0200_0001), None);
    }
}
