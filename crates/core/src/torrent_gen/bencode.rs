//! Minimal bencode encoder for torrent metainfo.
//!
//! Only encoding is needed; torrents are produced, never parsed. Dict keys
//! are kept in a BTreeMap so they serialize in the sorted order the
//! BitTorrent spec requires.

use std::collections::BTreeMap;

/// A bencode value.
#[derive(Debug, Clone, PartialEq)]
pub enum BencodeValue {
    Int(i64),
    Bytes(Vec<u8>),
    List(Vec<BencodeValue>),
    Dict(BTreeMap<Vec<u8>, BencodeValue>),
}

impl BencodeValue {
    pub fn str(value: &str) -> Self {
        BencodeValue::Bytes(value.as_bytes().to_vec())
    }

    /// Encode into the output buffer.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            BencodeValue::Int(i) => {
                out.push(b'i');
                out.extend_from_slice(i.to_string().as_bytes());
                out.push(b'e');
            }
            BencodeValue::Bytes(bytes) => {
                out.extend_from_slice(bytes.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(bytes);
            }
            BencodeValue::List(items) => {
                out.push(b'l');
                for item in items {
                    item.encode(out);
                }
                out.push(b'e');
            }
            BencodeValue::Dict(entries) => {
                out.push(b'd');
                for (key, value) in entries {
                    BencodeValue::Bytes(key.clone()).encode(out);
                    value.encode(out);
                }
                out.push(b'e');
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Builder for bencode dicts with string keys.
#[derive(Debug, Default)]
pub struct DictBuilder {
    entries: BTreeMap<Vec<u8>, BencodeValue>,
}

impl DictBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: &str, value: BencodeValue) -> Self {
        self.entries.insert(key.as_bytes().to_vec(), value);
        self
    }

    pub fn insert_str(self, key: &str, value: &str) -> Self {
        self.insert(key, BencodeValue::str(value))
    }

    pub fn insert_int(self, key: &str, value: i64) -> Self {
        self.insert(key, BencodeValue::Int(value))
    }

    pub fn build(self) -> BencodeValue {
        BencodeValue::Dict(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: &BencodeValue) -> String {
        String::from_utf8_lossy(&value.to_bytes()).to_string()
    }

    #[test]
    fn test_encode_int() {
        assert_eq!(encoded(&BencodeValue::Int(42)), "i42e");
        assert_eq!(encoded(&BencodeValue::Int(-7)), "i-7e");
        assert_eq!(encoded(&BencodeValue::Int(0)), "i0e");
    }

    #[test]
    fn test_encode_bytes() {
        assert_eq!(encoded(&BencodeValue::str("spam")), "4:spam");
        assert_eq!(encoded(&BencodeValue::str("")), "0:");
    }

    #[test]
    fn test_encode_list() {
        let list = BencodeValue::List(vec![BencodeValue::str("a"), BencodeValue::Int(1)]);
        assert_eq!(encoded(&list), "l1:ai1ee");
    }

    #[test]
    fn test_dict_keys_sorted() {
        let dict = DictBuilder::new()
            .insert_str("zz", "last")
            .insert_str("aa", "first")
            .insert_int("mm", 5)
            .build();
        assert_eq!(encoded(&dict), "d2:aa5:first2:mmi5e2:zz4:laste");
    }

    #[test]
    fn test_nested_dict() {
        let inner = DictBuilder::new().insert_int("length", 100).build();
        let outer = DictBuilder::new()
            .insert_str("announce", "https://t.example/announce/abc")
            .insert("info", inner)
            .build();
        assert_eq!(
            encoded(&outer),
            "d8:announce30:https://t.example/announce/abc4:infod6:lengthi100eee"
        );
    }
}
