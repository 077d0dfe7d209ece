//! Formatters which can read and write object files.
//!
//! The [`ObjFileFormat`] trait describes an implementation of reading/writing object files.
//! This module provides two implementations of the trait:
//! - [`BinaryFormat`]: A binary representation of object file data (image and labels)
//! - [`TextFormat`]: A text representation of object file data (image and labels)
//!
//! To get the bare program image that a CHIP-8 interpreter would load, use [`ObjectFile::as_bytes`].

use super::{ObjectFile, SymbolTable};
use crate::isa::PROGRAM_START;

/// A trait defining object file formats.
pub trait ObjFileFormat {
    /// Representation of the serialized format.
    ///
    /// For binary formats, `[u8]` should be used.
    /// For text-based formats,`str` should be used.
    type Stream: ToOwned + ?Sized;
    /// Serializes into the stream format.
    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned;
    /// Deserializes from the stream format, returning `None`
    /// if an error occurred during deserialization.
    fn deserialize(i: &Self::Stream) -> Option<ObjectFile>;
}

/// A binary format of object file data.
pub struct BinaryFormat;

const BFMT_MAGIC: &[u8] = b"ch8\x21\x10";
const BFMT_VER: &[u8] = b"\x00\x02";
impl ObjFileFormat for BinaryFormat {
    type Stream = [u8];

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        // The header consists of the magic number and the version (2 bytes).
        //
        // Data is divided into chunks, which start with one of:
        // - 0x00: program image (length as 2 bytes, then the image)
        // - 0x01: label table (label count as 2 bytes, then for each label:
        //         address as 2 bytes, name length as 2 bytes, then the name)
        //
        // All integers are little-endian.
        let mut bytes = BFMT_MAGIC.to_vec();
        bytes.extend_from_slice(BFMT_VER);

        bytes.push(0x00);
        bytes.extend(u16::to_le_bytes(o.image.len() as u16));
        bytes.extend_from_slice(&o.image);

        if let Some(sym) = &o.sym {
            bytes.push(0x01);
            bytes.extend(u16::to_le_bytes(sym.len() as u16));
            for (label, addr) in sym.label_iter() {
                bytes.extend(u16::to_le_bytes(addr));
                bytes.extend(u16::to_le_bytes(label.len() as u16));
                bytes.extend_from_slice(label.as_bytes());
            }
        }

        bytes
    }

    fn deserialize(mut vec: &Self::Stream) -> Option<ObjectFile> {
        let mut image = None;
        let mut sym = None;

        vec = vec.strip_prefix(BFMT_MAGIC)?
            .strip_prefix(BFMT_VER)?;

        while let Some((ident_byte, rest)) = vec.split_first() {
            vec = rest;
            match ident_byte {
                0x00 => {
                    let len = u16::from_le_bytes(take::<2>(&mut vec)?);
                    let data = take_slice(&mut vec, usize::from(len))?;
                    if image.replace(data.to_vec()).is_some() { return None; }
                },
                0x01 => {
                    let count = u16::from_le_bytes(take::<2>(&mut vec)?);
                    let mut table = SymbolTable::default();
                    for _ in 0..count {
                        let addr  = u16::from_le_bytes(take::<2>(&mut vec)?);
                        let len   = u16::from_le_bytes(take::<2>(&mut vec)?);
                        let label = std::str::from_utf8(take_slice(&mut vec, usize::from(len))?).ok()?;
                        table.insert(label, addr);
                    }
                    if sym.replace(table).is_some() { return None; }
                },
                _ => return None
            }
        }

        let mut obj = ObjectFile::from_bytes(image?)?;
        obj.sym = sym;
        Some(obj)
    }
}

fn take<const N: usize>(data: &mut &[u8]) -> Option<[u8; N]> {
    take_slice(data, N)
        .and_then(|slice| <[_; N]>::try_from(slice).ok())
}
fn take_slice<'a>(data: &mut &'a [u8], n: usize) -> Option<&'a [u8]> {
    if n > data.len() { return None; }
    let (left, right) = data.split_at(n);
    *data = right;
    Some(left)
}

/// A text-based format of object file data.
///
/// The image is written as one address/word pair per line,
/// followed by the label table (if the object file has one).
pub struct TextFormat;

const TFMT_MAGIC: &str = "CHIP-8 OBJ FILE";
const TABLE_DIV: &str = " | ";

impl ObjFileFormat for TextFormat {
    type Stream = str;

    fn serialize(o: &ObjectFile) -> <Self::Stream as ToOwned>::Owned {
        // ```text
        // CHIP-8 OBJ FILE
        //
        // .TEXT
        // 0200 632A
        // 0202 A20C
        // ...
        //
        // .SYMBOL
        // ADDR | LABEL
        // 0200 | start
        // ...
        // // Support for comments, as well.
        // ```
        //
        // If the image has an odd length, its last line holds a single byte.
        fn _ser(o: &ObjectFile) -> Result<String, std::fmt::Error> {
            use std::fmt::Write;
            let mut buf = String::new();

            writeln!(buf, "{TFMT_MAGIC}")?;
            writeln!(buf)?;

            writeln!(buf, ".TEXT")?;
            for (chunk, addr) in o.image.chunks(2).zip((PROGRAM_START..).step_by(2)) {
                match *chunk {
                    [hi, lo] => writeln!(buf, "{addr:04X} {hi:02X}{lo:02X}")?,
                    [b] => writeln!(buf, "{addr:04X} {b:02X}")?,
                    _ => {},
                }
            }
            writeln!(buf)?;

            if let Some(sym) = &o.sym {
                writeln!(buf, ".SYMBOL")?;

                let mut labels: Vec<_> = sym.label_iter().collect();
                labels.sort_by_key(|&(label, addr)| (addr, label));

                writeln!(buf, "ADDR{TABLE_DIV}LABEL")?;
                for (label, addr) in labels {
                    writeln!(buf, "{addr:04X}{TABLE_DIV}{label}")?;
                }
            }

            Ok(buf)
        }

        _ser(o).unwrap_or_default()
    }

    fn deserialize(string: &Self::Stream) -> Option<ObjectFile> {
        let mut lines = string.trim().lines()
            .map(|l| l.split_once("//").map_or(l, |(left, _)| left).trim())
            .filter(|l| !l.is_empty());
        if lines.next() != Some(TFMT_MAGIC) { return None; }

        let mut image = vec![];
        let mut sym = None;
        let mut section = None;
        for line in lines {
            if line.starts_with('.') {
                if line == ".SYMBOL" { sym.get_or_insert_with(SymbolTable::default); }
                section = Some(line);
                continue;
            }

            match section? {
                ".TEXT" => {
                    let (addr, data) = line.split_once(' ')?;
                    let expected = usize::from(PROGRAM_START) + image.len();
                    if usize::from(hex2u16(addr, 4)?) != expected || image.len() % 2 != 0 { return None; }
                    match data.len() {
                        4 => image.extend(hex2u16(data, 4)?.to_be_bytes()),
                        2 => image.push(hex2u16(data, 2)? as u8),
                        _ => return None,
                    }
                },
                ".SYMBOL" => {
                    let (addr, label) = line.split_once(TABLE_DIV.trim())?;
                    let (addr, label) = (addr.trim(), label.trim());
                    if (addr, label) == ("ADDR", "LABEL") { continue; }

                    sym.as_mut()?.insert(label, hex2u16(addr, 4)?);
                },
                _ => return None,
            }
        }

        let mut obj = ObjectFile::from_bytes(image)?;
        obj.sym = sym;
        Some(obj)
    }
}

fn hex2u16(s: &str, len: usize) -> Option<u16> {
    match s.len() == len {
        true => u16::from_str_radix(s, 16).ok(),
        false => None
    }
}

#[cfg(test)]
mod tests {
    use crate::asm::{assemble_src, ObjectFile};

    use super::{BinaryFormat, ObjFileFormat, TextFormat};

    #[test]
    fn test_text_layout() {
        let obj = assemble_src("start: mov reg[3], 0x2A\njmp start").unwrap();
        let text = TextFormat::serialize(&obj);
        assert_eq!(text, "CHIP-8 OBJ FILE\n\n.TEXT\n0200 632A\n0202 1200\n\n.SYMBOL\nADDR | LABEL\n0200 | start\n");
    }

    #[test]
    fn test_odd_image() {
        let obj = ObjectFile::from_bytes(vec![0x00, 0xE0, 0x12]).unwrap();

        let text = TextFormat::serialize(&obj);
        assert!(text.contains("0202 12\n"));
        assert_eq!(TextFormat::deserialize(&text), Some(obj.clone()));
        assert_eq!(BinaryFormat::deserialize(&BinaryFormat::serialize(&obj)), Some(obj));
    }

    #[test]
    fn test_reject_malformed() {
        assert_eq!(BinaryFormat::deserialize(b"not an object file"), None);
        assert_eq!(TextFormat::deserialize("OBJ FILE\n.TEXT\n0200 00E0"), None);

        // Addresses out of sequence
        assert_eq!(TextFormat::deserialize("CHIP-8 OBJ FILE\n.TEXT\n0200 00E0\n0208 00EE"), None);

        // Truncated image chunk
        let obj = assemble_src("cls\nret").unwrap();
        let ser = BinaryFormat::serialize(&obj);
        assert_eq!(BinaryFormat::deserialize(&ser[..10]), None);

        // Truncated label table
        let obj = assemble_src("start: cls").unwrap();
        let ser = BinaryFormat::serialize(&obj);
        assert_eq!(BinaryFormat::deserialize(&ser[..ser.len() - 1]), None);
        assert_eq!(BinaryFormat::deserialize(&ser), Some(obj));

        // Comments are allowed
        let text = "CHIP-8 OBJ FILE // header\n.TEXT\n0200 00E0 // clear\n";
        assert_eq!(TextFormat::deserialize(text).map(|o| o.into_bytes()), Some(vec![0x00, 0xE0]));
    }
}
