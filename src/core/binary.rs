// src/core/binary.rs

//! Word-size detection for interpreter binaries.
//!
//! Looks only at executable headers (PE, ELF, Mach-O); nothing is executed.

use crate::models::Bitness;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

const PE_MACHINE_I386: u16 = 0x014c;
const PE_MACHINE_ARMNT: u16 = 0x01c4;
const PE_MACHINE_AMD64: u16 = 0x8664;
const PE_MACHINE_ARM64: u16 = 0xaa64;

const MACHO_MAGIC_32: u32 = 0xfeed_face;
const MACHO_MAGIC_64: u32 = 0xfeed_facf;
const MACHO_FAT_MAGIC: u32 = 0xcafe_babe;
const MACHO_CPU_ARCH_ABI64: u32 = 0x0100_0000;

/// Determines whether the binary at `path` is 32- or 64-bit.
///
/// Returns `None` if the file is unreadable or is not an executable format we recognize
/// (scripts, shims, truncated files).
pub fn detect_bits(path: &Path) -> Option<Bitness> {
    match read_bits(path) {
        Ok(bits) => bits,
        Err(e) => {
            log::debug!("Could not inspect '{}': {}", path.display(), e);
            None
        }
    }
}

fn read_bits(path: &Path) -> io::Result<Option<Bitness>> {
    let mut file = File::open(path)?;
    let mut head = [0u8; 64];
    let read = read_up_to(&mut file, &mut head)?;
    let head = head.get(..read).unwrap_or_default();

    if head.starts_with(b"MZ") {
        return pe_bits(&mut file, head);
    }
    if head.starts_with(b"\x7fELF") {
        return Ok(match head.get(4) {
            Some(1) => Some(Bitness::Bits32),
            Some(2) => Some(Bitness::Bits64),
            _ => None,
        });
    }
    Ok(macho_bits(head))
}

fn pe_bits(file: &mut File, head: &[u8]) -> io::Result<Option<Bitness>> {
    let Some(offset) = le_u32(head, 0x3c) else {
        return Ok(None);
    };
    file.seek(SeekFrom::Start(u64::from(offset)))?;
    let mut header = [0u8; 6];
    if read_up_to(file, &mut header)? < header.len() || !header.starts_with(b"PE\0\0") {
        return Ok(None);
    }
    Ok(match le_u16(&header, 4) {
        Some(PE_MACHINE_I386) | Some(PE_MACHINE_ARMNT) => Some(Bitness::Bits32),
        Some(PE_MACHINE_AMD64) | Some(PE_MACHINE_ARM64) => Some(Bitness::Bits64),
        _ => None,
    })
}

fn macho_bits(head: &[u8]) -> Option<Bitness> {
    let magic_le = le_u32(head, 0)?;
    let magic_be = magic_le.swap_bytes();
    if magic_le == MACHO_MAGIC_32 || magic_be == MACHO_MAGIC_32 {
        return Some(Bitness::Bits32);
    }
    if magic_le == MACHO_MAGIC_64 || magic_be == MACHO_MAGIC_64 {
        return Some(Bitness::Bits64);
    }
    if magic_be == MACHO_FAT_MAGIC {
        // Universal binary: judge by the first architecture slice.
        let cpu_type = le_u32(head, 8)?.swap_bytes();
        return Some(if cpu_type & MACHO_CPU_ARCH_ABI64 != 0 {
            Bitness::Bits64
        } else {
            Bitness::Bits32
        });
    }
    None
}

fn read_up_to(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let Some(rest) = buf.get_mut(total..) else {
            break;
        };
        match file.read(rest)? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let slice = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([*slice.first()?, *slice.get(1)?]))
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let slice: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(slice))
}

/// Header fixtures shared with other modules' tests.
#[cfg(test)]
pub(crate) mod fixtures {
    /// A minimal PE image header for the given machine type.
    pub(crate) fn pe_image(machine: u16) -> Vec<u8> {
        let mut image = vec![0u8; 0x80];
        image[0] = b'M';
        image[1] = b'Z';
        image[0x3c..0x40].copy_from_slice(&0x40u32.to_le_bytes());
        image[0x40..0x44].copy_from_slice(b"PE\0\0");
        image[0x44..0x46].copy_from_slice(&machine.to_le_bytes());
        image
    }

    /// A minimal ELF identification block; class 1 is 32-bit, 2 is 64-bit.
    pub(crate) fn elf_image(class: u8) -> Vec<u8> {
        let mut image = vec![0u8; 64];
        image[..4].copy_from_slice(b"\x7fELF");
        image[4] = class;
        image
    }
}

// MARK: --- UNIT TESTS ---
