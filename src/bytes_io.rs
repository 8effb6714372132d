//! Fixed-length strings, length-prefixed XOR strings, and little-endian
//! scalar helpers shared by the IPF and IES codecs.

use std::io::{self, Read, Write};

use crate::error::IesError;

/// XOR obfuscation key used throughout IES strings.
pub const XOR_KEY: u8 = 0x01;

pub fn xor_bytes(buf: &mut [u8], key: u8) {
    for b in buf.iter_mut() {
        *b ^= key;
    }
}

/// Write the UTF-8 bytes of `s`, NUL-padded to exactly `n` bytes. Fails if
/// `s` doesn't fit.
pub fn write_fixed_string<W: Write>(w: &mut W, s: &str, n: usize) -> Result<(), IesError> {
    let bytes = s.as_bytes();
    if bytes.len() > n {
        return Err(IesError::InvalidFormat(format!(
            "string {s:?} does not fit in {n} bytes"
        )));
    }
    let mut buf = vec![0u8; n];
    buf[..bytes.len()].copy_from_slice(bytes);
    w.write_all(&buf)?;
    Ok(())
}

/// As [`write_fixed_string`], then XOR every byte of the fixed-width buffer
/// (so the NUL padding decrypts back to `XOR_KEY` and trims to nothing).
pub fn write_xored_fixed_string<W: Write>(w: &mut W, s: &str, n: usize) -> Result<(), IesError> {
    let bytes = s.as_bytes();
    if bytes.len() > n {
        return Err(IesError::InvalidFormat(format!(
            "string {s:?} does not fit in {n} bytes"
        )));
    }
    let mut buf = vec![0u8; n];
    buf[..bytes.len()].copy_from_slice(bytes);
    xor_bytes(&mut buf, XOR_KEY);
    w.write_all(&buf)?;
    Ok(())
}

/// Read `n` bytes, XOR them with [`XOR_KEY`], and right-trim trailing
/// `XOR_KEY` fill bytes (the decrypted NUL padding).
pub fn read_xored_fixed_string<R: Read>(r: &mut R, n: usize) -> io::Result<String> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    xor_bytes(&mut buf, XOR_KEY);
    while buf.last() == Some(&XOR_KEY) {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `u16 len`, then `s` XORed with [`XOR_KEY`] — no padding, no trimming.
pub fn write_xored_lp_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    let mut bytes = s.as_bytes().to_vec();
    w.write_all(&(bytes.len() as u16).to_le_bytes())?;
    xor_bytes(&mut bytes, XOR_KEY);
    w.write_all(&bytes)?;
    Ok(())
}

/// `u16 len`, then `len` bytes XORed with [`XOR_KEY`].
pub fn read_xored_lp_string<R: Read>(r: &mut R) -> io::Result<String> {
    let mut len_buf = [0u8; 2];
    r.read_exact(&mut len_buf)?;
    let len = u16::from_le_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    xor_bytes(&mut buf, XOR_KEY);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_i32<R: Read>(r: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn read_f32<R: Read>(r: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

/// Read `len` raw bytes and normalize backslashes to forward slashes,
/// matching IPF's path convention.
pub fn read_ascii_path<R: Read>(r: &mut R, len: usize) -> io::Result<String> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let s = String::from_utf8_lossy(&buf).into_owned();
    Ok(s.replace('\\', "/"))
}
