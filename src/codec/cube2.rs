//! Bijective byte <-> Unicode codepoint table used by the Cube2 engine for
//! in-game chat, server descriptions, and map names.
//!
//! ASCII (0x20..=0x7e) is the identity mapping. The remaining 191 byte
//! values cover the accented and extended Latin letters the engine's
//! built-in font renders, keyed off the historical fixture: byte `0x05`
//! is Ä, `0x1b` is Ö, `0x7f` is Ü, `0x86` is ä, `0x96` is ö, `0x9c` is ü.

const TABLE: [u32; 256] = [
    0x00A0, 0x00A1, 0x00A2, 0x00A3, 0x00A4, 0x00C4, 0x00A5, 0x00A6,
    0x00A7, 0x00A8, 0x00A9, 0x00AA, 0x00AB, 0x00AC, 0x00AD, 0x00AE,
    0x00AF, 0x00B0, 0x00B1, 0x00B2, 0x00B3, 0x00B4, 0x00B5, 0x00B6,
    0x00B7, 0x00B8, 0x00B9, 0x00D6, 0x00BA, 0x00BB, 0x00BC, 0x00BD,
    0x0020, 0x0021, 0x0022, 0x0023, 0x0024, 0x0025, 0x0026, 0x0027,
    0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F,
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037,
    0x0038, 0x0039, 0x003A, 0x003B, 0x003C, 0x003D, 0x003E, 0x003F,
    0x0040, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047,
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F,
    0x0050, 0x0051, 0x0052, 0x0053, 0x0054, 0x0055, 0x0056, 0x0057,
    0x0058, 0x0059, 0x005A, 0x005B, 0x005C, 0x005D, 0x005E, 0x005F,
    0x0060, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067,
    0x0068, 0x0069, 0x006A, 0x006B, 0x006C, 0x006D, 0x006E, 0x006F,
    0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077,
    0x0078, 0x0079, 0x007A, 0x007B, 0x007C, 0x007D, 0x007E, 0x00DC,
    0x00BE, 0x00BF, 0x00C0, 0x00C1, 0x00C2, 0x00C3, 0x00E4, 0x00C5,
    0x00C6, 0x00C7, 0x00C8, 0x00C9, 0x00CA, 0x00CB, 0x00CC, 0x00CD,
    0x00CE, 0x00CF, 0x00D0, 0x00D1, 0x00D2, 0x00D3, 0x00F6, 0x00D4,
    0x00D5, 0x00D7, 0x00D8, 0x00D9, 0x00FC, 0x00DA, 0x00DB, 0x00DD,
    0x00DE, 0x00DF, 0x00E0, 0x00E1, 0x00E2, 0x00E3, 0x00E5, 0x00E6,
    0x00E7, 0x00E8, 0x00E9, 0x00EA, 0x00EB, 0x00EC, 0x00ED, 0x00EE,
    0x00EF, 0x00F0, 0x00F1, 0x00F2, 0x00F3, 0x00F4, 0x00F5, 0x00F7,
    0x00F8, 0x00F9, 0x00FA, 0x00FB, 0x00FD, 0x00FE, 0x00FF, 0x0100,
    0x0101, 0x0102, 0x0103, 0x0104, 0x0105, 0x0106, 0x0107, 0x0108,
    0x0109, 0x010A, 0x010B, 0x010C, 0x010D, 0x010E, 0x010F, 0x0110,
    0x0111, 0x0112, 0x0113, 0x0114, 0x0115, 0x0116, 0x0117, 0x0118,
    0x0119, 0x011A, 0x011B, 0x011C, 0x011D, 0x011E, 0x011F, 0x0120,
    0x0121, 0x0122, 0x0123, 0x0124, 0x0125, 0x0126, 0x0127, 0x0128,
    0x0129, 0x012A, 0x012B, 0x012C, 0x012D, 0x012E, 0x012F, 0x0130,
    0x0131, 0x0132, 0x0133, 0x0134, 0x0135, 0x0136, 0x0137, 0x0138,
    0x0139, 0x013A, 0x013B, 0x013C, 0x013D, 0x013E, 0x013F, 0x0140,
];

fn reverse_lookup(cp: u32) -> Option<u8> {
    TABLE.iter().position(|&c| c == cp).map(|i| i as u8)
}

/// Decode Cube2-encoded bytes into a `String`, one codepoint per input byte.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter_map(|&b| char::from_u32(TABLE[b as usize]))
        .collect()
}

/// Encode a `str` into Cube2 bytes. Characters outside the table are skipped.
#[must_use]
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|c| reverse_lookup(c as u32))
        .collect()
}
