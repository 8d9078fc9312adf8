use crate::Result;
use bytes::{Buf, BufMut};
use ohno::bail;

/// Size of the store header in bytes
pub const HEADER_LEN: u64 = 16;

/// Size of one variable table entry in bytes
pub const VARIABLE_ENTRY_LEN: u64 = 110;

/// Size of one file table entry in bytes
pub const FILE_ENTRY_LEN: u64 = 62;

/// Size of one data cell in bytes
pub const CELL_LEN: u64 = 8;

/// Width of the block name field, in UTF-16 code units
pub const BLOCK_NAME_UNITS: usize = 20;

/// Width of the description field, in UTF-16 code units
pub const DESCRIPTION_UNITS: usize = 25;

/// Width of the file name field, in UTF-16 code units
pub const FILE_NAME_UNITS: usize = 25;

/// Number of rows in each of the two tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    pub variables: u32,
    pub files: u32,
}

/// Byte positions of every region of a store file with a given pair of capacities.
///
/// Every stored offset is only meaningful for the capacities it was computed with, so the
/// capacities are fixed at construction and a grown store gets a fresh `Layout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    capacities: Capacities,
}

impl Layout {
    #[must_use]
    pub const fn new(capacities: Capacities) -> Self {
        Self { capacities }
    }

    #[must_use]
    pub const fn capacities(&self) -> Capacities {
        self.capacities
    }

    #[must_use]
    pub const fn variable_entry_offset(index: u32) -> u64 {
        HEADER_LEN + index as u64 * VARIABLE_ENTRY_LEN
    }

    #[must_use]
    pub const fn file_table_start(&self) -> u64 {
        HEADER_LEN + self.capacities.variables as u64 * VARIABLE_ENTRY_LEN
    }

    #[must_use]
    pub const fn file_entry_offset(&self, slot: u32) -> u64 {
        self.file_table_start() + slot as u64 * FILE_ENTRY_LEN
    }

    #[must_use]
    pub const fn data_start(&self) -> u64 {
        self.file_table_start() + self.capacities.files as u64 * FILE_ENTRY_LEN
    }

    /// Distance between the same variable's cells in consecutive file slots.
    #[must_use]
    pub const fn row_stride(&self) -> u64 {
        CELL_LEN * self.capacities.variables as u64
    }

    /// The stored starting offset of the variable in the given column: its cell in slot 0.
    #[must_use]
    pub const fn variable_offset(&self, column: u32) -> u64 {
        self.data_start() + column as u64 * CELL_LEN
    }

    #[must_use]
    pub const fn row_offset(&self, slot: u32) -> u64 {
        self.data_start() + slot as u64 * self.row_stride()
    }

    /// Where the value of the variable starting at `variable_offset` lives for file `slot`.
    #[must_use]
    pub const fn cell_offset(&self, variable_offset: u64, slot: u32) -> u64 {
        variable_offset + slot as u64 * self.row_stride()
    }

    /// Position of a variable's cell within a row buffer.
    #[must_use]
    pub const fn row_position(&self, variable_offset: u64) -> usize {
        (variable_offset - self.data_start()) as usize
    }

    /// The column a stored starting offset refers to, if it is a valid one for this layout.
    #[must_use]
    pub const fn column_of(&self, variable_offset: u64) -> Option<u32> {
        let start = self.data_start();
        if variable_offset < start || (variable_offset - start) % CELL_LEN != 0 {
            return None;
        }

        let column = (variable_offset - start) / CELL_LEN;
        if column < self.capacities.variables as u64 {
            Some(column as u32)
        } else {
            None
        }
    }

    /// Full size of a store file: header, both tables and the data matrix.
    #[must_use]
    pub const fn total_len(&self) -> u64 {
        self.data_start() + self.capacities.files as u64 * self.row_stride()
    }
}

/// The fixed-size record at the start of every store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub capacities: Capacities,
    pub variables_used: u32,
    pub files_used: u32,
}

impl Header {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN as usize);
        buf.put_i32(to_i32(self.capacities.variables));
        buf.put_i32(to_i32(self.variables_used));
        buf.put_i32(to_i32(self.capacities.files));
        buf.put_i32(to_i32(self.files_used));
        buf
    }

    /// Decodes and sanity-checks a header.
    ///
    /// # Errors
    ///
    /// Fails if the buffer is short, a count is negative or zero where a capacity is expected,
    /// or a used count exceeds its capacity.
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN as usize {
            bail!("store header is truncated: {} of {HEADER_LEN} bytes", bytes.len());
        }

        let variable_capacity = bytes.get_i32();
        let variables_used = bytes.get_i32();
        let file_capacity = bytes.get_i32();
        let files_used = bytes.get_i32();

        if variable_capacity <= 0 || file_capacity <= 0 {
            bail!("store header has invalid capacities: {variable_capacity} variables, {file_capacity} files");
        }

        if !(0..=variable_capacity).contains(&variables_used) || !(0..=file_capacity).contains(&files_used) {
            bail!(
                "store header usage out of range: {variables_used}/{variable_capacity} variables, {files_used}/{file_capacity} files"
            );
        }

        Ok(Self {
            capacities: Capacities {
                variables: variable_capacity.unsigned_abs(),
                files: file_capacity.unsigned_abs(),
            },
            variables_used: variables_used.unsigned_abs(),
            files_used: files_used.unsigned_abs(),
        })
    }
}

/// One row of the variable table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub pdg: [i32; 3],
    pub block: String,
    pub description: String,
    pub offset: u64,
}

impl VariableEntry {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(VARIABLE_ENTRY_LEN as usize);
        for code in self.pdg {
            buf.put_i32(code);
        }
        put_text(&mut buf, &self.block, BLOCK_NAME_UNITS);
        put_text(&mut buf, &self.description, DESCRIPTION_UNITS);
        buf.put_i64(i64::try_from(self.offset).unwrap_or(i64::MAX));
        buf
    }

    /// # Errors
    ///
    /// Fails if the buffer is short or the stored offset is negative.
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < VARIABLE_ENTRY_LEN as usize {
            bail!("variable entry is truncated: {} of {VARIABLE_ENTRY_LEN} bytes", bytes.len());
        }

        let pdg = [bytes.get_i32(), bytes.get_i32(), bytes.get_i32()];
        let block = get_text(&mut bytes, BLOCK_NAME_UNITS);
        let description = get_text(&mut bytes, DESCRIPTION_UNITS);
        let offset = bytes.get_i64();
        let Ok(offset) = u64::try_from(offset) else {
            bail!("variable entry for block '{block}' has a negative offset {offset}");
        };

        Ok(Self {
            pdg,
            block,
            description,
            offset,
        })
    }
}

/// One row of the file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Source modification time, in milliseconds since the Unix epoch
    pub last_modified: i64,
    pub name: String,
    pub slot: u32,
}

impl FileEntry {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FILE_ENTRY_LEN as usize);
        buf.put_i64(self.last_modified);
        put_text(&mut buf, &self.name, FILE_NAME_UNITS);
        buf.put_i32(to_i32(self.slot));
        buf
    }

    /// # Errors
    ///
    /// Fails if the buffer is short or the stored slot is negative.
    pub fn decode(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FILE_ENTRY_LEN as usize {
            bail!("file entry is truncated: {} of {FILE_ENTRY_LEN} bytes", bytes.len());
        }

        let last_modified = bytes.get_i64();
        let name = get_text(&mut bytes, FILE_NAME_UNITS);
        let slot = bytes.get_i32();
        let Ok(slot) = u32::try_from(slot) else {
            bail!("file entry for '{name}' has a negative slot {slot}");
        };

        Ok(Self {
            last_modified,
            name,
            slot,
        })
    }
}

/// Cuts `text` to at most `units` UTF-16 code units, the way it reads back from a text field.
#[must_use]
pub fn truncate_units(text: &str, units: usize) -> String {
    let encoded: Vec<u16> = text.encode_utf16().take(units).collect();
    String::from_utf16_lossy(&encoded)
}

#[must_use]
pub fn fits_units(text: &str, units: usize) -> bool {
    text.encode_utf16().count() <= units
}

/// Encodes a row of cells.
#[must_use]
pub fn encode_cells(values: &[f64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * CELL_LEN as usize);
    for value in values {
        buf.put_f64(*value);
    }
    buf
}

#[must_use]
pub fn decode_cell(mut bytes: &[u8]) -> f64 {
    bytes.get_f64()
}

fn put_text(buf: &mut Vec<u8>, text: &str, units: usize) {
    let mut written = 0;
    for unit in text.encode_utf16().take(units) {
        buf.put_u16(unit);
        written += 1;
    }
    buf.put_bytes(0, (units - written) * 2);
}

fn get_text(bytes: &mut &[u8], units: usize) -> String {
    let encoded: Vec<u16> = (0..units).map(|_| bytes.get_u16()).filter(|unit| *unit != 0).collect();
    String::from_utf16_lossy(&encoded)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::model::SENTINEL;

    const DEFAULT: Capacities = Capacities {
        variables: 150,
        files: 2000,
    };

    #[test]
    fn test_region_starts_for_default_capacities() {
        let layout = Layout::new(DEFAULT);
        assert_eq!(layout.file_table_start(), 16 + 150 * 110);
        assert_eq!(layout.data_start(), 16 + 150 * 110 + 2000 * 62);
        assert_eq!(layout.row_stride(), 1200);
        assert_eq!(layout.total_len(), layout.data_start() + 2000 * 1200);
    }

    #[test]
    fn test_cell_addressing() {
        let layout = Layout::new(DEFAULT);
        let offset = layout.variable_offset(3);
        assert_eq!(offset, layout.data_start() + 24);
        assert_eq!(layout.cell_offset(offset, 0), offset);
        assert_eq!(layout.cell_offset(offset, 5), offset + 5 * 1200);
        assert_eq!(layout.row_offset(5) + layout.row_position(offset) as u64, layout.cell_offset(offset, 5));
        assert_eq!(layout.file_entry_offset(2), layout.file_table_start() + 124);
        assert_eq!(Layout::variable_entry_offset(2), 16 + 220);
    }

    #[test]
    fn test_column_of() {
        let layout = Layout::new(Capacities { variables: 4, files: 2 });
        assert_eq!(layout.column_of(layout.variable_offset(0)), Some(0));
        assert_eq!(layout.column_of(layout.variable_offset(3)), Some(3));
        assert_eq!(layout.column_of(layout.variable_offset(4)), None);
        assert_eq!(layout.column_of(layout.data_start() + 3), None);
        assert_eq!(layout.column_of(layout.data_start() - 8), None);
    }

    #[test]
    fn test_offsets_depend_on_capacities() {
        let small = Layout::new(Capacities { variables: 4, files: 2 });
        let grown = Layout::new(Capacities { variables: 5, files: 2 });
        assert_ne!(small.variable_offset(1), grown.variable_offset(1));
        assert_eq!(grown.data_start() - small.data_start(), VARIABLE_ENTRY_LEN);
    }

    #[test]
    fn test_header_encoding_is_big_endian() {
        let header = Header {
            capacities: DEFAULT,
            variables_used: 3,
            files_used: 1,
        };
        let bytes = header.encode();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..4], &[0, 0, 0, 150]);
        assert_eq!(&bytes[12..], &[0, 0, 0, 1]);
        assert_eq!(Header::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_rejects_bad_counts() {
        let over = Header {
            capacities: Capacities { variables: 2, files: 2 },
            variables_used: 3,
            files_used: 0,
        };
        let _ = Header::decode(&over.encode()).unwrap_err();
        let _ = Header::decode(&[0u8; 16]).unwrap_err();
        let _ = Header::decode(&[0u8; 8]).unwrap_err();
    }

    #[test]
    fn test_variable_entry_layout() {
        let entry = VariableEntry {
            pdg: [1_000_022, -1, 0],
            block: "MASS".to_string(),
            description: "neutralino".to_string(),
            offset: 140_016,
        };
        let bytes = entry.encode();
        assert_eq!(bytes.len(), 110);
        // 'M' as a big-endian UTF-16 unit right after the three codes
        assert_eq!(&bytes[12..14], &[0, b'M']);
        assert_eq!(VariableEntry::decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_long_text_is_truncated() {
        let entry = VariableEntry {
            pdg: [1, 0, 0],
            block: "B".to_string(),
            description: "a description much longer than twenty-five units".to_string(),
            offset: 0,
        };
        let decoded = VariableEntry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded.description, truncate_units(&entry.description, DESCRIPTION_UNITS));
        assert_eq!(decoded.description.len(), 25);
    }

    #[test]
    fn test_file_entry_layout() {
        let entry = FileEntry {
            last_modified: 1_700_000_000_123,
            name: "point_0042".to_string(),
            slot: 41,
        };
        let bytes = entry.encode();
        assert_eq!(bytes.len(), 62);
        assert_eq!(FileEntry::decode(&bytes).unwrap(), entry);
    }

    #[test]
    fn test_non_ascii_text() {
        assert_eq!(truncate_units("χ̃⁰₁ mass", 4), "χ̃⁰₁");
        assert!(fits_units("DECAY 1000021", BLOCK_NAME_UNITS));
        assert!(!fits_units("A_VERY_LONG_BLOCK_NAME_X", BLOCK_NAME_UNITS));
    }

    #[test]
    fn test_cells() {
        let bytes = encode_cells(&[1.5, SENTINEL]);
        assert_eq!(bytes.len(), 16);
        assert_eq!(decode_cell(&bytes[..8]), 1.5);
        assert_eq!(decode_cell(&bytes[8..]), SENTINEL);
    }
}
