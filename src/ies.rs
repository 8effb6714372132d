//! IES tabular data: typed columns, rows, and the XOR-obfuscated string
//! encoding shared with IPF.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};

use crate::bytes_io::{
    read_f32, read_i32, read_u16, read_u32, read_xored_fixed_string, read_xored_lp_string,
    write_fixed_string, write_xored_fixed_string, write_xored_lp_string,
};
use crate::error::IesError;

const COLUMN_NAME_LEN: usize = 64;
const COLUMN_RECORD_LEN: usize = 136;

/// Header layout, in field order: `name`(128) + `version`(2) + pad(2) +
/// `data_offset`(4) + `resource_offset`(4) + `file_size`(4) + `use_class_id`(1)
/// + pad(1) + `row_count`(2) + `column_count`(2) + `number_column_count`(2) +
/// `string_column_count`(2) + pad(2). The three size fields sit at offset
/// `2*64 + 2*2 = 132` and run to 144; the count fields that follow bring the
/// full header to 156 bytes.
const HEADER_LEN: usize = 156;
const SIZE_FIELDS_OFFSET: usize = 132;

/// A column's declared storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    String,
    String2,
}

impl ColumnKind {
    fn from_raw(raw: u16) -> Self {
        match raw {
            2 => ColumnKind::String2,
            1 => ColumnKind::String,
            _ => ColumnKind::Float,
        }
    }

    fn to_raw(self) -> u16 {
        match self {
            ColumnKind::Float => 0,
            ColumnKind::String => 1,
            ColumnKind::String2 => 2,
        }
    }

    fn is_string(self) -> bool {
        matches!(self, ColumnKind::String | ColumnKind::String2)
    }
}

/// Column access level; defaults to `Sp`, matching the format's default
/// when a column's access byte is never set by the author tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAccess {
    Ep,
    Cp,
    Vp,
    Sp,
    Ct,
}

impl Default for ColumnAccess {
    fn default() -> Self {
        ColumnAccess::Sp
    }
}

impl ColumnAccess {
    fn from_raw(raw: u16) -> Self {
        match raw {
            0 => ColumnAccess::Ep,
            1 => ColumnAccess::Cp,
            2 => ColumnAccess::Vp,
            4 => ColumnAccess::Ct,
            _ => ColumnAccess::Sp,
        }
    }

    fn to_raw(self) -> u16 {
        match self {
            ColumnAccess::Ep => 0,
            ColumnAccess::Cp => 1,
            ColumnAccess::Vp => 2,
            ColumnAccess::Sp => 3,
            ColumnAccess::Ct => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IesColumn {
    pub name: String,
    pub name2: String,
    pub kind: ColumnKind,
    pub access: ColumnAccess,
    pub sync: u16,
    pub position: u16,
}

impl IesColumn {
    pub fn is_number(&self) -> bool {
        !self.kind.is_string()
    }
}

/// Comparison rule for column ordering: equal kind compares by declared
/// position; a String/String2 pair also compares by position; otherwise
/// the smaller storage type wins.
fn compare_columns(a: &IesColumn, b: &IesColumn) -> Ordering {
    let both_stringish = a.kind.is_string() && b.kind.is_string();
    if a.kind == b.kind || both_stringish {
        a.position.cmp(&b.position)
    } else {
        a.kind.to_raw().cmp(&b.kind.to_raw())
    }
}

/// Writer's canonical column order: numeric columns before string columns,
/// each group ordered by `position`.
fn write_order(a: &IesColumn, b: &IesColumn) -> Ordering {
    (!a.is_number(), a.position).cmp(&(!b.is_number(), b.position))
}

#[derive(Debug, Clone, PartialEq)]
pub enum IesValue {
    Number(f32),
    Text(String),
}

impl IesValue {
    pub fn as_number(&self) -> Result<f32, IesError> {
        match self {
            IesValue::Number(n) => Ok(*n),
            IesValue::Text(_) => Err(IesError::TypeMismatch {
                column: String::new(),
                expected: "number",
            }),
        }
    }

    pub fn as_text(&self) -> Result<&str, IesError> {
        match self {
            IesValue::Text(s) => Ok(s),
            IesValue::Number(_) => Err(IesError::TypeMismatch {
                column: String::new(),
                expected: "text",
            }),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IesRow {
    pub class_id: i32,
    pub class_name: String,
    pub values: HashMap<String, IesValue>,
    pub use_scr: HashMap<String, bool>,
}

impl IesRow {
    pub fn new(class_id: i32, class_name: impl Into<String>) -> Self {
        IesRow {
            class_id,
            class_name: class_name.into(),
            values: HashMap::new(),
            use_scr: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Result<&IesValue, IesError> {
        self.values
            .get(name)
            .ok_or_else(|| IesError::FieldNotFound(name.to_string()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: IesValue) {
        self.values.insert(name.into(), value);
    }
}

#[derive(Debug, Clone)]
pub struct IesFile {
    pub name: String,
    pub version: u16,
    pub use_class_id: bool,
    /// Columns in their original file order (what was declared, pre-sort).
    pub columns: Vec<IesColumn>,
    pub rows: Vec<IesRow>,
}

impl IesFile {
    /// Columns in the sorted display order.
    pub fn sorted_columns(&self) -> Vec<IesColumn> {
        let mut sorted = self.columns.clone();
        sorted.sort_by(compare_columns);
        sorted
    }
}

fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut next_suffix: HashMap<String, u32> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            if taken.insert(name.clone()) {
                return name;
            }
            loop {
                let count = next_suffix.entry(name.clone()).or_insert(0);
                *count += 1;
                let candidate = format!("{name}_{count}");
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Parse a full `.ies` buffer.
pub fn parse_ies(bytes: &[u8]) -> Result<IesFile, IesError> {
    if bytes.len() < HEADER_LEN {
        return Err(IesError::InvalidFormat(
            "file shorter than header".to_string(),
        ));
    }

    let mut header = Cursor::new(&bytes[..HEADER_LEN]);
    let name = {
        let mut buf = [0u8; 128];
        header.read_exact(&mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(128);
        String::from_utf8_lossy(&buf[..end]).into_owned()
    };
    let version = read_u16(&mut header)?;
    let _pad = read_u16(&mut header)?;
    let data_offset = read_u32(&mut header)? as usize;
    let resource_offset = read_u32(&mut header)? as usize;
    let _file_size = read_u32(&mut header)?;
    let use_class_id = {
        let mut b = [0u8; 1];
        header.read_exact(&mut b)?;
        b[0] != 0
    };
    let _pad = {
        let mut b = [0u8; 1];
        header.read_exact(&mut b)?;
        b[0]
    };
    let row_count = read_u16(&mut header)?;
    let column_count = read_u16(&mut header)?;
    let number_column_count = read_u16(&mut header)?;
    let string_column_count = read_u16(&mut header)?;
    let _pad = read_u16(&mut header)?;

    if number_column_count + string_column_count != column_count {
        return Err(IesError::InvalidFormat(format!(
            "number_column_count ({number_column_count}) + string_column_count ({string_column_count}) != column_count ({column_count})"
        )));
    }

    let file_len = bytes.len();
    let column_table_start = file_len
        .checked_sub(resource_offset)
        .and_then(|v| v.checked_sub(data_offset))
        .ok_or_else(|| {
            IesError::InvalidFormat("resource/data offsets exceed file length".to_string())
        })?;

    let column_table_len = column_count as usize * COLUMN_RECORD_LEN;
    if column_table_len != data_offset {
        return Err(IesError::InvalidFormat(format!(
            "data_offset ({data_offset}) does not match column_count * {COLUMN_RECORD_LEN} ({column_table_len})"
        )));
    }
    let column_table_end = column_table_start + column_table_len;
    if column_table_end > file_len {
        return Err(IesError::InvalidFormat(
            "column table runs past end of file".to_string(),
        ));
    }

    let mut raw_names = Vec::with_capacity(column_count as usize);
    let mut columns: Vec<IesColumn> = Vec::with_capacity(column_count as usize);
    for i in 0..column_count as usize {
        let start = column_table_start + i * COLUMN_RECORD_LEN;
        let record = &bytes[start..start + COLUMN_RECORD_LEN];
        let mut cursor = Cursor::new(record);
        let raw_name = read_xored_fixed_string(&mut cursor, COLUMN_NAME_LEN)?;
        let name2 = read_xored_fixed_string(&mut cursor, COLUMN_NAME_LEN)?;
        let kind = ColumnKind::from_raw(read_u16(&mut cursor)?);
        let access = ColumnAccess::from_raw(read_u16(&mut cursor)?);
        let sync = read_u16(&mut cursor)?;
        let position = read_u16(&mut cursor)?;

        raw_names.push(raw_name);
        columns.push(IesColumn {
            name: String::new(),
            name2,
            kind,
            access,
            sync,
            position,
        });
    }
    for (column, name) in columns.iter_mut().zip(dedup_names(raw_names)) {
        column.name = name;
    }

    let mut sorted_columns = columns.clone();
    sorted_columns.sort_by(compare_columns);

    // Rows start right after the column table (header || columns || rows);
    // this always equals `column_table_end` by construction.
    let row_region_start = column_table_end;
    let mut cursor = Cursor::new(&bytes[row_region_start..file_len]);
    let mut rows = Vec::with_capacity(row_count as usize);
    for _ in 0..row_count {
        let class_id = read_i32(&mut cursor)?;
        let class_name = read_xored_lp_string(&mut cursor)?;
        let mut values = HashMap::with_capacity(sorted_columns.len());
        for column in &sorted_columns {
            let value = if column.is_number() {
                IesValue::Number(read_f32(&mut cursor)?)
            } else {
                IesValue::Text(read_xored_lp_string(&mut cursor)?)
            };
            values.insert(column.name.clone(), value);
        }
        // use_scr region: one byte per string column.
        let mut use_scr = HashMap::new();
        for column in sorted_columns.iter().filter(|c| !c.is_number()) {
            let mut b = [0u8; 1];
            cursor.read_exact(&mut b)?;
            use_scr.insert(column.name.clone(), b[0] != 0);
        }
        rows.push(IesRow {
            class_id,
            class_name,
            values,
            use_scr,
        });
    }

    Ok(IesFile {
        name,
        version,
        use_class_id,
        columns,
        rows,
    })
}

impl IesFile {
    /// Serialize back to the on-disk `.ies` layout: header, then columns in
    /// their original declared order, then rows encoded using the
    /// numbers-before-strings write order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, IesError> {
        let mut sorted: Vec<&IesColumn> = self.columns.iter().collect();
        sorted.sort_by(|a, b| write_order(a, b));

        let number_column_count = self.columns.iter().filter(|c| c.is_number()).count() as u16;
        let string_column_count = self.columns.len() as u16 - number_column_count;

        let mut row_buf = Vec::new();
        for row in &self.rows {
            row_buf.extend_from_slice(&row.class_id.to_le_bytes());
            write_xored_lp_string(&mut row_buf, &row.class_name)?;
            for column in &sorted {
                match row.values.get(&column.name) {
                    Some(IesValue::Number(n)) if column.is_number() => {
                        row_buf.extend_from_slice(&n.to_le_bytes())
                    }
                    Some(IesValue::Text(s)) if !column.is_number() => {
                        write_xored_lp_string(&mut row_buf, s)?
                    }
                    Some(_) => {
                        return Err(IesError::TypeMismatch {
                            column: column.name.clone(),
                            expected: if column.is_number() { "number" } else { "text" },
                        })
                    }
                    None if column.is_number() => row_buf.extend_from_slice(&0.0f32.to_le_bytes()),
                    None => write_xored_lp_string(&mut row_buf, "")?,
                }
            }
            for column in sorted.iter().filter(|c| !c.is_number()) {
                let flag = row.use_scr.get(&column.name).copied().unwrap_or(false);
                row_buf.push(flag as u8);
            }
        }

        let mut column_buf = Vec::new();
        for column in &self.columns {
            write_xored_fixed_string(&mut column_buf, &column.name, COLUMN_NAME_LEN)?;
            write_xored_fixed_string(&mut column_buf, &column.name2, COLUMN_NAME_LEN)?;
            column_buf.extend_from_slice(&column.kind.to_raw().to_le_bytes());
            column_buf.extend_from_slice(&column.access.to_raw().to_le_bytes());
            column_buf.extend_from_slice(&column.sync.to_le_bytes());
            column_buf.extend_from_slice(&column.position.to_le_bytes());
        }

        let data_offset = column_buf.len() as u32;
        let resource_offset = row_buf.len() as u32;
        let file_size = HEADER_LEN as u32 + row_buf.len() as u32 + column_buf.len() as u32;

        let mut out = Vec::with_capacity(file_size as usize);
        write_fixed_string(&mut out, &self.name, 128)?;
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        debug_assert_eq!(out.len(), SIZE_FIELDS_OFFSET);
        out.extend_from_slice(&data_offset.to_le_bytes());
        out.extend_from_slice(&resource_offset.to_le_bytes());
        out.extend_from_slice(&file_size.to_le_bytes());
        out.push(self.use_class_id as u8);
        out.push(0);
        out.extend_from_slice(&(self.rows.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.columns.len() as u16).to_le_bytes());
        out.extend_from_slice(&number_column_count.to_le_bytes());
        out.extend_from_slice(&string_column_count.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        debug_assert_eq!(out.len(), HEADER_LEN);

        out.extend_from_slice(&column_buf);
        out.extend_from_slice(&row_buf);

        Ok(out)
    }
}
