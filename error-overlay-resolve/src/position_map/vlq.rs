//! Base64 VLQ decoding of the source map `mappings` field.

use crate::error::PositionMapError;

/// One decoded mapping segment.
///
/// `generated_column`, `original_line` and `original_column` are 0-based, as
/// stored in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub generated_column: u32,
    pub source: Option<u32>,
    pub original_line: u32,
    pub original_column: u32,
    pub name: Option<u32>,
}

fn base64_digit(byte: u8) -> Option<i64> {
    let value = match byte {
        b'A'..=b'Z' => byte - b'A',
        b'a'..=b'z' => byte - b'a' + 26,
        b'0'..=b'9' => byte - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(i64::from(value))
}

/// Decode every VLQ value in one comma-free segment.
pub fn decode_segment(segment: &str) -> Result<Vec<i64>, String> {
    let mut values = Vec::with_capacity(5);
    let mut accum: i64 = 0;
    let mut shift = 0u32;

    for byte in segment.bytes() {
        let digit = base64_digit(byte).ok_or_else(|| format!("invalid character {:?}", byte as char))?;
        if shift > 60 {
            return Err("value overflows 64 bits".to_string());
        }
        accum |= (digit & 0b1_1111) << shift;
        if digit & 0b10_0000 != 0 {
            shift += 5;
            continue;
        }
        let magnitude = accum >> 1;
        values.push(if accum & 1 == 1 { -magnitude } else { magnitude });
        accum = 0;
        shift = 0;
    }

    if shift != 0 {
        return Err("segment ends inside a continuation".to_string());
    }
    Ok(values)
}

fn apply(base: i64, delta: i64, segment: usize, field: &str) -> Result<i64, PositionMapError> {
    let value = base + delta;
    if value < 0 || value > i64::from(u32::MAX) {
        return Err(PositionMapError::InvalidMappings {
            segment,
            reason: format!("{field} out of range ({value})"),
        });
    }
    Ok(value)
}

/// Decode a `mappings` string into per-generated-line segment lists, each
/// sorted by generated column.
pub fn decode_mappings(mappings: &str) -> Result<Vec<Vec<Mapping>>, PositionMapError> {
    let mut lines = Vec::new();
    let mut source = 0i64;
    let mut original_line = 0i64;
    let mut original_column = 0i64;
    let mut name = 0i64;
    let mut index = 0usize;

    for line in mappings.split(';') {
        let mut generated_column = 0i64;
        let mut segments = Vec::new();

        for segment in line.split(',').filter(|s| !s.is_empty()) {
            let values = decode_segment(segment)
                .map_err(|reason| PositionMapError::InvalidMappings { segment: index, reason })?;

            generated_column = apply(generated_column, values[0], index, "generated column")?;
            let mut mapping = Mapping {
                generated_column: generated_column as u32,
                source: None,
                original_line: 0,
                original_column: 0,
                name: None,
            };

            match values.len() {
                1 => {}
                4 | 5 => {
                    source = apply(source, values[1], index, "source index")?;
                    original_line = apply(original_line, values[2], index, "original line")?;
                    original_column = apply(original_column, values[3], index, "original column")?;
                    mapping.source = Some(source as u32);
                    mapping.original_line = original_line as u32;
                    mapping.original_column = original_column as u32;
                    if let Some(&delta) = values.get(4) {
                        name = apply(name, delta, index, "name index")?;
                        mapping.name = Some(name as u32);
                    }
                }
                n => {
                    return Err(PositionMapError::InvalidMappings {
                        segment: index,
                        reason: format!("expected 1, 4 or 5 fields, found {n}"),
                    });
                }
            }

            segments.push(mapping);
            index += 1;
        }

        segments.sort_by_key(|m| m.generated_column);
        lines.push(segments);
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_segment_values() {
        assert_eq!(decode_segment("AAAA").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(decode_segment("IAIEA").unwrap(), vec![4, 0, 4, 2, 0]);
        // Sign bit set, then a two-digit continuation.
        assert_eq!(decode_segment("D").unwrap(), vec![-1]);
        assert_eq!(decode_segment("gB").unwrap(), vec![16]);
    }

    #[test]
    fn test_decode_segment_errors() {
        assert!(decode_segment("A!").is_err());
        assert!(decode_segment("g").is_err());
    }

    #[test]
    fn test_decode_mappings_accumulates_across_lines() {
        let lines = decode_mappings("AAAA,EAAE;AACA").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), 2);
        assert_eq!(lines[0][1].generated_column, 2);
        assert_eq!(lines[0][1].original_column, 2);
        // Generated column resets per line, original fields carry over.
        assert_eq!(lines[1][0].generated_column, 0);
        assert_eq!(lines[1][0].original_line, 1);
        assert_eq!(lines[1][0].original_column, 2);
    }

    #[test]
    fn test_decode_mappings_empty_lines_and_names() {
        let lines = decode_mappings(";;;;;;;;;IAIEA").unwrap();
        assert_eq!(lines.len(), 10);
        assert!(lines[..9].iter().all(Vec::is_empty));
        let m = lines[9][0];
        assert_eq!(m.generated_column, 4);
        assert_eq!(m.source, Some(0));
        assert_eq!(m.original_line, 4);
        assert_eq!(m.original_column, 2);
        assert_eq!(m.name, Some(0));
    }

    #[test]
    fn test_decode_mappings_rejects_bad_field_count() {
        let err = decode_mappings("AA").unwrap_err();
        assert!(matches!(err, PositionMapError::InvalidMappings { segment: 0, .. }));
    }

    #[test]
    fn test_decode_mappings_rejects_negative_position() {
        let err = decode_mappings("D").unwrap_err();
        assert!(err.to_string().contains("generated column"), "{err}");
    }
}
