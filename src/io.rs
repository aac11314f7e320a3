//! Input readers and the binary neighbor-record codec.
//!
//! Documents arrive one per line; FASTQ keeps only the sequence line of
//! each four-line record. Result records are fixed little-endian u16
//! fields: `[label][neighbor_count][neighbor * count]`. The core works
//! with u64 labels and narrows on write; a label that does not fit the
//! record width is reported instead of truncated.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::error::SketchError;

/// One item together with the labels of its accepted neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborRecord {
    pub label: u64,
    pub neighbors: Vec<u64>,
}

/// Read one document per line, trailing newlines stripped.
pub fn read_documents<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SketchError> {
    documents_from(BufReader::new(File::open(path)?))
}

pub fn documents_from<R: BufRead>(reader: R) -> Result<Vec<String>, SketchError> {
    let mut documents = Vec::new();
    for line in reader.lines() {
        documents.push(line?);
    }
    Ok(documents)
}

/// Read the sequences of a FASTQ file, discarding headers, separators
/// and quality lines.
pub fn read_fastq<P: AsRef<Path>>(path: P) -> Result<Vec<String>, SketchError> {
    sequences_from_fastq(BufReader::new(File::open(path)?))
}

pub fn sequences_from_fastq<R: BufRead>(reader: R) -> Result<Vec<String>, SketchError> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    if lines.len() % 4 != 0 {
        return Err(SketchError::malformed(format!(
            "fastq line count {} is not divisible by 4",
            lines.len()
        )));
    }
    Ok(lines
        .into_iter()
        .enumerate()
        .filter(|(index, _)| index % 4 == 1)
        .map(|(_, line)| line)
        .collect())
}

fn narrow(value: u64, field: &str) -> Result<u16, SketchError> {
    u16::try_from(value).map_err(|_| {
        SketchError::malformed(format!("{field} {value} does not fit a 16-bit record field"))
    })
}

/// Write records in the binary result layout.
pub fn write_neighbor_records<W: Write>(
    writer: &mut W,
    records: &[NeighborRecord],
) -> Result<(), SketchError> {
    for record in records {
        writer.write_all(&narrow(record.label, "record label")?.to_le_bytes())?;
        writer.write_all(&narrow(record.neighbors.len() as u64, "neighbor count")?.to_le_bytes())?;
        for &neighbor in &record.neighbors {
            writer.write_all(&narrow(neighbor, "neighbor label")?.to_le_bytes())?;
        }
    }
    Ok(())
}

fn read_u16_opt<R: Read>(reader: &mut R) -> Result<Option<u16>, SketchError> {
    let mut buf = [0u8; 2];
    let mut filled = 0usize;
    while filled < 2 {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    match filled {
        0 => Ok(None),
        2 => Ok(Some(u16::from_le_bytes(buf))),
        _ => Err(SketchError::malformed("record stream ends mid-field")),
    }
}

/// Read back a stream produced by [`write_neighbor_records`].
pub fn read_neighbor_records<R: Read>(
    reader: &mut R,
) -> Result<Vec<NeighborRecord>, SketchError> {
    let mut records = Vec::new();
    while let Some(label) = read_u16_opt(reader)? {
        let count = read_u16_opt(reader)?
            .ok_or_else(|| SketchError::malformed("record stream ends before neighbor count"))?;
        let mut neighbors = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let neighbor = read_u16_opt(reader)?.ok_or_else(|| {
                SketchError::malformed("record stream ends inside a neighbor list")
            })?;
            neighbors.push(u64::from(neighbor));
        }
        records.push(NeighborRecord {
            label: u64::from(label),
            neighbors,
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_come_back_line_by_line() {
        let input = b"first doc\nsecond doc\nthird doc\n" as &[u8];
        let documents = documents_from(input).unwrap();
        assert_eq!(documents, vec!["first doc", "second doc", "third doc"]);
    }

    #[test]
    fn fastq_keeps_only_sequence_lines() {
        let input = b"@r1\nATCG\n+\nIIII\n@r2\nGGCC\n+\nIIII\n" as &[u8];
        let sequences = sequences_from_fastq(input).unwrap();
        assert_eq!(sequences, vec!["ATCG", "GGCC"]);
    }

    #[test]
    fn truncated_fastq_is_rejected() {
        let input = b"@r1\nATCG\n+\n" as &[u8];
        assert!(matches!(
            sequences_from_fastq(input),
            Err(SketchError::MalformedInput { .. })
        ));
    }

    #[test]
    fn records_round_trip_through_the_codec() {
        let records = vec![
            NeighborRecord {
                label: 0,
                neighbors: vec![],
            },
            NeighborRecord {
                label: 1,
                neighbors: vec![0],
            },
            NeighborRecord {
                label: 5,
                neighbors: vec![0, 1, 3],
            },
        ];
        let mut buffer = Vec::new();
        write_neighbor_records(&mut buffer, &records).unwrap();
        // 2 fields for each record header plus one per neighbor.
        assert_eq!(buffer.len(), 2 * (2 * 3 + 4));
        let back = read_neighbor_records(&mut buffer.as_slice()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn record_fields_are_little_endian() {
        let records = vec![NeighborRecord {
            label: 0x0102,
            neighbors: vec![0x0304],
        }];
        let mut buffer = Vec::new();
        write_neighbor_records(&mut buffer, &records).unwrap();
        assert_eq!(buffer, vec![0x02, 0x01, 0x01, 0x00, 0x04, 0x03]);
    }

    #[test]
    fn oversized_labels_are_reported_not_truncated() {
        let records = vec![NeighborRecord {
            label: u64::from(u16::MAX) + 1,
            neighbors: vec![],
        }];
        let mut buffer = Vec::new();
        assert!(matches!(
            write_neighbor_records(&mut buffer, &records),
            Err(SketchError::MalformedInput { .. })
        ));
    }

    #[test]
    fn truncated_record_streams_are_rejected() {
        // Label present, count missing.
        let mut bytes: &[u8] = &[0x01, 0x00];
        assert!(read_neighbor_records(&mut bytes).is_err());
        // Count promises more neighbors than the stream holds.
        let mut bytes: &[u8] = &[0x01, 0x00, 0x02, 0x00, 0x03, 0x00];
        assert!(read_neighbor_records(&mut bytes).is_err());
        // One dangling byte.
        let mut bytes: &[u8] = &[0x01];
        assert!(read_neighbor_records(&mut bytes).is_err());
    }
}
