//! File readers for base labels, query sets, vectors and ground truth.
//!
//! Formats follow the benchmark's dataset conventions:
//!
//! - Label files: one line of whitespace-separated integers per base vector
//!   or query, optionally preceded by a header line. The header is detected
//!   heuristically: a first line holding exactly two integers and nothing
//!   else is skipped.
//! - Vector files: binary, repeating `[i32 dim][dim x f32]` records
//!   (little-endian). The dimension is read from the first record and every
//!   later record must agree.
//! - Ground truth: binary `[i32 count][count x i32]` records, or text lines
//!   of whitespace-separated ids.
//!
//! All input errors are fatal; the only tolerated irregularity is a text
//! ground-truth line with an unexpected column count, which is logged and
//! kept as parsed.

use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use smallvec::SmallVec;
use tracing::warn;

use crate::error::{BenchError, Result};
use crate::predicate::{AttrTuple, BaseLabels, Predicate, Query};

/// How query label lines encode their predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredicateFormat {
    /// Two integers per line: `imin imax`.
    Range,
    /// The first `arity` integers per line are equality attributes.
    Attrs { arity: usize },
}

/// Read a binary vector file into one contiguous row-major buffer.
///
/// Returns the buffer and the dimension declared by the first record. A
/// record whose declared dimension disagrees is a fatal error, as is a
/// record cut short by end-of-file.
pub fn read_fvecs(path: &Path) -> Result<(Vec<f32>, usize)> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut data = Vec::new();
    let mut dim = 0usize;

    loop {
        let record_dim = match reader.read_i32::<LittleEndian>() {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        if record_dim <= 0 {
            return Err(BenchError::DimensionMismatch {
                expected: dim.max(1),
                found: 0,
            });
        }
        let record_dim = record_dim as usize;
        if dim == 0 {
            dim = record_dim;
        } else if record_dim != dim {
            return Err(BenchError::DimensionMismatch {
                expected: dim,
                found: record_dim,
            });
        }

        for i in 0..dim {
            match reader.read_f32::<LittleEndian>() {
                Ok(v) => data.push(v),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Err(BenchError::TruncatedFile {
                        path: path.display().to_string(),
                        expected: dim,
                        got: i,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok((data, dim))
}

/// Read base-vector attribute labels, selecting `attr_indices` columns from
/// each line (all columns when empty).
pub fn read_base_labels(path: &Path, attr_indices: &[usize]) -> Result<BaseLabels> {
    let lines = read_label_lines(path)?;
    let mut labels = BaseLabels::new();

    for (line_no, line) in lines {
        let fields = parse_fields::<u16>(path, line_no, &line)?;
        let row: AttrTuple = if attr_indices.is_empty() {
            SmallVec::from_slice(&fields)
        } else {
            let mut row = AttrTuple::new();
            for &col in attr_indices {
                let value = fields.get(col).copied().ok_or_else(|| {
                    BenchError::MalformedLabel {
                        path: path.display().to_string(),
                        line: line_no,
                        reason: format!("missing attribute column {col}"),
                    }
                })?;
                row.push(value);
            }
            row
        };
        labels.push(row);
    }
    Ok(labels)
}

/// Read a query set: one predicate per label line paired with one vector
/// record, in file order.
pub fn read_queries(
    label_path: &Path,
    vector_path: &Path,
    format: PredicateFormat,
) -> Result<Vec<Query>> {
    let (data, dim) = read_fvecs(vector_path)?;
    let nv = data.len() / dim.max(1);
    // No header skipping here: a range predicate line is itself exactly two
    // integers, so the base-label heuristic would eat the first query.
    let lines = read_raw_lines(label_path)?;

    if lines.len() != nv {
        return Err(BenchError::LabelCountMismatch {
            labels: lines.len(),
            vectors: nv,
        });
    }

    let mut queries = Vec::with_capacity(nv);
    for (i, (line_no, line)) in lines.into_iter().enumerate() {
        let predicate = parse_predicate(label_path, line_no, &line, format)?;
        let vector = data[i * dim..(i + 1) * dim].to_vec();
        queries.push(Query::new(predicate, vector));
    }
    Ok(queries)
}

/// Read binary ground truth: repeating `[i32 count][count x i32]` records.
pub fn read_ground_truth(path: &Path) -> Result<Vec<Vec<i32>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    loop {
        let count = match reader.read_i32::<LittleEndian>() {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        if count < 0 {
            return Err(BenchError::InvalidParameter(format!(
                "negative record count {count} in ground-truth file {}",
                path.display()
            )));
        }
        let count = count as usize;
        let mut row = Vec::with_capacity(count);
        for i in 0..count {
            match reader.read_i32::<LittleEndian>() {
                Ok(v) => row.push(v),
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Err(BenchError::TruncatedFile {
                        path: path.display().to_string(),
                        expected: count,
                        got: i,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Read text ground truth: one line of whitespace-separated ids per query.
///
/// A line without exactly `k` ids is logged as a warning and kept as parsed;
/// the data is never silently corrected.
pub fn read_ground_truth_txt(path: &Path, k: usize) -> Result<Vec<Vec<i32>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = parse_fields::<i32>(path, line_no + 1, &line)?;
        if row.len() != k {
            warn!(
                path = %path.display(),
                line = line_no + 1,
                got = row.len(),
                expected = k,
                "ground-truth line has unexpected column count"
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Non-empty label lines with 1-based numbers, header skipped when detected.
///
/// Only base-label files get the heuristic; query label files go through
/// [`read_raw_lines`] because their range lines look exactly like a header.
fn read_label_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let mut lines = read_raw_lines(path)?;
    if let Some((_, first)) = lines.first() {
        if looks_like_header(first) {
            lines.remove(0);
        }
    }
    Ok(lines)
}

/// Non-empty lines with 1-based numbers, kept verbatim.
fn read_raw_lines(path: &Path) -> Result<Vec<(usize, String)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push((i + 1, line));
        }
    }
    Ok(lines)
}

/// Heuristic from the dataset convention: a header line holds exactly two
/// integers (typically row count and dimension) and nothing else.
fn looks_like_header(line: &str) -> bool {
    let fields: Vec<&str> = line.split_whitespace().collect();
    fields.len() == 2 && fields.iter().all(|f| f.parse::<i64>().is_ok())
}

fn parse_fields<T: std::str::FromStr>(path: &Path, line_no: usize, line: &str) -> Result<Vec<T>> {
    line.split_whitespace()
        .map(|field| {
            field.parse::<T>().map_err(|_| BenchError::MalformedLabel {
                path: path.display().to_string(),
                line: line_no,
                reason: format!("cannot parse {field:?}"),
            })
        })
        .collect()
}

fn parse_predicate(
    path: &Path,
    line_no: usize,
    line: &str,
    format: PredicateFormat,
) -> Result<Predicate> {
    match format {
        PredicateFormat::Range => {
            let fields = parse_fields::<u32>(path, line_no, line)?;
            if fields.len() != 2 {
                return Err(BenchError::MalformedLabel {
                    path: path.display().to_string(),
                    line: line_no,
                    reason: format!("expected `imin imax`, got {} fields", fields.len()),
                });
            }
            Ok(Predicate::range(fields[0], fields[1]))
        }
        PredicateFormat::Attrs { arity } => {
            let fields = parse_fields::<u16>(path, line_no, line)?;
            if fields.len() < arity {
                return Err(BenchError::MalformedLabel {
                    path: path.display().to_string(),
                    line: line_no,
                    reason: format!("expected {arity} attributes, got {}", fields.len()),
                });
            }
            Ok(Predicate::attrs(&fields[..arity]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Write;

    fn write_fvecs(path: &Path, vectors: &[Vec<f32>]) {
        let mut buf = Vec::new();
        for v in vectors {
            buf.write_i32::<LittleEndian>(v.len() as i32).unwrap();
            for &x in v {
                buf.write_f32::<LittleEndian>(x).unwrap();
            }
        }
        std::fs::write(path, buf).unwrap();
    }

    #[test]
    fn test_read_fvecs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("base.fvecs");
        write_fvecs(&path, &[vec![1.0, 2.0], vec![3.0, 4.0]]);

        let (data, dim) = read_fvecs(&path).unwrap();
        assert_eq!(dim, 2);
        assert_eq!(data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_read_fvecs_rejects_dimension_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.fvecs");
        write_fvecs(&path, &[vec![1.0, 2.0], vec![3.0]]);

        let err = read_fvecs(&path).unwrap_err();
        assert!(matches!(err, BenchError::DimensionMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_read_fvecs_rejects_truncated_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.fvecs");
        let mut buf = Vec::new();
        buf.write_i32::<LittleEndian>(4).unwrap();
        buf.write_f32::<LittleEndian>(1.0).unwrap(); // 3 floats missing
        std::fs::write(&path, buf).unwrap();

        let err = read_fvecs(&path).unwrap_err();
        assert!(matches!(err, BenchError::TruncatedFile { expected: 4, got: 1, .. }));
    }

    #[test]
    fn test_header_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "1000 3\n1 2 3\n4 5 6\n").unwrap();

        let labels = read_base_labels(&path, &[]).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels.row(0), &[1, 2, 3]);
    }

    #[test]
    fn test_three_column_first_line_is_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "1 2 3\n4 5 6\n").unwrap();

        let labels = read_base_labels(&path, &[]).unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_attribute_column_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "9 7 5\n8 6 4\n").unwrap();

        let labels = read_base_labels(&path, &[2, 0]).unwrap();
        assert_eq!(labels.row(0), &[5, 9]);
        assert_eq!(labels.row(1), &[4, 8]);
    }

    #[test]
    fn test_malformed_label_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "1 2\n3 x\n").unwrap();

        let err = read_base_labels(&path, &[]).unwrap_err();
        assert!(matches!(err, BenchError::MalformedLabel { line: 2, .. }));
    }

    #[test]
    fn test_read_queries_pairs_predicates_with_vectors() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("q.txt");
        let vectors = dir.path().join("q.fvecs");
        std::fs::write(&labels, "100 149\n0 999\n").unwrap();
        write_fvecs(&vectors, &[vec![0.1, 0.2], vec![0.3, 0.4]]);

        let queries = read_queries(&labels, &vectors, PredicateFormat::Range).unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].predicate, Predicate::range(100, 149));
        assert_eq!(queries[1].vector, vec![0.3, 0.4]);
    }

    #[test]
    fn test_query_first_line_is_a_predicate_not_a_header() {
        // A range predicate line is exactly two integers, so the base-label
        // header heuristic must never run on query files.
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("q.txt");
        let vectors = dir.path().join("q.fvecs");
        std::fs::write(&labels, "100 149\n").unwrap();
        write_fvecs(&vectors, &[vec![0.1, 0.2]]);

        let queries = read_queries(&labels, &vectors, PredicateFormat::Range).unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].predicate, Predicate::range(100, 149));
    }

    #[test]
    fn test_read_queries_rejects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("q.txt");
        let vectors = dir.path().join("q.fvecs");
        std::fs::write(&labels, "100 149\n").unwrap();
        write_fvecs(&vectors, &[vec![0.1, 0.2], vec![0.3, 0.4]]);

        let err = read_queries(&labels, &vectors, PredicateFormat::Range).unwrap_err();
        assert!(matches!(err, BenchError::LabelCountMismatch { labels: 1, vectors: 2 }));
    }

    #[test]
    fn test_read_ground_truth_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gt.bin");
        let mut buf = Vec::new();
        for row in [[1i32, 2, 3].as_slice(), [4, -1, 6].as_slice()] {
            buf.write_i32::<LittleEndian>(row.len() as i32).unwrap();
            for &v in row {
                buf.write_i32::<LittleEndian>(v).unwrap();
            }
        }
        std::fs::write(&path, buf).unwrap();

        let rows = read_ground_truth(&path).unwrap();
        assert_eq!(rows, vec![vec![1, 2, 3], vec![4, -1, 6]]);
    }

    #[test]
    fn test_read_ground_truth_rejects_negative_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gt.bin");
        let mut buf = Vec::new();
        buf.write_i32::<LittleEndian>(-3).unwrap();
        std::fs::write(&path, buf).unwrap();

        let err = read_ground_truth(&path).unwrap_err();
        match err {
            BenchError::InvalidParameter(msg) => {
                assert!(msg.contains("-3"), "message names the bad count: {msg}");
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_read_ground_truth_txt_keeps_odd_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gt.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1 2 3").unwrap();
        writeln!(file, "4 5").unwrap(); // wrong column count: warn, keep
        drop(file);

        let rows = read_ground_truth_txt(&path, 3).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![4, 5]);
    }
}
