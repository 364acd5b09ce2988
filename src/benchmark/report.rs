//! CSV reporting for benchmark rows.
//!
//! The orchestrator hands finished rows to a [`ReportSink`]; the engine
//! itself never touches the filesystem during a sweep. [`CsvReporter`]
//! appends search rows (one header per concurrency block, matching the
//! row grouping) and rewrites the build file whole, since an index is
//! built at most once per dataset.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::benchmark::{BuildReport, ProbeReport};
use crate::error::Result;

/// Destination for finished benchmark rows.
pub trait ReportSink {
    /// Called once per concurrency level, before its probe-depth rows.
    fn search_header(&mut self, k: usize) -> Result<()>;
    /// One row per (concurrency, probe depth) sweep point.
    fn search_row(&mut self, row: &ProbeReport) -> Result<()>;
    /// Index-build metrics, at most once per dataset.
    fn build_row(&mut self, report: &BuildReport) -> Result<()>;
}

/// Sink that discards everything; keeps runs file-free.
#[derive(Debug, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn search_header(&mut self, _k: usize) -> Result<()> {
        Ok(())
    }
    fn search_row(&mut self, _row: &ProbeReport) -> Result<()> {
        Ok(())
    }
    fn build_row(&mut self, _report: &BuildReport) -> Result<()> {
        Ok(())
    }
}

pub fn search_header_line(k: usize) -> String {
    format!(
        "nprobe,query_time_ms,qps,recall@{k},res_mb,virt_mb,\
         total_filter_ms,avg_filter_ms,total_search_ms,avg_search_ms"
    )
}

pub fn search_row_line(row: &ProbeReport) -> String {
    format!(
        "{},{:.3},{:.1},{:.4},{:.1},{:.1},{:.3},{:.6},{:.3},{:.6}",
        row.nprobe,
        row.query_time_ms,
        row.qps,
        row.recall,
        row.res_mb,
        row.virt_mb,
        row.total_filter_ms,
        row.avg_filter_ms,
        row.total_search_ms,
        row.avg_search_ms,
    )
}

pub fn build_row_lines(report: &BuildReport) -> String {
    format!(
        "dataset,res_mb,build_time_s,index_size_mb\n{},{:.1},{:.3},{:.2}",
        report.dataset, report.res_mb, report.build_time_s, report.index_size_mb,
    )
}

/// Appending CSV writer over a search-results file and a build-metrics file.
#[derive(Debug)]
pub struct CsvReporter {
    search_path: PathBuf,
    build_path: PathBuf,
}

impl CsvReporter {
    pub fn new(search_path: impl AsRef<Path>, build_path: impl AsRef<Path>) -> Self {
        Self {
            search_path: search_path.as_ref().to_path_buf(),
            build_path: build_path.as_ref().to_path_buf(),
        }
    }

    fn append(path: &Path, line: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

impl ReportSink for CsvReporter {
    fn search_header(&mut self, k: usize) -> Result<()> {
        Self::append(&self.search_path, &search_header_line(k))
    }

    fn search_row(&mut self, row: &ProbeReport) -> Result<()> {
        Self::append(&self.search_path, &search_row_line(row))
    }

    fn build_row(&mut self, report: &BuildReport) -> Result<()> {
        std::fs::write(&self.build_path, build_row_lines(report) + "\n")?;
        Ok(())
    }
}
