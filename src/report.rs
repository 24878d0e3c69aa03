//! Request-log persistence and console summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use bytesize::ByteSize;
use yansi::Paint;

use crate::aggregate::AggregateRecord;
use crate::measure::MeasurementRecord;

/// Header row of the tab-separated request log.
pub const LOG_HEADER: &str =
    "URL\tStart Time\tEnd Time\tRTT (ms)\tStatus Code\tTotal Size (KB)\tThroughput (KB/s)";

/// Writes the tab-separated request log: the header, one row per record in
/// completion order, and the `Total` and `Average` rows when there are any
/// results.
pub fn write_log(
    path: &Path,
    records: &[MeasurementRecord],
    aggregate: Option<&AggregateRecord>,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(out, "{LOG_HEADER}")?;
    for record in records {
        writeln!(
            out,
            "{}\t{}\t{}\t{:.6}\t{}\t{:.2}\t{:.2}",
            record.url,
            timestamp(record.start_time),
            timestamp(record.end_time),
            record.rtt_ms,
            record.outcome,
            record.total_size_kb,
            record.throughput_kbps,
        )?;
    }

    if let Some(agg) = aggregate {
        writeln!(
            out,
            "Total\t\t\t{:.2}\t\t{:.2}\t{:.2}",
            agg.total_rtt_ms, agg.total_size_kb, agg.total_throughput_kbps
        )?;
        writeln!(
            out,
            "Average\t\t\t{:.2}\t\t{:.2}\t{:.2}",
            agg.average_rtt_ms, agg.average_size_kb, agg.average_throughput_kbps
        )?;
    }

    out.flush()
}

/// Prints the run summary to the console.
pub fn print_summary(aggregate: Option<&AggregateRecord>) {
    let Some(agg) = aggregate else {
        println!("{}", "No results to aggregate.".bold().red());
        return;
    };

    print!(
        "{} ({} requests",
        "## RESULTS".bold(),
        agg.requests.bold().blue()
    );
    if agg.failures > 0 {
        print!(", {}", format!("{} FAILED", agg.failures).bold().red());
    }
    println!(")");

    println!(
        "  RTT total: {:.2} ms; avg: {:.2} ms",
        agg.total_rtt_ms.bold(),
        agg.average_rtt_ms
    );
    println!(
        "  size total: {}; avg: {}",
        ByteSize::b((agg.total_size_kb * 1024.0) as u64).bold(),
        ByteSize::b((agg.average_size_kb * 1024.0) as u64)
    );
    println!(
        "  throughput total: {:.2} KB/s; avg: {:.2} KB/s",
        agg.total_throughput_kbps.bold(),
        agg.average_throughput_kbps
    );
}

fn timestamp(time: SystemTime) -> String {
    humantime::format_rfc3339_millis(time).to_string()
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use reqwest::Url;

    use crate::measure::Outcome;

    use super::*;

    fn record(outcome: Outcome) -> MeasurementRecord {
        let now = SystemTime::now();
        MeasurementRecord {
            url: Url::parse("http://x/index1.html").unwrap(),
            start_time: now,
            end_time: now,
            rtt_ms: 12.5,
            outcome,
            total_size_kb: 3.0,
            throughput_kbps: 96.0,
            latency_ms: 31.25,
        }
    }

    #[test]
    fn log_has_header_rows_and_aggregate_lines() {
        let records = vec![
            record(Outcome::Status(200)),
            record(Outcome::Failed("connection refused".into())),
        ];
        let aggregate = AggregateRecord::from_records(&records).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request_log_http.log");
        write_log(&path, &records, Some(&aggregate)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();

        assert_eq!(lines[0], LOG_HEADER);
        assert_eq!(lines.len(), 1 + records.len() + 2);
        assert!(lines[1].starts_with("http://x/index1.html\t"));
        assert!(lines[1].contains("\t200\t"));
        assert!(lines[2].contains("\tFailed: connection refused\t"));
        assert!(lines[3].starts_with("Total\t"));
        assert!(lines[4].starts_with("Average\t"));

        // Every data row carries all seven columns.
        assert_eq!(lines[1].split('\t').count(), 7);
    }

    #[test]
    fn empty_run_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.log");
        write_log(&path, &[], None).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.trim_end(), LOG_HEADER);
    }
}
