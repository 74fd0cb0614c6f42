//! Row-oriented structured logging for evolutionary runs.
//!
//! Core components only ever produce [`LoggableElement`]
//! name/value pairs; the [`DataLogger`] trait is the seam
//! behind which file formats live. A [`CsvLogger`] writing
//! to any `io::Write` is provided, along with an in-memory
//! logger for tests and a null sink.

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// The phase of a run a log row belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    /// Bootstrap seed evolution, before coevolution starts.
    Initialization,
    /// The main coevolutionary loop.
    Primary,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Initialization => "initialization",
            RunPhase::Primary => "primary",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named value in a log row.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggableElement {
    pub name: &'static str,
    pub value: String,
}

impl LoggableElement {
    pub fn new(name: &'static str, value: impl ToString) -> LoggableElement {
        LoggableElement {
            name,
            value: value.to_string(),
        }
    }
}

/// A row-oriented structured log sink.
///
/// Implementations decide where rows go; callers only
/// produce headers and [`LoggableElement`] rows.
pub trait DataLogger: Send {
    /// Writes the header row. Called at most once,
    /// before any call to [`log_row`].
    ///
    /// [`log_row`]: DataLogger::log_row
    fn log_header(&mut self, fields: &[&'static str]);

    /// Writes one data row.
    fn log_row(&mut self, row: &[LoggableElement]);

    /// Flushes and releases the sink. Further rows
    /// are discarded.
    fn close(&mut self) {}
}

/// A logger handle shareable between concurrent
/// evaluation workers.
pub type SharedLogger = Arc<Mutex<dyn DataLogger>>;

/// Wraps a logger for concurrent use.
pub fn shared(logger: impl DataLogger + 'static) -> SharedLogger {
    Arc::new(Mutex::new(logger))
}

/// A `DataLogger` writing comma-separated rows to any
/// `io::Write` sink.
///
/// # Examples
/// ```
/// use oximcc::logging::{CsvLogger, DataLogger, LoggableElement};
///
/// let mut logger = CsvLogger::new(Vec::new());
/// logger.log_header(&["generation", "viable"]);
/// logger.log_row(&[
///     LoggableElement::new("generation", 3),
///     LoggableElement::new("viable", true),
/// ]);
/// assert_eq!(logger.into_inner(), b"generation,viable\n3,true\n");
/// ```
pub struct CsvLogger<W: Write + Send> {
    out: W,
    closed: bool,
}

impl<W: Write + Send> CsvLogger<W> {
    pub fn new(out: W) -> CsvLogger<W> {
        CsvLogger { out, closed: false }
    }

    /// Consumes the logger and returns the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> DataLogger for CsvLogger<W> {
    fn log_header(&mut self, fields: &[&'static str]) {
        if self.closed {
            return;
        }
        let _ = writeln!(self.out, "{}", fields.join(","));
    }

    fn log_row(&mut self, row: &[LoggableElement]) {
        if self.closed {
            return;
        }
        let line: Vec<&str> = row.iter().map(|e| e.value.as_str()).collect();
        let _ = writeln!(self.out, "{}", line.join(","));
    }

    fn close(&mut self) {
        let _ = self.out.flush();
        self.closed = true;
    }
}

/// A `DataLogger` that retains rows in memory.
/// Intended for tests and small diagnostic runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryLogger {
    pub header: Vec<&'static str>,
    pub rows: Vec<Vec<LoggableElement>>,
}

impl DataLogger for MemoryLogger {
    fn log_header(&mut self, fields: &[&'static str]) {
        self.header = fields.to_vec();
    }

    fn log_row(&mut self, row: &[LoggableElement]) {
        self.rows.push(row.to_vec());
    }
}

/// A `DataLogger` that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLogger;

impl DataLogger for NullLogger {
    fn log_header(&mut self, _fields: &[&'static str]) {}
    fn log_row(&mut self, _row: &[LoggableElement]) {}
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// An empty sequence yields all-zero statistics.
    ///
    /// # Examples
    /// ```
    /// use oximcc::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f64>) -> Stats {
        let mut data: Vec<f64> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
            };
        }
        data.sort_unstable_by(|a, b| {
            a.partial_cmp(b)
                .unwrap_or_else(|| panic!("uncomparable value in statistics (NaN)"))
        });
        let sum: f64 = data.iter().sum();
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: data[data.len() - 1],
            minimum: data[0],
            mean: sum / data.len() as f64,
            median,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max {:.3}, min {:.3}, mean {:.3}, median {:.3}",
            self.maximum, self.minimum, self.mean, self.median
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_even_length_sequence() {
        let stats = Stats::from([4.0, 1.0, 3.0, 2.0].iter().copied());
        assert_eq!(stats.maximum, 4.0);
        assert_eq!(stats.minimum, 1.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
    }

    #[test]
    fn stats_of_empty_sequence() {
        let stats = Stats::from(std::iter::empty());
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.median, 0.0);
    }

    #[test]
    fn csv_rows_follow_header() {
        let mut logger = CsvLogger::new(Vec::new());
        logger.log_header(&["a", "b"]);
        logger.log_row(&[
            LoggableElement::new("a", 1),
            LoggableElement::new("b", "x"),
        ]);
        logger.log_row(&[
            LoggableElement::new("a", 2),
            LoggableElement::new("b", "y"),
        ]);
        logger.close();
        let text = String::from_utf8(logger.into_inner()).unwrap();
        assert_eq!(text, "a,b\n1,x\n2,y\n");
    }

    #[test]
    fn closed_logger_discards_rows() {
        let mut logger = CsvLogger::new(Vec::new());
        logger.log_header(&["a"]);
        logger.close();
        logger.log_row(&[LoggableElement::new("a", 1)]);
        assert_eq!(logger.into_inner(), b"a\n");
    }
}
