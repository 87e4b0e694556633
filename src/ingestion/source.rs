//! Record sources
//!
//! A [`RecordSource`] is a finite, single-pass sequence of raw lines.
//! Exhaustion is signalled by `None`; read failures by `Some(Err(..))`.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Stdin};
use std::path::Path;

use crate::error::SourceError;

/// Lazy producer of raw input lines
pub trait RecordSource {
    /// Next line without its terminator
    ///
    /// Returns `None` once the source is exhausted.
    fn next_line(&mut self) -> Option<Result<String, SourceError>>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_line(&mut self) -> Option<Result<String, SourceError>> {
        (**self).next_line()
    }
}

/// Line source over any buffered reader
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    /// Lines handed out so far (1-indexed number of the last line)
    line_no: usize,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> LineSource<R> {
    /// Wrap a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buf: Vec::new(),
            finished: false,
        }
    }

    /// Number of lines read so far
    pub fn line_number(&self) -> usize {
        self.line_no
    }
}

impl LineSource<BufReader<File>> {
    /// Open a file as a line source
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl LineSource<BufReader<Stdin>> {
    /// Read lines from standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()))
    }
}

impl<R: BufRead> RecordSource for LineSource<R> {
    fn next_line(&mut self) -> Option<Result<String, SourceError>> {
        if self.finished {
            return None;
        }

        self.buf.clear();
        // Bytes rather than read_line: invalid UTF-8 becomes a parse error
        // on that line instead of ending the source
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.finished = true;
                None
            },
            Ok(_) => {
                self.line_no += 1;
                let line = String::from_utf8_lossy(&self.buf);
                Some(Ok(line.trim_end_matches(['\n', '\r']).to_string()))
            },
            Err(source) => {
                // Not restartable: a failed read ends the source
                self.finished = true;
                Some(Err(SourceError::Read {
                    line: self.line_no + 1,
                    source,
                }))
            },
        }
    }
}

/// In-memory source over a list of lines
#[derive(Debug, Clone)]
pub struct VecSource {
    lines: std::vec::IntoIter<String>,
}

impl VecSource {
    /// Create a source yielding each line once
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect::<Vec<_>>().into_iter(),
        }
    }
}

impl RecordSource for VecSource {
    fn next_line(&mut self) -> Option<Result<String, SourceError>> {
        self.lines.next().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_line_source_strips_terminators() {
        let mut source = LineSource::new(Cursor::new("a 1\r\nb 2\nc 3"));

        assert_eq!(source.next_line().unwrap().unwrap(), "a 1");
        assert_eq!(source.next_line().unwrap().unwrap(), "b 2");
        assert_eq!(source.next_line().unwrap().unwrap(), "c 3");
        assert!(source.next_line().is_none());
        assert!(source.next_line().is_none());
        assert_eq!(source.line_number(), 3);
    }

    #[test]
    fn test_invalid_utf8_does_not_end_source() {
        let mut source = LineSource::new(Cursor::new(b"a\xff 1\nb 2\n".to_vec()));

        assert_eq!(source.next_line().unwrap().unwrap(), "a\u{fffd} 1");
        assert_eq!(source.next_line().unwrap().unwrap(), "b 2");
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_open_missing_file() {
        let err = LineSource::open("/nonexistent/traffic.txt").unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk gone"))
        }
    }

    #[test]
    fn test_read_error_ends_source() {
        let mut source = LineSource::new(BufReader::new(FailingReader));

        match source.next_line() {
            Some(Err(SourceError::Read { line, .. })) => assert_eq!(line, 1),
            other => panic!("expected read error, got {:?}", other),
        }
        assert!(source.next_line().is_none());
    }

    #[test]
    fn test_vec_source() {
        let mut source = VecSource::new(["x", "y"]);
        assert_eq!(source.next_line().unwrap().unwrap(), "x");
        assert_eq!(source.next_line().unwrap().unwrap(), "y");
        assert!(source.next_line().is_none());
    }
}
