#[cfg(feature = "console-report")]
pub mod console;

use std::{fmt::Write as FmtWrite, io::Write as IoWrite};

/// Indented line writer shared by reports.
#[derive(Debug)]
pub struct ReportWriter<W> {
    pub indent: usize,
    pub buf: W,
    pub at_start_line: bool,
}
impl<W> ReportWriter<W> {
    pub fn new(indent: usize, buf: W) -> Self {
        Self { indent, buf, at_start_line: true }
    }
    pub fn indent(&self) -> String {
        "  ".repeat(self.indent)
    }
    pub fn scope<F, R>(&mut self, f: F) -> Result<R, std::fmt::Error>
    where
        F: FnOnce(&mut Self) -> Result<R, std::fmt::Error>,
    {
        self.indent += 1;
        let ret = f(self);
        self.indent -= 1;
        ret
    }
    pub fn into_inner(self) -> W {
        self.buf
    }
}
impl<W: IoWrite> FmtWrite for ReportWriter<W> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        for piece in s.split_inclusive('\n') {
            if self.at_start_line && piece != "\n" {
                write!(self.buf, "{}", self.indent()).map_err(|_| std::fmt::Error)?;
            }
            write!(self.buf, "{}", piece).map_err(|_| std::fmt::Error)?;
            self.at_start_line = piece.ends_with('\n');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indented_writer() {
        let mut w = ReportWriter::new(0, Vec::new());
        writeln!(w, "suite").unwrap();
        w.scope(|w| {
            write!(w, "spec ")?;
            writeln!(w, "ok\nnext")?;
            writeln!(w)
        })
        .unwrap();
        writeln!(w, "done").unwrap();
        assert_eq!(String::from_utf8(w.into_inner()).unwrap(), "suite\n  spec ok\n  next\n\ndone\n");
    }
}
