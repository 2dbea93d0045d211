use std::fmt::Write as _;

use crate::{
    invoke::{InvocationReport, RunReport, SuiteReport, Tally},
    measure::LatencySummary,
    verify::{Classified, Classify},
};

use super::ReportWriter;

pub trait ConsoleReport {
    fn console_report<W: std::io::Write>(&self, w: &mut ReportWriter<W>) -> Result<(), std::fmt::Error>;
}

pub enum RunConsoleReport {}
impl RunConsoleReport {
    pub const SUMMARY_EMOJI: console::Emoji<'_, '_> = console::Emoji("💥", "");
}
impl ConsoleReport for RunReport {
    fn console_report<W: std::io::Write>(&self, w: &mut ReportWriter<W>) -> Result<(), std::fmt::Error> {
        for suite in &self.suites {
            suite.console_report(w)?;
            writeln!(w)?;
        }

        let total = self.total();
        writeln!(
            w,
            "{} {} {}",
            RunConsoleReport::SUMMARY_EMOJI,
            console::style("summary of all invocations").bold(),
            RunConsoleReport::SUMMARY_EMOJI,
        )?;
        w.scope(|w| {
            write!(w, "{}", styled_tally(&total))?;
            writeln!(w, " unreachable={}", self.unreachable())
        })
    }
}

pub enum SuiteConsoleReport {}
impl SuiteConsoleReport {
    pub const NAME_EMOJI: console::Emoji<'_, '_> = console::Emoji("🚀", "");
    pub const ADDRESS_EMOJI: console::Emoji<'_, '_> = console::Emoji("🌐", ":");
    pub const UNREACHABLE_EMOJI: console::Emoji<'_, '_> = console::Emoji("🔌", "UNREACHABLE");
}
impl ConsoleReport for SuiteReport {
    fn console_report<W: std::io::Write>(&self, w: &mut ReportWriter<W>) -> Result<(), std::fmt::Error> {
        writeln!(w, "{} {} {}", SuiteConsoleReport::NAME_EMOJI, self.name, SuiteConsoleReport::NAME_EMOJI)?;
        w.scope(|w| {
            writeln!(w, "{} {}", SuiteConsoleReport::ADDRESS_EMOJI, self.address)?;
            if self.unreachable {
                let unreachable = Classified::Bad("connection failed, nothing was dispatched");
                writeln!(w, "{} {}", SuiteConsoleReport::UNREACHABLE_EMOJI, unreachable.styled())?;
            }
            for invocation in &self.invocations {
                invocation.console_report(w)?;
            }
            Ok(())
        })
    }
}

pub enum InvocationConsoleReport {}
impl InvocationConsoleReport {
    pub const PASS_EMOJI: console::Emoji<'_, '_> = console::Emoji("✅", "PASS");
    pub const FAIL_EMOJI: console::Emoji<'_, '_> = console::Emoji("❌", "FAIL");
    pub const REPEAT_EMOJI: console::Emoji<'_, '_> = console::Emoji("🔁", "x");
    pub const LATENCY_EMOJI: console::Emoji<'_, '_> = console::Emoji("⏱️", "");
}
impl ConsoleReport for InvocationReport {
    fn console_report<W: std::io::Write>(&self, w: &mut ReportWriter<W>) -> Result<(), std::fmt::Error> {
        let side = match self.tally.classify() {
            Classified::Good(()) => InvocationConsoleReport::PASS_EMOJI,
            _ => InvocationConsoleReport::FAIL_EMOJI,
        };
        write!(w, "{} {} ", side, self.tally.classified().apply(&self.method))?;
        if self.workers > 1 {
            write!(w, "{}{} ", InvocationConsoleReport::REPEAT_EMOJI, self.workers)?;
        }
        writeln!(w, "{}", styled_tally(&self.tally))?;

        w.scope(|w| {
            if let Some(summary) = &self.summary {
                writeln!(w, "{} {}", InvocationConsoleReport::LATENCY_EMOJI, console::style(latency(summary)).dim())?;
            }
            for chained in &self.chained {
                chained.console_report(w)?;
            }
            Ok(())
        })
    }
}

fn styled_tally(tally: &Tally) -> String {
    let Tally { dispatched, failed, mismatches } = tally;
    let failed = if *failed > 0 { Classified::Bad(failed) } else { Classified::Good(failed) };
    let mismatches = if *mismatches > 0 { Classified::Warn(mismatches) } else { Classified::Good(mismatches) };
    format!("dispatched={} failed={} mismatch={}", dispatched, failed.styled(), mismatches.styled())
}

fn latency(summary: &LatencySummary) -> String {
    let LatencySummary { count, min, avg, p50, p90, p99, max, .. } = summary;
    format!(
        "latency({} samples): min={:.3?} avg={:.3?} p50={:.3?} p90={:.3?} p99={:.3?} max={:.3?}",
        count, min, avg, p50, p90, p99, max
    )
}

impl<T> Classified<T> {
    pub fn style(&self) -> console::Style {
        match self {
            Classified::Good(_) => console::Style::new().green(),
            Classified::Warn(_) => console::Style::new().yellow(),
            Classified::Bad(_) => console::Style::new().red(),
        }
    }
    pub fn apply<U>(&self, value: U) -> console::StyledObject<U> {
        self.style().apply_to(value)
    }
    pub fn styled(&self) -> console::StyledObject<&T> {
        self.apply(&**self)
    }
}
