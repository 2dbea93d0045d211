use std::ops::AddAssign;

use serde::Serialize;

use crate::{
    measure::LatencySummary,
    verify::{Classified, Classify},
};

/// Counts of one worker, or of a whole fan-out once summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash, Serialize)]
pub struct Tally {
    pub dispatched: usize,
    pub failed: usize,
    pub mismatches: usize,
}
impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.dispatched += rhs.dispatched;
        self.failed += rhs.failed;
        self.mismatches += rhs.mismatches;
    }
}

impl Classify for Tally {
    fn classify(&self) -> Classified<()> {
        if self.failed > 0 {
            Classified::Bad(())
        } else if self.mismatches > 0 {
            Classified::Warn(())
        } else {
            Classified::Good(())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize)]
pub struct InvocationReport {
    pub method: String,
    pub workers: usize,
    #[serde(flatten)]
    pub tally: Tally,
    pub summary: Option<LatencySummary>,
    /// `next` first, then each `then` entry in order.
    pub chained: Vec<InvocationReport>,
}
impl InvocationReport {
    /// This report and every chained one, depth first.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &InvocationReport> + '_> {
        Box::new(std::iter::once(self).chain(self.chained.iter().flat_map(|c| c.walk())))
    }

    pub fn total(&self) -> Tally {
        let mut total = Tally::default();
        for report in self.walk() {
            total += report.tally;
        }
        total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize)]
pub struct SuiteReport {
    pub name: String,
    pub address: String,
    /// Connection could not be established, nothing was dispatched.
    pub unreachable: bool,
    pub invocations: Vec<InvocationReport>,
}
impl SuiteReport {
    pub fn total(&self) -> Tally {
        let mut total = Tally::default();
        for report in &self.invocations {
            total += report.total();
        }
        total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize)]
pub struct RunReport {
    pub suites: Vec<SuiteReport>,
}
impl RunReport {
    pub fn total(&self) -> Tally {
        let mut total = Tally::default();
        for suite in &self.suites {
            total += suite.total();
        }
        total
    }
    pub fn failed(&self) -> usize {
        self.total().failed
    }
    pub fn mismatches(&self) -> usize {
        self.total().mismatches
    }
    pub fn unreachable(&self) -> usize {
        self.suites.iter().filter(|s| s.unreachable).count()
    }

    /// Whether a strict run should fail.
    pub fn is_dirty(&self) -> bool {
        self.failed() > 0 || self.mismatches() > 0 || self.unreachable() > 0
    }
}
