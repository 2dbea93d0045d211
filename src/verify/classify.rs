use std::{ops::Deref, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Classified<T> {
    Good(T),
    Warn(T),
    Bad(T),
}
impl<T> Deref for Classified<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        match self {
            Classified::Good(t) => t,
            Classified::Warn(t) => t,
            Classified::Bad(t) => t,
        }
    }
}

pub trait Classify {
    fn classify(&self) -> Classified<()>;
    fn classified(self) -> Classified<Self>
    where
        Self: Sized,
    {
        match self.classify() {
            Classified::Good(()) => Classified::Good(self),
            Classified::Warn(()) => Classified::Warn(self),
            Classified::Bad(()) => Classified::Bad(self),
        }
    }
}

/// Elapsed time of one call against its latency ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cost {
    pub elapsed: Duration,
    pub ceiling: Duration,
}
impl Classify for Cost {
    fn classify(&self) -> Classified<()> {
        if self.elapsed >= self.ceiling {
            Classified::Bad(())
        } else if self.elapsed.saturating_mul(4) >= self.ceiling.saturating_mul(3) {
            Classified::Warn(())
        } else {
            Classified::Good(())
        }
    }
}
