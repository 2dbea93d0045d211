use std::{fmt::Display, slice::Iter as SliceIter, vec::IntoIter as VecIntoIter};

/// Observations collected while verifying one response. Collecting never stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Messages<M>(Vec<M>);
impl<M> Default for Messages<M> {
    fn default() -> Self {
        // derive(Default) requires M: Default
        Self(Vec::new())
    }
}
impl<M: Display> Display for Messages<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const SHOWN: usize = 3;
        let lines: Vec<_> = self.0.iter().take(SHOWN).map(ToString::to_string).collect();
        write!(f, "{}", lines.join("\n"))?;
        if self.0.len() > SHOWN {
            write!(f, "\n... and {} more", self.0.len() - SHOWN)?;
        }
        Ok(())
    }
}
impl<M> IntoIterator for Messages<M> {
    type Item = M;
    type IntoIter = VecIntoIter<M>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
impl<'a, M> IntoIterator for &'a Messages<M> {
    type Item = &'a M;
    type IntoIter = SliceIter<'a, M>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
impl<M> From<Vec<M>> for Messages<M> {
    fn from(value: Vec<M>) -> Self {
        Self(value)
    }
}
impl<M> FromIterator<M> for Messages<M> {
    fn from_iter<T: IntoIterator<Item = M>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
impl<M> Extend<M> for Messages<M> {
    fn extend<T: IntoIterator<Item = M>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl<M> Messages<M> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, message: M) {
        self.0.push(message)
    }

    pub fn iter(&self) -> SliceIter<'_, M> {
        self.0.iter()
    }
    pub fn as_slice(&self) -> &[M] {
        &self.0
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
