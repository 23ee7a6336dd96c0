//! Vote aggregation for the multi-classifier ensemble

use crate::models::classifier::ClassifierId;
use crate::types::response::Confidence;

/// Ordinals emitted by each classifier for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    /// `(ordinal, count)` in the order each ordinal was first seen
    counts: Vec<(usize, usize)>,
    /// Individual votes in registry order
    votes: Vec<(ClassifierId, usize)>,
}

/// Winning ordinal with its support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub ordinal: usize,
    pub count: usize,
    pub total: usize,
    /// First classifier that voted for the winner
    pub first_voter: ClassifierId,
}

impl Verdict {
    pub fn confidence(&self) -> Confidence {
        Confidence::from_votes(self.count, self.total)
    }
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classifier's vote. Callers record in registry order.
    pub fn record(&mut self, classifier: ClassifierId, ordinal: usize) {
        self.votes.push((classifier, ordinal));
        match self.counts.iter_mut().find(|(o, _)| *o == ordinal) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((ordinal, 1)),
        }
    }

    pub fn votes(&self) -> &[(ClassifierId, usize)] {
        &self.votes
    }

    pub fn total(&self) -> usize {
        self.votes.len()
    }

    pub fn count(&self, ordinal: usize) -> usize {
        self.counts
            .iter()
            .find(|(o, _)| *o == ordinal)
            .map_or(0, |(_, c)| *c)
    }

    /// Majority winner, or `None` for an empty tally.
    ///
    /// Only a strictly higher count displaces the current leader, so ties go
    /// to the ordinal voted for earliest in registry order.
    pub fn majority(&self) -> Option<Verdict> {
        let mut best: Option<(usize, usize)> = None;
        for &(ordinal, count) in &self.counts {
            match best {
                Some((_, top)) if count <= top => {}
                _ => best = Some((ordinal, count)),
            }
        }

        let (ordinal, count) = best?;
        let first_voter = self
            .votes
            .iter()
            .find(|(_, o)| *o == ordinal)
            .map(|(id, _)| *id)?;

        Some(Verdict {
            ordinal,
            count,
            total: self.total(),
            first_voter,
        })
    }

    /// Whether every classifier voted for the same ordinal.
    pub fn is_unanimous(&self) -> bool {
        self.counts.len() == 1
    }
}
