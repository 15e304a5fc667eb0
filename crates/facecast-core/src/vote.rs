//! Majority vote over matched known encodings.

use crate::known::KnownFaceSet;
use crate::matcher::Matcher;
use crate::types::{Embedding, UNKNOWN_LABEL};

/// Per-name match counts, kept in first-seen order.
#[derive(Debug, Default)]
pub struct Tally<'a> {
    counts: Vec<(&'a str, usize)>,
}

impl<'a> Tally<'a> {
    pub fn add(&mut self, name: &'a str) {
        match self.counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((name, 1)),
        }
    }

    /// Name with the most votes. Ties go to the name added first.
    pub fn winner(&self) -> Option<&'a str> {
        let mut best: Option<(&'a str, usize)> = None;
        for &(name, count) in &self.counts {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((name, count));
            }
        }
        best.map(|(name, _)| name)
    }
}

/// Pick the known identity for a set of per-encoding match flags.
///
/// `matches[i]` corresponds to `names[i]`. Returns `None` when nothing matched.
pub fn vote<'a>(matches: &[bool], names: &'a [String]) -> Option<&'a str> {
    let mut tally = Tally::default();
    for (matched, name) in matches.iter().zip(names) {
        if *matched {
            tally.add(name);
        }
    }
    tally.winner()
}

/// Label one probe embedding against the known set, falling back to [`UNKNOWN_LABEL`].
pub fn label_face(known: &KnownFaceSet, matcher: &dyn Matcher, probe: &Embedding) -> String {
    let matches = matcher.compare_faces(known.encodings(), probe);
    vote(&matches, known.names())
        .unwrap_or(UNKNOWN_LABEL)
        .to_string()
}
