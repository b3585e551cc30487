//! Summary statistics over a chunk sequence.

use std::fmt;

use manualkit_shared::Chunk;

/// Length statistics (in bytes) of a chunk sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkStats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub median: usize,
    /// Index of the longest chunk (first one on ties).
    pub largest: Option<usize>,
}

impl ChunkStats {
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        if chunks.is_empty() {
            return Self::default();
        }

        let mut lengths: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        let largest = lengths
            .iter()
            .enumerate()
            .fold(None::<(usize, usize)>, |best, (i, &len)| match best {
                Some((_, best_len)) if best_len >= len => best,
                _ => Some((i, len)),
            })
            .map(|(i, _)| i);

        let total: usize = lengths.iter().sum();
        lengths.sort_unstable();
        let mid = lengths.len() / 2;
        let median = if lengths.len() % 2 == 0 {
            (lengths[mid - 1] + lengths[mid]) / 2
        } else {
            lengths[mid]
        };

        Self {
            count: lengths.len(),
            min: lengths[0],
            max: lengths[lengths.len() - 1],
            mean: total as f64 / lengths.len() as f64,
            median,
            largest,
        }
    }
}

impl fmt::Display for ChunkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunks, length min {} / max {} / mean {:.1} / median {}",
            self.count, self.min, self.max, self.mean, self.median
        )?;
        if let Some(i) = self.largest {
            write!(f, ", largest #{i}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(len: usize) -> Chunk {
        Chunk {
            section: 1,
            text: "x".repeat(len),
            overlap: 0,
        }
    }

    #[test]
    fn stats_over_chunks() {
        let chunks = vec![chunk(10), chunk(40), chunk(20), chunk(40)];
        let stats = ChunkStats::from_chunks(&chunks);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 10);
        assert_eq!(stats.max, 40);
        assert_eq!(stats.median, 30);
        assert!((stats.mean - 27.5).abs() < f64::EPSILON);
        assert_eq!(stats.largest, Some(1));
        assert_eq!(
            stats.to_string(),
            "4 chunks, length min 10 / max 40 / mean 27.5 / median 30, largest #1"
        );
    }

    #[test]
    fn odd_count_median() {
        let stats = ChunkStats::from_chunks(&[chunk(5), chunk(1), chunk(9)]);
        assert_eq!(stats.median, 5);
    }

    #[test]
    fn empty_sequence() {
        let stats = ChunkStats::from_chunks(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.largest, None);
    }
}
