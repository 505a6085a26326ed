//! Typo-tolerant name resolution.
//!
//! Similarity is the edit-distance ratio `1 - distance / longer_len`, so it
//! lands in `[0.0, 1.0]` and identical names score `1.0`.

/// Default acceptance threshold. A name must score strictly above it.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Return the known name most similar to `candidate`, if its score exceeds
/// `threshold`. Ties go to the first name in iteration order.
pub fn most_similar<'a, I>(candidate: &str, known_names: I, threshold: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, f64)> = None;

    for name in known_names {
        let score = similarity(candidate, name);
        let better = match best {
            Some((_, top)) => score > top,
            None => true,
        };
        if better {
            best = Some((name, score));
        }
    }

    best.filter(|(_, score)| *score > threshold).map(|(name, _)| name)
}

#[allow(clippy::cast_precision_loss)]
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

/// Two-row Levenshtein distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (ca, row) in a.iter().zip(1..) {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(row);
        let mut left = row;
        for (cb, pair) in b.iter().zip(prev.windows(2)) {
            if let &[diag, up] = pair {
                let cost = usize::from(ca != cb);
                left = (diag + cost).min(up + 1).min(left + 1);
                curr.push(left);
            }
        }
        prev = curr;
    }

    prev.last().copied().unwrap_or(0)
}
