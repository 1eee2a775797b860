/// Edit distance at or below which a candidate counts as a near miss
const MAX_DISTANCE: usize = 2;

/// Closest legal value to `value`, if one is near enough to be worth suggesting.
///
/// A case-insensitive match always wins; otherwise the candidate with the smallest
/// Levenshtein distance within [`MAX_DISTANCE`] is returned (first one on ties).
pub fn closest_match<'a, I>(value: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let lowered = value.to_lowercase();
    let mut best: Option<(usize, &'a str)> = None;

    for candidate in candidates {
        if candidate == value {
            continue;
        }
        if candidate.to_lowercase() == lowered {
            return Some(candidate);
        }
        let distance = levenshtein(&lowered, &candidate.to_lowercase());
        if distance <= MAX_DISTANCE && best.is_none_or(|(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    }

    best.map(|(_, candidate)| candidate)
}

/// `did you mean '<x>'?` for the closest candidate
pub fn did_you_mean<'a, I>(value: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    closest_match(value, candidates).map(|c| format!("did you mean '{}'?", c))
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
