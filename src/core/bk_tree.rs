pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[derive(Debug)]
struct BkNode {
    key: String,
    chars: Vec<char>,
    children: Vec<(usize, usize)>,
}

/// Burkhard-Keller tree over index keys. A query with radius `r` only descends
/// into children whose edge distance lies in `[d - r, d + r]`.
#[derive(Debug, Default)]
pub struct BkTree {
    nodes: Vec<BkNode>,
}

impl BkTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the key is already present.
    pub fn insert(&mut self, key: &str) -> bool {
        let chars: Vec<char> = key.chars().collect();
        let new_index = self.nodes.len();

        if self.nodes.is_empty() {
            self.nodes.push(BkNode {
                key: key.to_string(),
                chars,
                children: Vec::new(),
            });
            return true;
        }

        let mut current = 0;
        loop {
            let distance = levenshtein(&self.nodes[current].chars, &chars);
            if distance == 0 {
                return false;
            }

            let next = self.nodes[current]
                .children
                .iter()
                .find(|(edge, _)| *edge == distance)
                .map(|(_, child)| *child);

            match next {
                Some(child) => current = child,
                None => {
                    self.nodes[current].children.push((distance, new_index));
                    self.nodes.push(BkNode {
                        key: key.to_string(),
                        chars,
                        children: Vec::new(),
                    });
                    return true;
                }
            }
        }
    }

    /// All keys within `max_distance` of `query`, nearest first, ties by key.
    pub fn find(&self, query: &str, max_distance: usize) -> Vec<(&str, usize)> {
        let mut found = Vec::new();
        if self.nodes.is_empty() {
            return found;
        }

        let query: Vec<char> = query.chars().collect();
        let mut pending = vec![0];

        while let Some(index) = pending.pop() {
            let node = &self.nodes[index];
            let distance = levenshtein(&node.chars, &query);
            if distance <= max_distance {
                found.push((node.key.as_str(), distance));
            }

            let low = distance.saturating_sub(max_distance);
            let high = distance + max_distance;
            pending.extend(
                node.children
                    .iter()
                    .filter(|(edge, _)| (low..=high).contains(edge))
                    .map(|(_, child)| *child),
            );
        }

        found.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        found
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        levenshtein(&a, &b)
    }

    #[test]
    fn test_levenshtein_distances() {
        assert_eq!(distance("", "aqua"), 4);
        assert_eq!(distance("kitten", "sitting"), 3);
        assert_eq!(distance("paraffinum liqiudum", "paraffinum liquidum"), 2);
        assert_eq!(distance("składniki", "skladniki"), 1);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut tree = BkTree::new();
        assert!(tree.insert("aqua"));
        assert!(tree.insert("glycerin"));
        assert!(!tree.insert("aqua"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_find_matches_linear_scan() {
        let words = [
            "aqua", "glycerin", "glycerol", "parfum", "paraffinum liquidum", "limonene",
            "linalool", "citronellol", "benzyl alcohol", "benzyl salicylate",
        ];
        let mut tree = BkTree::new();
        for word in words {
            tree.insert(word);
        }

        for query in ["glycerine", "parfume", "benzyl alcohl", "xyz"] {
            for radius in 0..4 {
                let mut expected: Vec<(&str, usize)> = words
                    .iter()
                    .map(|w| (*w, distance(w, query)))
                    .filter(|(_, d)| *d <= radius)
                    .collect();
                expected.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
                assert_eq!(tree.find(query, radius), expected, "query {query} radius {radius}");
            }
        }
    }
}
