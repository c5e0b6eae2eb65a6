/// Longest strictly increasing subsequence of `seq`.
///
/// Returns indices into `seq`, ascending. Runs in O(n log n) using patience piles with
/// predecessor links. Among equally long answers the one ending at the smallest tail value
/// wins, which keeps results deterministic.
pub fn longest_increasing_subsequence(seq: &[usize]) -> Vec<usize> {
    if seq.is_empty() {
        return Vec::new();
    }

    // tails[k] = index in `seq` of the smallest tail of an increasing run of length k + 1.
    let mut tails: Vec<usize> = Vec::with_capacity(seq.len());
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];

    for (i, &value) in seq.iter().enumerate() {
        let pile = tails.partition_point(|&t| seq[t] < value);
        if pile > 0 {
            prev[i] = Some(tails[pile - 1]);
        }
        if pile == tails.len() {
            tails.push(i);
        } else {
            tails[pile] = i;
        }
    }

    let mut out = Vec::with_capacity(tails.len());
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        out.push(i);
        cursor = prev[i];
    }
    out.reverse();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(seq: &[usize]) -> Vec<usize> {
        longest_increasing_subsequence(seq)
            .into_iter()
            .map(|i| seq[i])
            .collect()
    }

    #[test]
    fn empty_and_single() {
        assert!(longest_increasing_subsequence(&[]).is_empty());
        assert_eq!(longest_increasing_subsequence(&[4]), vec![0]);
    }

    #[test]
    fn sorted_input_is_kept_whole() {
        assert_eq!(longest_increasing_subsequence(&[0, 1, 2, 3]), vec![0, 1, 2, 3]);
    }

    #[test]
    fn reversed_input_keeps_one() {
        assert_eq!(longest_increasing_subsequence(&[3, 2, 1, 0]).len(), 1);
    }

    #[test]
    fn rotation_keeps_the_long_run() {
        // C A B E D -> previous positions 2 0 1 4 3
        let got = values(&[2, 0, 1, 4, 3]);
        assert_eq!(got.len(), 3);
        assert_eq!(&got[..2], &[0, 1]);
    }

    #[test]
    fn result_is_strictly_increasing() {
        let seq = [5, 1, 6, 2, 7, 3, 8, 0, 9];
        let got = values(&seq);
        assert_eq!(got, vec![1, 2, 3, 8, 9]);
        assert!(got.windows(2).all(|w| w[0] < w[1]));
    }
}
