//! Skiing activity classification
//!
//! Activities gate which objects may cluster together: two objects can only
//! end up in the same ski area if they share at least one activity.

use serde::{Deserialize, Serialize};

/// Skiing activity a run, lift or ski area supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Downhill,
    Nordic,
}

/// Order-stable, deduplicated union of two activity sets.
pub fn union(a: &[Activity], b: &[Activity]) -> Vec<Activity> {
    let mut out = a.to_vec();
    out.dedup();
    for activity in b {
        if !out.contains(activity) {
            out.push(*activity);
        }
    }
    out
}

/// Activities present in both sets, in the order of `a`.
pub fn intersect(a: &[Activity], b: &[Activity]) -> Vec<Activity> {
    let mut out: Vec<Activity> = a.iter().filter(|x| b.contains(x)).copied().collect();
    out.dedup();
    out
}

/// Whether the two sets share at least one activity.
pub fn shares_any(a: &[Activity], b: &[Activity]) -> bool {
    a.iter().any(|x| b.contains(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use Activity::{Downhill, Nordic};

    #[test]
    fn union_deduplicates_and_preserves_order() {
        assert_eq!(union(&[Downhill], &[Nordic, Downhill]), vec![Downhill, Nordic]);
        assert_eq!(union(&[], &[Nordic]), vec![Nordic]);
    }

    #[test]
    fn intersect_keeps_shared_activities() {
        assert_eq!(intersect(&[Downhill, Nordic], &[Nordic]), vec![Nordic]);
        assert!(intersect(&[Downhill], &[Nordic]).is_empty());
    }

    #[test]
    fn shares_any_is_false_for_empty_sets() {
        assert!(!shares_any(&[], &[Downhill]));
        assert!(shares_any(&[Downhill, Nordic], &[Nordic]));
    }
}
