//! Visibility rules of a snapshot view.
//!
//! 1. The memtable copy shadows every sorted run, whatever the sequence.
//! 2. A run-only key is visible iff some version has `seq <= ceiling`.
//! 3. Among eligible versions, the highest sequence number wins.
//!
//! ## See also
//! - [`tests_isolation`]: writes after capture stay invisible
//! - [`tests_lifecycle`]: release semantics

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use crate::snapshot::SnapshotView;
    use crate::snapshot::tests::{memtable, run};

    /// # Scenario
    /// Snapshot at sequence 10 over a run holding `x` at sequence 5 and 12.
    ///
    /// # Expected behavior
    /// The sequence-5 value is returned; the sequence-12 version is not yet
    /// visible.
    #[test]
    fn runs__version_above_ceiling_is_invisible() {
        let memtable = memtable();
        let runs = vec![run(1, &[("x", "at5", 5), ("x", "at12", 12)])];

        let view = SnapshotView::capture(&memtable, runs, 10).unwrap();

        assert_eq!(view.get("x").unwrap(), Some("at5".to_string()));
    }

    #[test]
    fn runs__only_versions_above_ceiling_means_not_found() {
        let memtable = memtable();
        let runs = vec![run(1, &[("x", "at12", 12)])];

        let view = SnapshotView::capture(&memtable, runs, 10).unwrap();

        assert_eq!(view.get("x").unwrap(), None);
    }

    #[test]
    fn runs__version_at_ceiling_is_visible() {
        let memtable = memtable();
        let runs = vec![run(1, &[("x", "at10", 10)])];

        let view = SnapshotView::capture(&memtable, runs, 10).unwrap();

        assert_eq!(view.get("x").unwrap(), Some("at10".to_string()));
    }

    #[test]
    fn memtable__shadows_runs_regardless_of_sequence() {
        let memtable = memtable();
        memtable.insert("k", "from_memtable").unwrap();
        let runs = vec![run(1, &[("k", "from_run", 3)])];

        // Ceiling 0: no run version is eligible, memtable still wins.
        let low = SnapshotView::capture(&memtable, runs.clone(), 0).unwrap();
        let high = SnapshotView::capture(&memtable, runs, 100).unwrap();

        assert_eq!(low.get("k").unwrap(), Some("from_memtable".to_string()));
        assert_eq!(high.get("k").unwrap(), Some("from_memtable".to_string()));
    }

    /// # Scenario
    /// A key was overwritten across three tables. The runs are handed to
    /// the view oldest first, so a first-match scan would return the stalest
    /// version.
    ///
    /// # Expected behavior
    /// The newest version at or below the ceiling wins.
    #[test]
    fn runs__highest_eligible_sequence_wins() {
        let memtable = memtable();
        let runs = vec![
            run(1, &[("k", "v2", 2)]),
            run(2, &[("k", "v6", 6)]),
            run(3, &[("k", "v9", 9)]),
        ];

        let view = SnapshotView::capture(&memtable, runs.clone(), 7).unwrap();
        assert_eq!(view.get("k").unwrap(), Some("v6".to_string()));

        let view = SnapshotView::capture(&memtable, runs, 50).unwrap();
        assert_eq!(view.get("k").unwrap(), Some("v9".to_string()));
    }

    #[test]
    fn runs__wide_run_does_not_hide_newer_version() {
        let memtable = memtable();
        // Run 1 spans sequences 1..=40 (e.g. after a merge) but holds an old
        // version of "k"; run 2 holds a newer one.
        let runs = vec![
            run(1, &[("k", "old", 1), ("other", "o", 40)]),
            run(2, &[("k", "new", 20)]),
        ];

        let view = SnapshotView::capture(&memtable, runs, 50).unwrap();

        assert_eq!(view.get("k").unwrap(), Some("new".to_string()));
    }

    #[test]
    fn runs__keys_resolve_independently() {
        let memtable = memtable();
        memtable.insert("m", "mem").unwrap();
        let runs = vec![
            run(1, &[("a", "a1", 1), ("b", "b1", 1)]),
            run(2, &[("b", "b4", 4), ("c", "c4", 4)]),
        ];

        let view = SnapshotView::capture(&memtable, runs, 3).unwrap();

        assert_eq!(view.get("a").unwrap(), Some("a1".to_string()));
        assert_eq!(view.get("b").unwrap(), Some("b1".to_string()));
        assert_eq!(view.get("c").unwrap(), None);
        assert_eq!(view.get("m").unwrap(), Some("mem".to_string()));
        assert_eq!(view.get("zzz").unwrap(), None);
    }

    #[test]
    fn empty__nothing_visible() {
        let memtable = memtable();
        let view = SnapshotView::capture(&memtable, Vec::new(), 0).unwrap();

        assert_eq!(view.get("anything").unwrap(), None);
        assert_eq!(view.run_count(), 0);
    }
}
