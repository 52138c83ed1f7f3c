#[cfg(test)]
mod tests {
    use crate::memtable::tests::memtable_with_threshold;

    #[test]
    fn test_snapshot_index_matches_entries() {
        let memtable = memtable_with_threshold(100);
        for i in 0..30 {
            memtable.insert(format!("k{i:02}"), i.to_string()).unwrap();
        }

        let copy = memtable.snapshot_index().unwrap();

        assert_eq!(copy.entries(), memtable.entries().unwrap());
        copy.check_invariants().unwrap();
    }

    #[test]
    fn test_later_writes_not_visible_in_copy() {
        let memtable = memtable_with_threshold(100);
        memtable.insert("a", "1").unwrap();
        memtable.insert("b", "2").unwrap();

        let copy = memtable.snapshot_index().unwrap();

        memtable.insert("a", "changed").unwrap();
        memtable.insert("c", "3").unwrap();
        memtable.delete("b").unwrap();
        memtable.reset().unwrap();

        assert_eq!(copy.search("a").map(String::as_str), Some("1"));
        assert_eq!(copy.search("b").map(String::as_str), Some("2"));
        assert_eq!(copy.search("c"), None);
    }

    #[test]
    fn test_copy_mutation_not_visible_in_memtable() {
        let memtable = memtable_with_threshold(100);
        memtable.insert("a", "1").unwrap();

        let mut copy = memtable.snapshot_index().unwrap();
        copy.insert("a".to_string(), "changed".to_string());
        copy.delete("a");

        assert_eq!(memtable.search("a").unwrap(), Some("1".to_string()));
    }
}
