use crate::index::{Entry, Index, normalize_key};

/// Resolves a key to a single entry. The first entry stored under the key wins.
pub fn lookup<'a>(key: &str, index: &'a Index) -> Option<&'a Entry> {
    index.get(&normalize_key(key))?.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_table;

    #[test]
    fn returns_first_entry_for_key() {
        let index = parse_table("note1\tAB\tvalueX\nnote2\tAB\tvalueW\n").index;
        assert_eq!(lookup("AB", &index), Some(&Entry::new("note1", "valueX")));
        assert_eq!(lookup("AB", &index), Some(&Entry::new("note1", "valueX")));
    }

    #[test]
    fn key_is_normalized_before_lookup() {
        let index = parse_table("CD\tv\n").index;
        assert_eq!(lookup(" cd ", &index).map(|e| e.value.as_str()), Some("v"));
    }

    #[test]
    fn missing_key_is_none() {
        let index = parse_table("CD\tv\n").index;
        assert!(lookup("ZZ", &index).is_none());
        assert!(lookup("", &Index::new()).is_none());
    }

    #[test]
    fn lookup_does_not_touch_index() {
        let index = parse_table("a\tAB\tb\nc\tAB\td\n").index;
        let before = index.clone();
        let _ = lookup("AB", &index);
        assert_eq!(index, before);
    }
}
