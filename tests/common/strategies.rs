use proptest::prelude::*;

/// Strategy for generating item lists of up to 200 items
pub fn items_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(any::<i64>(), 0..200)
}

/// Strategy for generating chunk sizes
pub fn chunk_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=25
}

/// Strategy for generating exit codes, mostly well-known ones
pub fn exit_code_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("COMPLETED".to_string()),
        Just("FAILED".to_string()),
        Just("STOPPED".to_string()),
        Just("NOOP".to_string()),
        "[A-Z][A-Z ]{0,20}",
    ]
}

/// Strategy for generating exit code patterns with `*` and `?` wildcards
pub fn pattern_strategy() -> impl Strategy<Value = String> {
    "[A-Z*?]{0,8}"
}

