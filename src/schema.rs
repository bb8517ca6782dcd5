// Rewire schema - namespaced key-value table for Diesel ORM

diesel::table! {
    kv_entries (key) {
        key -> Text,
        value -> Text,
    }
}
