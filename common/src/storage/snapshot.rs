use chrono::{DateTime, Utc};

/// Inventory snapshots are named `gcp_inventory_<YYYYMMDD-HHMMSS>.json`.
/// The timestamp keeps lexicographic and chronological order aligned, which
/// the ledger relies on when picking the most recent ingestion.
pub const SNAPSHOT_FILE_PREFIX: &str = "gcp_inventory_";
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

pub fn snapshot_file_name(at: DateTime<Utc>) -> String {
    format!(
        "{}{}.json",
        SNAPSHOT_FILE_PREFIX,
        at.format(SNAPSHOT_TIMESTAMP_FORMAT)
    )
}

/// Whether an object file name looks like an inventory snapshot. The ledger
/// object also lives under the snapshot prefix and must not be mistaken for one.
pub fn is_snapshot_file(file_name: &str) -> bool {
    file_name.starts_with(SNAPSHOT_FILE_PREFIX) && file_name.ends_with(".json")
}

/// Final path segment of a logical object location `"a/b/c.json"` -> `"c.json"`.
pub fn object_file_name(location: &str) -> &str {
    location.rsplit_once('/').map_or(location, |(_, name)| name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn snapshot_names_embed_the_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 9).unwrap();
        let name = snapshot_file_name(at);
        assert_eq!(name, "gcp_inventory_20240305-143009.json");
        assert!(is_snapshot_file(&name));
    }

    #[test]
    fn snapshot_names_sort_chronologically() {
        let earlier = snapshot_file_name(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());
        let later = snapshot_file_name(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn ledger_object_is_not_a_snapshot() {
        assert!(!is_snapshot_file("ingestion_log.json"));
        assert!(!is_snapshot_file("gcp_inventory_20240305-143009.txt"));
    }

    #[test]
    fn object_file_name_strips_the_prefix() {
        assert_eq!(
            object_file_name("inventory/gcp_inventory_20240305-143009.json"),
            "gcp_inventory_20240305-143009.json"
        );
        assert_eq!(object_file_name("plain.json"), "plain.json");
    }
}
