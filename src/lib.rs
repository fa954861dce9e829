//! Match schedule pipeline for the Karmine Corp calendar: discovery from
//! the Riot esports API and the second-division bracket, wiki-backed
//! enrichment, and lifecycle upkeep of the stored matches.

pub mod discovery;
pub mod enrichment;
pub mod live_results;
pub mod run_cache;
pub mod scheduler;
pub mod stats_refresh;
pub mod status_sweep;
pub mod tasks;

/// Tag carried by the organization's team codes on the Riot API.
pub const ORG_CODE: &str = "KC";

/// True for any of the organization's rosters, whatever the source spells.
pub fn is_org_team(name: &str) -> bool {
    let upper = name.to_uppercase();
    upper.contains("KARMINE") || upper.contains("KCORP")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn org_detection_covers_all_spellings() {
        assert!(is_org_team("Karmine Corp"));
        assert!(is_org_team("KARMINE CORP"));
        assert!(is_org_team("KCorp Blue Stars"));
        assert!(!is_org_team("Fnatic"));
    }
}
