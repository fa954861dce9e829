//! Canonicalization of team display names.
//!
//! The match API, the wikis and the bracket site disagree on how teams are
//! spelled (sponsor-branded names, org sub-rosters). Everything that builds
//! a wiki lookup URL goes through these tables first.

/// Corrects a League of Legends display name to its Leaguepedia page name.
pub fn correct_lol_name(name: &str) -> &str {
    match name {
        "Team Liquid Honda" => "Team Liquid",
        "TOPESPORTS" => "Top Esports",
        "KCorp Blue Stars" => "Karmine Corp Blue Stars",
        other => other,
    }
}

/// Corrects a Valorant display name to its Liquipedia page name.
pub fn correct_valorant_name(name: &str) -> &str {
    match name {
        "KARMINE CORP" => "Karmine Corp",
        "Karmine Corp GC" => "Karmine Corp Female",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sponsor_names_are_stripped() {
        assert_eq!(correct_lol_name("Team Liquid Honda"), "Team Liquid");
        assert_eq!(correct_lol_name("TOPESPORTS"), "Top Esports");
    }

    #[test]
    fn org_rosters_map_to_wiki_pages() {
        assert_eq!(correct_lol_name("KCorp Blue Stars"), "Karmine Corp Blue Stars");
    }

    #[test]
    fn main_roster_keeps_its_own_wiki_page() {
        // The LEC roster's page is "Karmine Corp", not the academy team's.
        assert_eq!(correct_lol_name("Karmine Corp"), "Karmine Corp");
        assert_eq!(correct_lol_name("KCorp"), "KCorp");
    }

    #[test]
    fn unknown_names_pass_through() {
        assert_eq!(correct_lol_name("Rival FC"), "Rival FC");
        assert_eq!(correct_valorant_name("FUT Esports"), "FUT Esports");
    }
}
