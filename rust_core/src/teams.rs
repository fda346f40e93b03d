//! NFL franchise registry.
//!
//! This module provides:
//! - Static table of the 32 franchises (code, name, conference, division)
//! - Normalization of historical and alternate team codes

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conference {
    Afc,
    Nfc,
}

/// One franchise.
#[derive(Debug, Clone, Serialize)]
pub struct TeamInfo {
    /// Canonical code (e.g., "KC")
    pub code: &'static str,
    /// Full franchise name
    pub name: &'static str,
    pub conference: Conference,
    /// Division label (e.g., "AFC West")
    pub division: &'static str,
}

/// Static configuration for all 32 franchises.
pub static NFL_TEAMS: &[TeamInfo] = &[
    TeamInfo {
        code: "ARI",
        name: "Arizona Cardinals",
        conference: Conference::Nfc,
        division: "NFC West",
    },
    TeamInfo {
        code: "ATL",
        name: "Atlanta Falcons",
        conference: Conference::Nfc,
        division: "NFC South",
    },
    TeamInfo {
        code: "BAL",
        name: "Baltimore Ravens",
        conference: Conference::Afc,
        division: "AFC North",
    },
    TeamInfo {
        code: "BUF",
        name: "Buffalo Bills",
        conference: Conference::Afc,
        division: "AFC East",
    },
    TeamInfo {
        code: "CAR",
        name: "Carolina Panthers",
        conference: Conference::Nfc,
        division: "NFC South",
    },
    TeamInfo {
        code: "CHI",
        name: "Chicago Bears",
        conference: Conference::Nfc,
        division: "NFC North",
    },
    TeamInfo {
        code: "CIN",
        name: "Cincinnati Bengals",
        conference: Conference::Afc,
        division: "AFC North",
    },
    TeamInfo {
        code: "CLE",
        name: "Cleveland Browns",
        conference: Conference::Afc,
        division: "AFC North",
    },
    TeamInfo {
        code: "DAL",
        name: "Dallas Cowboys",
        conference: Conference::Nfc,
        division: "NFC East",
    },
    TeamInfo {
        code: "DEN",
        name: "Denver Broncos",
        conference: Conference::Afc,
        division: "AFC West",
    },
    TeamInfo {
        code: "DET",
        name: "Detroit Lions",
        conference: Conference::Nfc,
        division: "NFC North",
    },
    TeamInfo {
        code: "GB",
        name: "Green Bay Packers",
        conference: Conference::Nfc,
        division: "NFC North",
    },
    TeamInfo {
        code: "HOU",
        name: "Houston Texans",
        conference: Conference::Afc,
        division: "AFC South",
    },
    TeamInfo {
        code: "IND",
        name: "Indianapolis Colts",
        conference: Conference::Afc,
        division: "AFC South",
    },
    TeamInfo {
        code: "JAX",
        name: "Jacksonville Jaguars",
        conference: Conference::Afc,
        division: "AFC South",
    },
    TeamInfo {
        code: "KC",
        name: "Kansas City Chiefs",
        conference: Conference::Afc,
        division: "AFC West",
    },
    TeamInfo {
        code: "LAC",
        name: "Los Angeles Chargers",
        conference: Conference::Afc,
        division: "AFC West",
    },
    TeamInfo {
        code: "LAR",
        name: "Los Angeles Rams",
        conference: Conference::Nfc,
        division: "NFC West",
    },
    TeamInfo {
        code: "LV",
        name: "Las Vegas Raiders",
        conference: Conference::Afc,
        division: "AFC West",
    },
    TeamInfo {
        code: "MIA",
        name: "Miami Dolphins",
        conference: Conference::Afc,
        division: "AFC East",
    },
    TeamInfo {
        code: "MIN",
        name: "Minnesota Vikings",
        conference: Conference::Nfc,
        division: "NFC North",
    },
    TeamInfo {
        code: "NE",
        name: "New England Patriots",
        conference: Conference::Afc,
        division: "AFC East",
    },
    TeamInfo {
        code: "NO",
        name: "New Orleans Saints",
        conference: Conference::Nfc,
        division: "NFC South",
    },
    TeamInfo {
        code: "NYG",
        name: "New York Giants",
        conference: Conference::Nfc,
        division: "NFC East",
    },
    TeamInfo {
        code: "NYJ",
        name: "New York Jets",
        conference: Conference::Afc,
        division: "AFC East",
    },
    TeamInfo {
        code: "PHI",
        name: "Philadelphia Eagles",
        conference: Conference::Nfc,
        division: "NFC East",
    },
    TeamInfo {
        code: "PIT",
        name: "Pittsburgh Steelers",
        conference: Conference::Afc,
        division: "AFC North",
    },
    TeamInfo {
        code: "SEA",
        name: "Seattle Seahawks",
        conference: Conference::Nfc,
        division: "NFC West",
    },
    TeamInfo {
        code: "SF",
        name: "San Francisco 49ers",
        conference: Conference::Nfc,
        division: "NFC West",
    },
    TeamInfo {
        code: "TB",
        name: "Tampa Bay Buccaneers",
        conference: Conference::Nfc,
        division: "NFC South",
    },
    TeamInfo {
        code: "TEN",
        name: "Tennessee Titans",
        conference: Conference::Afc,
        division: "AFC South",
    },
    TeamInfo {
        code: "WAS",
        name: "Washington Commanders",
        conference: Conference::Nfc,
        division: "NFC East",
    },
];

/// Relocated franchises and alternate feed spellings.
static CODE_ALIASES: &[(&str, &str)] = &[
    ("LA", "LAR"),
    ("STL", "LAR"),
    ("SD", "LAC"),
    ("OAK", "LV"),
    ("JAC", "JAX"),
    ("WSH", "WAS"),
];

/// Map a code to its canonical form. Unknown codes come back unchanged
/// (uppercased) so the caller decides whether to reject them.
pub fn normalize_team_code(code: &str) -> String {
    let upper = code.trim().to_ascii_uppercase();
    CODE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(upper)
}

/// Get franchise info by code (aliases accepted, case-insensitive).
pub fn get_team(code: &str) -> Option<&'static TeamInfo> {
    let canonical = normalize_team_code(code);
    NFL_TEAMS.iter().find(|t| t.code == canonical)
}

pub fn is_known_team(code: &str) -> bool {
    get_team(code).is_some()
}

/// Get all canonical team codes.
pub fn get_all_team_codes() -> Vec<&'static str> {
    NFL_TEAMS.iter().map(|t| t.code).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_thirty_two_unique_codes() {
        let codes: HashSet<_> = get_all_team_codes().into_iter().collect();
        assert_eq!(codes.len(), 32);
        assert_eq!(NFL_TEAMS.len(), 32);
    }

    #[test]
    fn test_case_insensitivity_and_aliases() {
        assert_eq!(get_team("kc").unwrap().name, "Kansas City Chiefs");
        assert_eq!(get_team("OAK").unwrap().code, "LV");
        assert_eq!(get_team("la").unwrap().code, "LAR");
        assert_eq!(normalize_team_code(" wsh "), "WAS");
    }

    #[test]
    fn test_missing_team() {
        assert!(get_team("XYZ").is_none());
        assert!(!is_known_team(""));
    }

    #[test]
    fn test_sixteen_per_conference() {
        let afc = NFL_TEAMS.iter().filter(|t| t.conference == Conference::Afc).count();
        assert_eq!(afc, 16);
    }
}
