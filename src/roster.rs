use std::collections::BTreeSet;

use crate::models::{InspectorRow, LiaisonRow, RosterEntry};

pub const OWNER_LIAISON: &str = "Owner Liaison";
pub const HOME_LIAISON: &str = "Home Liaison";
pub const DEFAULT_ROLE: &str = "Inspector";

/// Registered inspectors plus every liaison named in the liaison sheet,
/// unique by (name, role) and sorted by name.
pub fn build_roster(inspectors: &[InspectorRow], liaisons: &[LiaisonRow]) -> Vec<RosterEntry> {
    let mut roster: BTreeSet<RosterEntry> = BTreeSet::new();

    for row in inspectors {
        roster.insert(RosterEntry {
            name: row.employee.clone(),
            role: row.role.clone().unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        });
    }
    for row in liaisons {
        if let Some(name) = &row.owner_liaison {
            roster.insert(RosterEntry {
                name: name.clone(),
                role: OWNER_LIAISON.to_string(),
            });
        }
        if let Some(name) = &row.home_liaison {
            roster.insert(RosterEntry {
                name: name.clone(),
                role: HOME_LIAISON.to_string(),
            });
        }
    }

    roster.into_iter().collect()
}

pub fn is_on_roster(roster: &[RosterEntry], name: &str) -> bool {
    roster.iter().any(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liaison(unit: &str, ol: Option<&str>, hl: Option<&str>) -> LiaisonRow {
        LiaisonRow {
            unit_code: unit.to_string(),
            owner_liaison: ol.map(str::to_string),
            home_liaison: hl.map(str::to_string),
        }
    }

    #[test]
    fn liaisons_become_roles_and_duplicates_collapse() {
        let inspectors = vec![
            InspectorRow {
                employee: "Zoe Park".to_string(),
                role: Some("Inspector".to_string()),
            },
            InspectorRow {
                employee: "Ari Cole".to_string(),
                role: None,
            },
        ];
        let liaisons = vec![
            liaison("A1", Some("Mia Tran"), Some("Zoe Park")),
            liaison("A2", Some("Mia Tran"), None),
        ];

        let roster = build_roster(&inspectors, &liaisons);
        let pairs: Vec<(&str, &str)> = roster
            .iter()
            .map(|e| (e.name.as_str(), e.role.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Ari Cole", DEFAULT_ROLE),
                ("Mia Tran", OWNER_LIAISON),
                ("Zoe Park", HOME_LIAISON),
                ("Zoe Park", "Inspector"),
            ]
        );
        assert!(is_on_roster(&roster, "Mia Tran"));
        assert!(!is_on_roster(&roster, "Nobody"));
    }
}
