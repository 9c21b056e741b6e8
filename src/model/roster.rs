use serde::Serialize;

/// Display names and access codes of everyone invited to vote.
const ROSTER_RAW: [(&str, &str); 22] = [
    ("Andreia", "8403"),
    ("Augusto", "8765"),
    ("Berin", "8378"),
    ("Binho", "3088"),
    ("Chafi", "1508"),
    ("Cláudio", "2974"),
    ("Fafá", "3569"),
    ("Fernanda", "2862"),
    ("Gisele", "5858"),
    ("Gugu", "1123"),
    ("Jezer", "2356"),
    ("Juliane", "6428"),
    ("Julio", "8723"),
    ("Kelen", "9706"),
    ("Nani", "7245"),
    ("Paula do Berin", "2453"),
    ("Paula do Jezer", "9862"),
    ("Rafael", "2976"),
    ("Rodrigo", "9322"),
    ("Rosana", "8762"),
    ("Sharon", "8692"),
    ("Soraia", "2722"),
];

/// A registered participant: both a voter and a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    /// Secret login code, never serialized.
    #[serde(skip)]
    code: String,
}

impl Participant {
    fn new(name: &str, code: &str) -> Self {
        Self {
            id: participant_id(name),
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    /// Check a submitted login code against this participant's code.
    pub fn verify_code(&self, code: &str) -> bool {
        self.code == code
    }
}

/// Derive the stable participant ID from a display name: lower-cased, with
/// every run of whitespace, leading and trailing runs included, replaced by a
/// single hyphen.
pub fn participant_id(name: &str) -> String {
    let mut id = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.to_lowercase().chars() {
        if c.is_whitespace() {
            if !in_space {
                id.push('-');
            }
            in_space = true;
        } else {
            id.push(c);
            in_space = false;
        }
    }
    id
}

/// The fixed list of participants.
#[derive(Debug, Clone)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    /// The compiled-in roster.
    pub fn builtin() -> Self {
        Self::from_entries(ROSTER_RAW.iter().copied())
    }

    /// Build a roster from `(name, code)` pairs.
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let participants = entries
            .into_iter()
            .map(|(name, code)| Participant::new(name, code))
            .collect();
        Self { participants }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Display name for the given ID, falling back to the ID itself.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.get(id).map(|p| p.name.as_str()).unwrap_or(id)
    }

    /// Case-insensitive substring search on display names.
    /// An empty query matches nobody.
    pub fn search(&self, query: &str) -> Vec<&Participant> {
        if query.is_empty() {
            return Vec::new();
        }
        let query = query.to_lowercase();
        self.participants
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Everyone a given participant may vote for.
    pub fn candidates_for<'a>(&'a self, voter_id: &'a str) -> impl Iterator<Item = &'a Participant> {
        self.participants.iter().filter(move |p| p.id != voter_id)
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn ids_are_derived_from_names() {
        assert_eq!(participant_id("Andreia"), "andreia");
        assert_eq!(participant_id("Paula do Berin"), "paula-do-berin");
        assert_eq!(participant_id("Paula   do\tJezer"), "paula-do-jezer");
        assert_eq!(participant_id("Cláudio"), "cláudio");
        assert_eq!(participant_id(" Paula do Berin\n"), "-paula-do-berin-");
    }

    #[test]
    fn builtin_roster_is_unique() {
        let roster = Roster::builtin();
        assert_eq!(roster.participants().len(), 22);
        let ids = roster
            .participants()
            .iter()
            .map(|p| p.id.as_str())
            .collect::<HashSet<_>>();
        assert_eq!(ids.len(), 22);
    }

    #[test]
    fn codes_are_checked() {
        let roster = Roster::builtin();
        let andreia = roster.get("andreia").unwrap();
        assert!(andreia.verify_code("8403"));
        assert!(!andreia.verify_code("8765"));
        assert!(!andreia.verify_code(""));
    }

    #[test]
    fn search_is_case_insensitive() {
        let roster = Roster::builtin();
        let names = roster
            .search("PAULA")
            .into_iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Paula do Berin", "Paula do Jezer"]);
        assert!(roster.search("").is_empty());
        assert!(roster.search("nobody").is_empty());
    }

    #[test]
    fn candidates_exclude_the_voter() {
        let roster = Roster::builtin();
        let candidates = roster.candidates_for("andreia").collect::<Vec<_>>();
        assert_eq!(candidates.len(), 21);
        assert!(candidates.iter().all(|p| p.id != "andreia"));
    }

    #[test]
    fn codes_are_not_serialized() {
        let roster = Roster::builtin();
        let json = rocket::serde::json::serde_json::to_value(roster.get("augusto").unwrap())
            .unwrap();
        assert_eq!(
            json,
            rocket::serde::json::serde_json::json!({"id": "augusto", "name": "Augusto"})
        );
    }
}
