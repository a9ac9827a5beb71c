//! Device preferences and search history. Never synced.

use dormglide_shared::constants::{KEY_PREFERENCES, MAX_SEARCH_HISTORY};
use dormglide_shared::Preferences;

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Stored preferences, or the defaults when none were saved.
    pub fn get_preferences(&self) -> Result<Preferences> {
        self.read_json_or_default(KEY_PREFERENCES)
    }

    pub fn save_preferences(&self, prefs: &Preferences) -> Result<()> {
        self.write_json(KEY_PREFERENCES, prefs)
    }

    /// Push `term` to the front of the search history. Blank terms are
    /// ignored and an existing identical entry moves to the front.
    pub fn add_search_term(&self, term: &str) -> Result<()> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(());
        }
        let mut prefs = self.get_preferences()?;
        prefs.search_history.retain(|t| t != term);
        prefs.search_history.insert(0, term.to_string());
        prefs.search_history.truncate(MAX_SEARCH_HISTORY);
        self.save_preferences(&prefs)
    }

    pub fn search_history(&self) -> Result<Vec<String>> {
        Ok(self.get_preferences()?.search_history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent() {
        let db = Database::open_in_memory().unwrap();
        let prefs = db.get_preferences().unwrap();
        assert_eq!(prefs.theme, "light");
        assert!(prefs.notifications);
    }

    #[test]
    fn search_history_dedupes_and_caps() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..12 {
            db.add_search_term(&format!("term {i}")).unwrap();
        }
        db.add_search_term("  term 5 ").unwrap();
        db.add_search_term("   ").unwrap();

        let history = db.search_history().unwrap();
        assert_eq!(history.len(), MAX_SEARCH_HISTORY);
        assert_eq!(history[0], "term 5");
        assert_eq!(history[1], "term 11");
        assert_eq!(history.iter().filter(|t| *t == "term 5").count(), 1);
    }

    #[test]
    fn saved_theme_survives_history_updates() {
        let db = Database::open_in_memory().unwrap();
        db.save_preferences(&Preferences {
            theme: "dark".into(),
            ..Default::default()
        })
        .unwrap();
        db.add_search_term("lamp").unwrap();
        let prefs = db.get_preferences().unwrap();
        assert_eq!(prefs.theme, "dark");
        assert_eq!(prefs.search_history, ["lamp"]);
    }
}
