use crate::storage::KeyValueStore;
use shared::Theme;

pub const THEME_KEY: &str = "theme";

/// Saved preference, if any. Unknown values count as unset.
pub fn load_theme(store: &dyn KeyValueStore) -> Option<Theme> {
    let raw = match store.get(THEME_KEY) {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!("could not read theme preference: {}", e);
            return None;
        }
    };
    serde_json::from_str::<Theme>(&raw)
        .ok()
        .or_else(|| raw.parse().ok())
}

pub fn save_theme(store: &dyn KeyValueStore, theme: Theme) {
    let value = match serde_json::to_string(&theme) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("failed to serialize theme: {}", e);
            return;
        }
    };
    if let Err(e) = store.set(THEME_KEY, &value) {
        tracing::warn!("failed to save theme preference: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_theme_round_trip_and_fallbacks() {
        let store = MemoryStore::new();
        assert_eq!(load_theme(&store), None);

        save_theme(&store, Theme::Dark);
        assert_eq!(load_theme(&store), Some(Theme::Dark));

        // Bare value as written by older builds
        store.set(THEME_KEY, "light").unwrap();
        assert_eq!(load_theme(&store), Some(Theme::Light));

        store.set(THEME_KEY, "\"sepia\"").unwrap();
        assert_eq!(load_theme(&store), None);
    }
}
