//! Reference-data cache and the built-in seed catalog.
//!
//! Muscle groups and exercises are largely static, so conversations read
//! them through a TTL cache instead of hammering the backend on every step.
//! The seed catalog bootstraps a fresh local backend with usable content.

use crate::{Exercise, MuscleGroup, Result};
use once_cell::sync::Lazy;
use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Read-through cache
// ============================================================================

#[derive(Clone, Debug)]
struct Snapshot<T> {
    fetched_at: Instant,
    items: Vec<T>,
}

/// TTL cache over the two catalog lists.
///
/// Snapshots are immutable and replaced whole; the only invalidation is TTL
/// expiry or process restart. Shared across conversations; a race on refill
/// just repopulates the same data.
#[derive(Debug)]
pub struct CatalogCache {
    ttl: Duration,
    groups: Mutex<Option<Snapshot<MuscleGroup>>>,
    exercises: Mutex<Option<Snapshot<Exercise>>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            groups: Mutex::new(None),
            exercises: Mutex::new(None),
        }
    }

    /// Muscle groups, fetching through `fetch` on miss or expiry.
    ///
    /// A failed fetch returns an empty list and leaves the cache unfilled so
    /// the next attempt retries. Callers must treat empty as "cannot
    /// proceed", not as "no groups exist".
    pub fn muscle_groups<F>(&self, fetch: F) -> Vec<MuscleGroup>
    where
        F: FnOnce() -> Result<Vec<MuscleGroup>>,
    {
        Self::read_through(&self.groups, self.ttl, fetch, "muscle groups")
    }

    /// Exercises, fetching through `fetch` on miss or expiry
    pub fn exercises<F>(&self, fetch: F) -> Vec<Exercise>
    where
        F: FnOnce() -> Result<Vec<Exercise>>,
    {
        Self::read_through(&self.exercises, self.ttl, fetch, "exercises")
    }

    fn read_through<T, F>(
        slot: &Mutex<Option<Snapshot<T>>>,
        ttl: Duration,
        fetch: F,
        what: &str,
    ) -> Vec<T>
    where
        T: Clone,
        F: FnOnce() -> Result<Vec<T>>,
    {
        // A panicked writer cannot corrupt a snapshot, so poisoning is safe
        // to shrug off
        let mut guard = match slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(snapshot) = guard.as_ref() {
            if snapshot.fetched_at.elapsed() < ttl {
                tracing::debug!("Catalog cache hit for {}", what);
                return snapshot.items.clone();
            }
            tracing::debug!("Catalog cache for {} expired", what);
        }

        match fetch() {
            Ok(items) => {
                tracing::info!("Fetched {} {} from backend", items.len(), what);
                *guard = Some(Snapshot {
                    fetched_at: Instant::now(),
                    items: items.clone(),
                });
                items
            }
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}. Returning empty list.", what, e);
                Vec::new()
            }
        }
    }
}

// ============================================================================
// Resolution helpers
// ============================================================================

/// Resolve a muscle-group id to its name; unknown ids render as `#id`
pub fn group_name(groups: &[MuscleGroup], id: i64) -> String {
    groups
        .iter()
        .find(|g| g.id == id)
        .map(|g| g.name.clone())
        .unwrap_or_else(|| format!("#{}", id))
}

/// Resolve a list of muscle-group ids, preserving order
pub fn group_names(groups: &[MuscleGroup], ids: &[i64]) -> Vec<String> {
    ids.iter().map(|id| group_name(groups, *id)).collect()
}

/// Resolve an exercise id to its name; unknown ids render as `#id`
pub fn exercise_name(exercises: &[Exercise], id: i64) -> String {
    exercises
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.name.clone())
        .unwrap_or_else(|| format!("#{}", id))
}

// ============================================================================
// Seed catalog
// ============================================================================

/// Catalog content loaded into a fresh local backend
#[derive(Clone, Debug)]
pub struct SeedCatalog {
    pub muscle_groups: Vec<MuscleGroup>,
    pub exercises: Vec<Exercise>,
}

/// Cached seed catalog - built once and reused across all operations
static SEED_CATALOG: Lazy<SeedCatalog> = Lazy::new(build_seed_catalog_internal);

/// Get a reference to the cached seed catalog
pub fn seed_catalog() -> &'static SeedCatalog {
    &SEED_CATALOG
}

/// Builds the seed catalog of muscle groups and exercises
///
/// **Note**: For production use, prefer `seed_catalog()` which returns a
/// cached reference. This function is retained for testing.
pub fn build_seed_catalog() -> SeedCatalog {
    build_seed_catalog_internal()
}

fn build_seed_catalog_internal() -> SeedCatalog {
    // "Forearms" deliberately has no exercises yet, matching a catalog that
    // grows group-first
    let group_names = [
        "Back",
        "Biceps",
        "Chest",
        "Core",
        "Forearms",
        "Legs",
        "Shoulders",
        "Triceps",
    ];

    let muscle_groups: Vec<MuscleGroup> = group_names
        .iter()
        .enumerate()
        .map(|(idx, name)| MuscleGroup {
            id: idx as i64 + 1,
            name: (*name).into(),
        })
        .collect();

    let by_name = |name: &str| {
        muscle_groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.id)
            .unwrap_or(0)
    };

    let raw: [(&str, &str); 15] = [
        ("Pull-up", "Back"),
        ("Barbell Row", "Back"),
        ("Lat Pulldown", "Back"),
        ("Barbell Curl", "Biceps"),
        ("Hammer Curl", "Biceps"),
        ("Bench Press", "Chest"),
        ("Incline Dumbbell Press", "Chest"),
        ("Plank", "Core"),
        ("Hanging Leg Raise", "Core"),
        ("Squat", "Legs"),
        ("Romanian Deadlift", "Legs"),
        ("Leg Press", "Legs"),
        ("Overhead Press", "Shoulders"),
        ("Lateral Raise", "Shoulders"),
        ("Cable Pushdown", "Triceps"),
    ];

    let exercises: Vec<Exercise> = raw
        .iter()
        .enumerate()
        .map(|(idx, (name, group))| Exercise {
            id: idx as i64 + 1,
            name: (*name).into(),
            muscle_group: by_name(group),
        })
        .collect();

    SeedCatalog {
        muscle_groups,
        exercises,
    }
}

impl SeedCatalog {
    /// Validate the seed catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for group in &self.muscle_groups {
            if group.name.is_empty() {
                errors.push(format!("Muscle group {} has empty name", group.id));
            }
            if self
                .muscle_groups
                .iter()
                .filter(|g| g.name == group.name)
                .count()
                > 1
            {
                errors.push(format!("Duplicate muscle group name '{}'", group.name));
            }
        }

        for exercise in &self.exercises {
            if exercise.name.is_empty() {
                errors.push(format!("Exercise {} has empty name", exercise.id));
            }
            if !self
                .muscle_groups
                .iter()
                .any(|g| g.id == exercise.muscle_group)
            {
                errors.push(format!(
                    "Exercise '{}' references non-existent muscle group {}",
                    exercise.name, exercise.muscle_group
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_seed_catalog_validates() {
        let catalog = build_seed_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Seed catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_seed_catalog_covers_scenario_names() {
        let catalog = build_seed_catalog();
        assert!(catalog.muscle_groups.iter().any(|g| g.name == "Back"));
        assert!(catalog.muscle_groups.iter().any(|g| g.name == "Chest"));
        assert!(catalog.exercises.iter().any(|e| e.name == "Pull-up"));
    }

    #[test]
    fn test_cache_serves_snapshot_within_ttl() {
        let cache = CatalogCache::new(Duration::from_secs(3600));
        let calls = AtomicUsize::new(0);

        let fetch = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(build_seed_catalog().muscle_groups)
        };

        let first = cache.muscle_groups(fetch);
        let second = cache.muscle_groups(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        });

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cache_refetches_after_expiry() {
        let cache = CatalogCache::new(Duration::from_secs(0));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache.muscle_groups(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(build_seed_catalog().muscle_groups)
            });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_fetch_failure_returns_empty_and_is_retried() {
        let cache = CatalogCache::new(Duration::from_secs(3600));

        let failed = cache.muscle_groups(|| Err(Error::Backend("down".into())));
        assert!(failed.is_empty());

        // The failure was not cached; a later fetch repopulates
        let recovered = cache.muscle_groups(|| Ok(build_seed_catalog().muscle_groups));
        assert!(!recovered.is_empty());
    }

    #[test]
    fn test_resolution_helpers() {
        let catalog = build_seed_catalog();
        let back = catalog
            .muscle_groups
            .iter()
            .find(|g| g.name == "Back")
            .unwrap();

        assert_eq!(group_name(&catalog.muscle_groups, back.id), "Back");
        assert_eq!(group_name(&catalog.muscle_groups, 999), "#999");

        let pullup = catalog.exercises.iter().find(|e| e.name == "Pull-up").unwrap();
        assert_eq!(exercise_name(&catalog.exercises, pullup.id), "Pull-up");
    }
}
