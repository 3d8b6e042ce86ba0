//! Scenario discovery
//!
//! Scans the scenarios directory once at startup. Every compose file found
//! becomes a [`Scenario`] named after its file stem.

use crate::state::Scenario;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// File extensions recognised as compose files
pub const SCENARIO_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Scenario directory scanning
pub struct ScenarioService;

impl ScenarioService {
    /// Scan `dir` for compose files, sorted by file name
    ///
    /// A missing or unreadable directory yields an empty list with a warning;
    /// the orchestrator still starts.
    pub fn scan_directory<P: AsRef<Path>>(dir: P) -> Vec<Scenario> {
        let dir = dir.as_ref();

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Scenarios directory unavailable, continuing with no scenarios"
                );
                return Vec::new();
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && Self::is_compose_file(path))
            .collect();
        paths.sort();

        let mut seen = HashSet::new();
        let mut scenarios = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                warn!(
                    scenario = %name,
                    path = %path.display(),
                    "Duplicate scenario name, keeping the first"
                );
                continue;
            }

            let compose_file_path = path.canonicalize().unwrap_or(path);
            debug!(
                scenario = %name,
                path = %compose_file_path.display(),
                "Discovered scenario"
            );
            scenarios.push(Scenario {
                name,
                compose_file_path,
            });
        }

        info!(
            dir = %dir.display(),
            count = scenarios.len(),
            "Scenario scan complete"
        );
        scenarios
    }

    fn is_compose_file(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                SCENARIO_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
    }
}
