use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zmanim::{Engine, EventPatternMapping, ZmanDefinition, ZmanimError};

/// One `*.json` file of zman definitions and event patterns
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormulaSet {
    #[serde(default)]
    pub zmanim: Vec<ZmanDefinition>,
    #[serde(default)]
    pub event_patterns: Vec<EventPatternMapping>,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("cannot walk workspace: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid formula set {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {source}")]
    Engine {
        path: PathBuf,
        #[source]
        source: ZmanimError,
    },
}

/// Load every `*.json` formula set under `workdir` into `engine`
///
/// Files are loaded in path order so registration order, and with it the
/// order of batch results, is stable. Returns the number of files loaded.
pub fn load_workspace(engine: &mut Engine, workdir: &Path) -> Result<usize, WorkspaceError> {
    let mut file_count = 0;
    for entry in WalkDir::new(workdir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|s| s.to_str()) != Some("json")
        {
            continue;
        }

        let set = read_formula_set(path)?;
        engine
            .add_zmanim(set.zmanim)
            .and_then(|_| engine.add_event_patterns(set.event_patterns))
            .map_err(|source| WorkspaceError::Engine {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(path = %path.display(), "loaded formula set");
        file_count += 1;
    }
    Ok(file_count)
}

fn read_formula_set(path: &Path) -> Result<FormulaSet, WorkspaceError> {
    let text = fs::read_to_string(path).map_err(|source| WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| WorkspaceError::Json {
        path: path.to_path_buf(),
        source,
    })
}
