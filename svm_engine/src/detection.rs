//! Game detection against per-engine tables of file fingerprints.

use anyhow::Result;
use bitflags::bitflags;
use serde::Serialize;
use svm_formats::DirectoryScan;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct GameFlags: u32 {
        const UNSTABLE = 0x01;
        const UNSUPPORTED = 0x02;
        const DEMO = 0x04;
    }
}

impl GameFlags {
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

/// One file a game variant must ship. `None` means the value is not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRequirement {
    pub name: &'static str,
    pub hash: Option<&'static str>,
    pub size: Option<u64>,
}

impl FileRequirement {
    pub const fn any(name: &'static str) -> Self {
        FileRequirement {
            name,
            hash: None,
            size: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GameDescription {
    pub game_id: &'static str,
    pub title: &'static str,
    pub extra: &'static str,
    pub files: &'static [FileRequirement],
    pub language: &'static str,
    pub platform: &'static str,
    pub flags: GameFlags,
}

impl GameDescription {
    /// File the engine loads its data from.
    pub fn data_file(&self) -> Option<&'static str> {
        self.files.first().map(|f| f.name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectedGame {
    pub engine_id: &'static str,
    pub game_id: &'static str,
    pub title: &'static str,
    pub extra: &'static str,
    pub language: &'static str,
    pub platform: &'static str,
    pub flags: Vec<&'static str>,
    pub matched_files: usize,
    #[serde(skip)]
    pub description: &'static GameDescription,
}

/// Table entry whose files were only partly present or did not match.
#[derive(Debug, Clone, Serialize)]
pub struct UnknownVariant {
    pub engine_id: &'static str,
    pub game_id: &'static str,
    pub missing: Vec<String>,
    pub mismatched: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionReport {
    pub matches: Vec<DetectedGame>,
    pub unknown: Vec<UnknownVariant>,
}

impl DetectionReport {
    pub fn extend(&mut self, other: DetectionReport) {
        self.matches.extend(other.matches);
        self.unknown.extend(other.unknown);
    }

    pub fn best(&self) -> Option<&DetectedGame> {
        self.matches.first()
    }
}

/// Matches `table` against a scanned directory. Full matches are ordered by
/// how many files they check; any match checking fewer files than the best
/// one is dropped.
pub fn detect(
    engine_id: &'static str,
    table: &'static [GameDescription],
    scan: &DirectoryScan,
) -> Result<DetectionReport> {
    let mut report = DetectionReport::default();
    for description in table {
        let mut missing = Vec::new();
        let mut mismatched = Vec::new();
        let mut present = 0;
        for requirement in description.files {
            let Some(file) = scan.file(requirement.name) else {
                missing.push(requirement.name.to_string());
                continue;
            };
            present += 1;
            if requirement.size.is_some_and(|size| size != file.size) {
                mismatched.push(requirement.name.to_string());
                continue;
            }
            if let Some(expected) = requirement.hash {
                let actual = scan.fingerprint(requirement.name)?;
                if actual.map(|fp| fp.hash) != Some(expected.to_string()) {
                    mismatched.push(requirement.name.to_string());
                }
            }
        }

        if missing.is_empty() && mismatched.is_empty() {
            report.matches.push(DetectedGame {
                engine_id,
                game_id: description.game_id,
                title: description.title,
                extra: description.extra,
                language: description.language,
                platform: description.platform,
                flags: description.flags.names(),
                matched_files: description.files.len(),
                description,
            });
        } else if present > 0 {
            report.unknown.push(UnknownVariant {
                engine_id,
                game_id: description.game_id,
                missing,
                mismatched,
            });
        }
    }

    report
        .matches
        .sort_by(|a, b| b.matched_files.cmp(&a.matched_files));
    if let Some(best) = report.matches.first().map(|m| m.matched_files) {
        report.matches.retain(|m| m.matched_files == best);
    }
    Ok(report)
}
